//! Payload classification.
//!
//! Two independent predicates: a cheap prefix heuristic for the thermostat's
//! `<status>` report, and a streaming well-formedness check used to pick the
//! `.xml` artifact extension.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Root tag token of the status report.
pub const STATUS_ROOT: &str = "<status";

/// True when `body` looks like the thermostat's status report.
///
/// Accepts anything starting with `<status`, or a prolog (`<?...`) followed
/// somewhere by `<status`. Malformed documents that merely look right pass;
/// well-formed markup of any other shape does not.
pub fn is_status_document(body: &[u8]) -> bool {
    let trimmed = body.trim_ascii();
    if trimmed.starts_with(STATUS_ROOT.as_bytes()) {
        return true;
    }
    trimmed.starts_with(b"<?") && contains(&trimmed[2..], STATUS_ROOT.as_bytes())
}

/// True once the parser has produced one closing tag without error.
///
/// The parse stops at the first end tag (or self-closing element), so a
/// balanced element followed by garbage still reports true. Empty input,
/// any syntax error and end of input before a closing tag report false.
pub fn is_well_formed_markup(body: &[u8]) -> bool {
    if body.is_empty() {
        return false;
    }

    let mut reader = Reader::from_reader(body);
    loop {
        match reader.read_event() {
            Ok(event) if !is_valid_event(&event) => return false,
            Ok(Event::End(_)) | Ok(Event::Empty(_)) => return true,
            Ok(Event::Eof) | Err(_) => return false,
            Ok(_) => {}
        }
    }
}

/// Checks the reader leaves to the caller: attribute syntax, duplicate
/// attributes and entity references in text.
pub(crate) fn is_valid_event(event: &Event<'_>) -> bool {
    match event {
        Event::Start(tag) | Event::Empty(tag) => {
            let mut attributes = tag.attributes();
            attributes.with_checks(true);
            attributes.all(|attribute| attribute.is_ok())
        }
        Event::Text(text) => text.unescape().is_ok(),
        _ => true,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_document_detection() {
        assert!(is_status_document(b"<status version=\"1.0\">"));
        assert!(is_status_document(b"<?xml version=\"1.0\"?><status>"));
        assert!(is_status_document(b"  \n<status><oat>63</oat></status>\n"));
        assert!(!is_status_document(b"<config>"));
        assert!(!is_status_document(b""));
        assert!(!is_status_document(b"   "));
        assert!(!is_status_document(b"<?xml version=\"1.0\"?><config/>"));
    }

    #[test]
    fn test_status_heuristic_accepts_malformed() {
        assert!(is_status_document(b"<status><oat>63"));
    }

    #[test]
    fn test_well_formed_markup() {
        assert!(is_well_formed_markup(b"<status><oat>63</oat></status>"));
        assert!(!is_well_formed_markup(b"<invalid><data>test</invalid>"));
        assert!(!is_well_formed_markup(b""));
        assert!(!is_well_formed_markup(b"<status><oat>63"));
        assert!(!is_well_formed_markup(b"plain text"));
    }

    #[test]
    fn test_malformed_attributes_rejected() {
        assert!(!is_well_formed_markup(b"<status foo></status>"));
        assert!(!is_well_formed_markup(b"<a b=1></a>"));
        assert!(!is_well_formed_markup(br#"<a b="1" b="2"></a>"#));
        assert!(!is_well_formed_markup(b"<a b=1/>"));
        assert!(is_well_formed_markup(br#"<zone id="1" name='up'></zone>"#));
    }

    #[test]
    fn test_bad_entity_references_rejected() {
        assert!(!is_well_formed_markup(b"<a>x & y</a>"));
        assert!(!is_well_formed_markup(b"<a>&bogus;</a>"));
        assert!(is_well_formed_markup(b"<a>x &amp; y &#38; &lt;</a>"));
    }

    #[test]
    fn test_first_closing_tag_is_enough() {
        assert!(is_well_formed_markup(b"<a><b>x</b><c></a>"));
        assert!(is_well_formed_markup(b"<ping/>"));
    }

    #[test]
    fn test_namespaced_update_offer() {
        let body = br#"<updates xmlns="http://schema.ota.carrier.com"><update xmlns="http://schema.ota.carrier.com"><type>thermostat</type><version>14.02</version></update></updates>"#;
        assert!(is_well_formed_markup(body));
    }
}
