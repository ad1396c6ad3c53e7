//! Indented re-serialization of captured markup.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::capture::classify::is_valid_event;

const INDENT: &[u8] = b"  ";

/// Re-encode `body` with two-space indentation.
///
/// Non-markup input (empty, or not starting with `<`) is returned unchanged.
/// Any decode or encode error, an element left open at end of input, or an
/// empty result also returns the original bytes, never a partial rendering.
/// Whitespace-only text between elements is dropped, which makes the
/// operation idempotent on well-formed input.
pub fn prettify(body: &[u8]) -> Vec<u8> {
    let trimmed = body.trim_ascii();
    if trimmed.is_empty() || trimmed[0] != b'<' {
        return body.to_vec();
    }

    match reindent(body) {
        Some(out) if !out.is_empty() => out,
        _ => body.to_vec(),
    }
}

fn reindent(body: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::from_reader(body);

    let mut out = Indenter::new();
    let mut open = 0usize;

    loop {
        let event = reader.read_event().ok()?;
        if !is_valid_event(&event) {
            return None;
        }
        match &event {
            Event::Eof => break,
            Event::Start(_) => {
                out.newline(Step::In);
                open += 1;
            }
            Event::End(_) => {
                out.newline(Step::Out);
                open = open.checked_sub(1)?;
            }
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => continue,
            Event::Text(_) | Event::CData(_) => {}
            _ => out.newline(Step::Stay),
        }
        out.writer.write_event(event).ok()?;
    }

    if open > 0 {
        return None;
    }
    Some(out.writer.into_inner())
}

enum Step {
    In,
    Stay,
    Out,
}

/// Line-break bookkeeping for the output stream.
///
/// An end tag directly after its own start tag's content stays on the same
/// line, so leaf elements render as `<oat>63</oat>`.
struct Indenter {
    writer: Writer<Vec<u8>>,
    depth: usize,
    indented_in: bool,
    started: bool,
}

impl Indenter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            depth: 0,
            indented_in: false,
            started: false,
        }
    }

    fn newline(&mut self, step: Step) {
        if let Step::Out = step {
            self.depth = self.depth.saturating_sub(1);
            if self.indented_in {
                self.indented_in = false;
                return;
            }
        }

        let depth = self.depth;
        let buf = self.writer.get_mut();
        // Text that already ends in this exact line break and indent came
        // from an earlier pass; adding another would grow on every pass.
        if !ends_with_indent(buf, depth) {
            if self.started {
                buf.push(b'\n');
            }
            for _ in 0..depth {
                buf.extend_from_slice(INDENT);
            }
        }
        self.started = true;

        match step {
            Step::In => {
                self.depth += 1;
                self.indented_in = true;
            }
            Step::Stay | Step::Out => self.indented_in = false,
        }
    }
}

fn ends_with_indent(buf: &[u8], depth: usize) -> bool {
    let width = 1 + depth * INDENT.len();
    if buf.len() < width {
        return false;
    }
    let tail = &buf[buf.len() - width..];
    tail[0] == b'\n' && tail[1..].chunks(INDENT.len()).all(|c| c == INDENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pretty(s: &str) -> String {
        String::from_utf8(prettify(s.as_bytes())).unwrap()
    }

    #[test]
    fn test_valid_markup_is_indented() {
        assert_eq!(
            pretty("<status><oat>63</oat></status>"),
            "<status>\n  <oat>63</oat>\n</status>"
        );
    }

    #[test]
    fn test_mixed_content() {
        assert_eq!(
            pretty("<root>test<sub>content</sub></root>"),
            "<root>test\n  <sub>content</sub>\n</root>"
        );
    }

    #[test]
    fn test_declaration_and_nesting() {
        let input = r#"<?xml version="1.0"?><status><idu><cfm>437</cfm></idu><zones><zone id="1"/></zones></status>"#;
        let expected = "<?xml version=\"1.0\"?>\n<status>\n  <idu>\n    <cfm>437</cfm>\n  </idu>\n  <zones>\n    <zone id=\"1\"/>\n  </zones>\n</status>";
        assert_eq!(pretty(input), expected);
    }

    #[test]
    fn test_invalid_markup_returned_unchanged() {
        let input = b"<invalid><data>test</invalid>";
        assert_eq!(prettify(input), input.to_vec());
    }

    #[test]
    fn test_truncated_markup_returned_unchanged() {
        let input = b"<status><oat>63";
        assert_eq!(prettify(input), input.to_vec());
    }

    #[test]
    fn test_non_markup_returned_unchanged() {
        for input in [&b"This is not XML content"[..], b"", b"   ", b"data=%3Cx%3E"] {
            assert_eq!(prettify(input), input.to_vec());
        }
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<status><oat>63</oat></status>",
            "<root>test<sub>content</sub></root>",
            "<a>\n   <b> x </b>\n\n <c/>\n</a>",
            "<?xml version=\"1.0\"?><!-- note --><a><b>1</b><b>2</b></a>",
        ];
        for input in inputs {
            let once = prettify(input.as_bytes());
            let twice = prettify(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_text_content_kept_verbatim() {
        let out = pretty("<status><opstat> off </opstat><note>a  b </note></status>");
        assert_eq!(
            out,
            "<status>\n  <opstat> off </opstat>\n  <note>a  b </note>\n</status>"
        );
        assert_eq!(prettify(out.as_bytes()), out.as_bytes());
    }

    #[test]
    fn test_mixed_content_with_line_breaks() {
        let once = prettify(b"<a>\n text <b/></a>");
        assert_eq!(String::from_utf8(once.clone()).unwrap(), "<a>\n text \n  <b/>\n</a>");
        assert_eq!(prettify(&once), once);
    }

    #[test]
    fn test_malformed_attributes_or_entities_returned_unchanged() {
        for input in [
            &b"<status foo><oat>63</oat></status>"[..],
            b"<a b=1><c/></a>",
            br#"<a b="1" b="2"><c/></a>"#,
            b"<a><c>x & y</c></a>",
        ] {
            assert_eq!(prettify(input), input.to_vec());
        }
    }

    #[test]
    fn test_entities_preserved() {
        assert_eq!(pretty("<a>x &amp; y</a>"), "<a>x &amp; y</a>");
    }
}
