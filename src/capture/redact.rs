//! Removal of firmware update offers.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::bytes::Regex;

static UPDATE_ELEMENT: OnceLock<Regex> = OnceLock::new();

// `<update>` or `<update attr...>` through the nearest `</update>`, or the
// self-closing form. `<updates>` and other names sharing the prefix never match.
fn update_element() -> &'static Regex {
    UPDATE_ELEMENT.get_or_init(|| {
        Regex::new(r"(?s)<update(?:\s[^>]*?)?(?:/>|>.*?</update\s*>)").expect("static pattern")
    })
}

/// Strip every `<update>` element from `body`.
///
/// Borrowed when nothing matched.
pub fn redact_updates(body: &[u8]) -> Cow<'_, [u8]> {
    update_element().replace_all(body, &b""[..])
}
