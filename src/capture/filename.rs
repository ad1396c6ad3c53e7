//! Artifact naming.
//!
//! Maps a request (method, target, direction) to a single filesystem-safe
//! path segment under the storage directory.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::capture::RequestDescriptor;

/// Upper bound on an artifact name, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Characters replaced by `_` when deriving artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// Each of `/ \ : * ? " < > | = &` becomes `_`.
    #[default]
    Exhaustive,
    /// Runs of `< > : " / \ | ? *` collapse to one `_`; `=` and `&` survive.
    Reserved,
}

const EXHAUSTIVE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '&', '='];

static RESERVED_RUN: OnceLock<Regex> = OnceLock::new();

fn reserved_run() -> &'static Regex {
    RESERVED_RUN.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]+"#).expect("static pattern"))
}

impl Charset {
    /// Replace every hostile character of this charset.
    pub fn sanitize(self, raw: &str) -> String {
        match self {
            Charset::Exhaustive => raw.replace(EXHAUSTIVE, "_"),
            Charset::Reserved => reserved_run().replace_all(raw, "_").into_owned(),
        }
    }
}

/// Build the artifact name for a captured body.
///
/// `METHOD-target[-suffix]extension`, where target is the request target
/// without its leading slash and with hostile characters replaced. The
/// result is lexically cleaned, trimmed and capped at
/// [`MAX_IDENTIFIER_LEN`] bytes.
pub fn build_identifier(
    request: &RequestDescriptor,
    suffix: &str,
    extension: &str,
    charset: Charset,
) -> String {
    let target = request.target();
    let target = target.strip_prefix('/').unwrap_or(&target);

    let mut name = format!("{}-{}", request.method, charset.sanitize(target));
    if !suffix.is_empty() {
        name.push('-');
        name.push_str(suffix);
    }
    name.push_str(extension);

    let cleaned = clean_path(&name);
    truncate(cleaned.trim(), MAX_IDENTIFIER_LEN).to_string()
}

/// Lexically resolve `.` and `..` segments and duplicate separators.
///
/// Purely textual, never touches the filesystem. An empty result becomes `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !rooted => parts.push(".."),
                _ => {}
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
