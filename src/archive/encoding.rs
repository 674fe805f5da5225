//! Markup transformations applied before serialization

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// An opening (or self-closing) tag
#[allow(clippy::expect_used)]
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][^>]*>").expect("tag pattern is valid"));

/// A double-quoted attribute inside a tag
#[allow(clippy::expect_used)]
static QUOTED_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<prefix>\s[\w:.-]+\s*=\s*")(?P<value>[^"]*)""#)
        .expect("attribute pattern is valid")
});

/// Replace attribute values that exactly equal a key of `locations`
///
/// Only values of double-quoted attributes inside tags are considered, so text
/// content and partial matches inside longer values are left untouched.
pub(crate) fn rewrite_references(markup: &str, locations: &HashMap<String, String>) -> String {
    if locations.is_empty() {
        return markup.to_string();
    }

    TAG.replace_all(markup, |tag: &Captures| {
        QUOTED_ATTR
            .replace_all(&tag[0], |attr: &Captures| match locations.get(&attr["value"]) {
                Some(location) => format!("{}{}\"", &attr["prefix"], location),
                None => attr[0].to_string(),
            })
            .into_owned()
    })
    .into_owned()
}

/// Escape every non-ASCII code point as a hexadecimal character reference
pub(crate) fn to_ascii_markup(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    for ch in markup.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            out.push_str(&format!("&#x{:x};", u32::from(ch)));
        }
    }
    out
}
