//! Minimal SVG handling: intrinsic size extraction and the percent-encoded
//! data-URL form handed to the vector rasterizer.
//!
//! This is deliberately not an XML parser. It scans the opening `<svg>` tag
//! for `width`, `height` and `viewBox`, which is all the layout needs.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Fallback when an SVG declares no usable size.
pub const DEFAULT_INTRINSIC: (u32, u32) = (300, 150);

/// Characters escaped in the data-URL payload. Everything else passes
/// through readably; multi-byte UTF-8 is always escaped byte-wise.
const DATA_URL_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Intrinsic pixel size of an SVG document.
///
/// Reads `width`/`height` attributes (unitless or `px`), falling back to the
/// `viewBox` extent, falling back to 300×150.
pub fn intrinsic_size(text: &str) -> (u32, u32) {
    let Some(tag) = opening_tag(text) else {
        return DEFAULT_INTRINSIC;
    };

    let width = attr_value(tag, "width").and_then(parse_length);
    let height = attr_value(tag, "height").and_then(parse_length);
    if let (Some(w), Some(h)) = (width, height) {
        return (w, h);
    }

    if let Some(view_box) = attr_value(tag, "viewBox") {
        let parts: Vec<f64> = view_box
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() == 4 && parts[2] > 0.0 && parts[3] > 0.0 {
            let vw = parts[2].round() as u32;
            let vh = parts[3].round() as u32;
            // A single explicit dimension scales the viewBox aspect
            return match (width, height) {
                (Some(w), None) => {
                    (w, ((f64::from(w) * parts[3] / parts[2]).round() as u32).max(1))
                }
                (None, Some(h)) => {
                    (((f64::from(h) * parts[2] / parts[3]).round() as u32).max(1), h)
                }
                _ => (vw.max(1), vh.max(1)),
            };
        }
    }

    match (width, height) {
        (Some(w), None) => (w, DEFAULT_INTRINSIC.1),
        (None, Some(h)) => (DEFAULT_INTRINSIC.0, h),
        _ => DEFAULT_INTRINSIC,
    }
}

/// Convert SVG text to a `data:image/svg+xml` URL.
///
/// UTF-8 safe percent encoding, never base64. `&nbsp;` is replaced with its
/// numeric form first since bare SVG has no HTML entity table.
pub fn to_data_url(text: &str) -> String {
    let substituted = substitute_entities(text);
    format!(
        "data:image/svg+xml,{}",
        utf8_percent_encode(&substituted, DATA_URL_SET)
    )
}

pub(crate) fn substitute_entities(text: &str) -> String {
    text.replace("&nbsp;", "&#160;")
}

/// The attribute region of the first `<svg ...>` tag.
fn opening_tag(text: &str) -> Option<&str> {
    let start = text.find("<svg")?;
    let rest = &text[start + 4..];
    // Attribute list must start with whitespace or end the tag immediately
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '>' || c == '/' => {}
        _ => return None,
    }
    let end = rest.find('>')?;
    Some(&rest[..end])
}

/// Value of `name="..."` or `name='...'` inside a tag body.
fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut search = tag;
    loop {
        let at = search.find(name)?;
        let before_ok = at == 0
            || search[..at]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        let after = &search[at + name.len()..];
        let after_eq = after.trim_start();
        if before_ok && after_eq.starts_with('=') {
            let value = after_eq[1..].trim_start();
            let quote = value.chars().next()?;
            if quote == '"' || quote == '\'' {
                let inner = &value[1..];
                let end = inner.find(quote)?;
                return Some(&inner[..end]);
            }
        }
        search = &search[at + name.len()..];
    }
}

/// Parse a CSS-ish length. Percentages are not a pixel size and map to None.
fn parse_length(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    let parsed: f64 = number.parse().ok()?;
    if parsed.is_finite() && parsed >= 1.0 {
        Some(parsed.round() as u32)
    } else {
        None
    }
}
