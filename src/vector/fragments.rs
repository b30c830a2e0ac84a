//! Assembly of robot avatars from SVG fragments.
//!
//! Each fragment file holds the bare markup for one body part. Fragments are
//! authored with a fixed stroke color token; before assembly the token is
//! rewritten to `currentColor` so the whole robot follows the `color` of the
//! enclosing group, and the fragment is wrapped in a group that shifts it
//! into place. The prepared fragments are substituted into a fixed template.
//!
//! Markup is treated as opaque text here. Sanitizing untrusted fragment files
//! is the job of whoever installs them.

use crate::error::{AvatarError, AvatarResult};

/// Stroke color fragments are drawn with.
pub const STROKE_TOKEN: &str = "#000";

/// Vertical offset applied to every fragment.
pub const FRAGMENT_TRANSFORM: &str = "translate(0,16)";

/// Layering order of the fragment categories, back to front.
pub const CATEGORIES: [&str; 6] = ["body", "arms", "mouth", "eyes", "antenna", "accessory"];

/// The document every robot is assembled into.
pub const TEMPLATE: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 320 320">"#,
    r#"<rect width="320" height="320" fill="{{background}}"/>"#,
    r#"<g color="{{color}}" fill="none" stroke-width="4" stroke-linejoin="round">"#,
    "{{body}}{{arms}}{{mouth}}{{eyes}}{{antenna}}{{accessory}}",
    "</g></svg>"
);

/// Rewrites the stroke token to `currentColor` and wraps the fragment.
pub fn prepare_fragment(markup: &str) -> String {
    let recolored = replace_attr_value(markup.trim(), "stroke", STROKE_TOKEN, "currentColor");
    format!(r#"<g transform="{FRAGMENT_TRANSFORM}">{recolored}</g>"#)
}

/// Substitutes prepared fragments and colors into [`TEMPLATE`].
///
/// `fragments` pairs a category with its prepared markup. Every placeholder
/// of the template must be filled.
pub fn assemble(fragments: &[(&str, String)], color: &str, background: &str) -> AvatarResult<String> {
    let mut svg = TEMPLATE
        .replace("{{color}}", color)
        .replace("{{background}}", background);
    for (category, markup) in fragments {
        let placeholder = format!("{{{{{category}}}}}");
        if !svg.contains(&placeholder) {
            return Err(AvatarError::composition(format!(
                "template has no slot for `{category}`"
            )));
        }
        svg = svg.replace(&placeholder, markup);
    }

    if let Some(start) = svg.find("{{") {
        let slot: String = svg[start..].chars().take_while(|&c| c != '}').collect();
        return Err(AvatarError::composition(format!(
            "template slot {}}}}} was not filled",
            slot
        )));
    }
    Ok(svg)
}

/// Replaces `attr="from"` with `attr="to"`, leaving other values alone.
fn replace_attr_value(svg: &str, attr: &str, from: &str, to: &str) -> String {
    let mut result = String::with_capacity(svg.len());
    let pattern = format!("{attr}=\"");
    let mut remaining = svg;

    while let Some(start) = remaining.find(&pattern) {
        // Only match whole attribute names (`stroke`, not `data-stroke`).
        let boundary = start == 0
            || remaining[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        result.push_str(&remaining[..start + pattern.len()]);
        remaining = &remaining[start + pattern.len()..];

        let Some(end) = remaining.find('"') else {
            break;
        };
        let value = &remaining[..end];
        if boundary && value.eq_ignore_ascii_case(from) {
            result.push_str(to);
        } else {
            result.push_str(value);
        }
        remaining = &remaining[end..];
    }

    result.push_str(remaining);
    result
}
