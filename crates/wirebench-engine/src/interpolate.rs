//! `{{var}}` placeholder interpolation for URLs and header values.
//!
//! Scopes (environment over collection, etc.) are merged by the caller; the
//! engine sees one flat map. Unresolved placeholders are left verbatim — a
//! missing variable is visible in the outgoing request rather than an error.

use std::collections::BTreeMap;

/// Replace every `{{name}}` whose trimmed `name` exists in `vars`.
///
/// Placeholders without a closing `}}` and placeholders naming an unknown
/// variable pass through unchanged.
#[must_use]
pub fn interpolate(input: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}").map(|i| start + 2 + i) else {
            break;
        };
        let name = rest[start + 2..end].trim();
        match vars.get(name) {
            Some(value) => {
                out.push_str(&rest[..start]);
                out.push_str(value);
            }
            None => out.push_str(&rest[..end + 2]),
        }
        rest = &rest[end + 2..];
    }
    out.push_str(rest);
    out
}
