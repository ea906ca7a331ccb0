//! UK postcode normalisation and key encoding.

use regex::Regex;
use std::sync::LazyLock;

/// Outward code (`AA9A`, `A9A`, `A9`, `A99`, `AA9`, `AA99`) followed by the
/// inward code (`9AA`), applied to a cleaned postcode.
static POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Z]{2}[0-9][A-Z]|[A-Z][0-9][A-Z]|[A-Z][0-9]|[A-Z][0-9]{2}|[A-Z]{2}[0-9]|[A-Z]{2}[0-9]{2})[0-9][A-Z]{2}$",
    )
    .expect("postcode regex is valid")
});

/// Northern Ireland postcodes are not covered by the tables.
pub const EXCLUDED_PREFIX: &str = "BT";

/// Strip all whitespace and upper-case.
pub fn clean(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether the postcode has the shape of a full UK postcode.
pub fn is_valid(postcode: &str) -> bool {
    POSTCODE_RE.is_match(&clean(postcode))
}

/// Whether the postcode falls in an area the tables exclude.
pub fn is_excluded(postcode: &str) -> bool {
    clean(postcode).starts_with(EXCLUDED_PREFIX)
}

/// Encode a postcode as a base-36 integer.
///
/// Only the leading run of base-36 digits is read, so `"AB1 2CD"` and
/// `"AB12CD!"` give the same key. Returns `None` when there are no leading
/// digits or the value does not fit in a `u64`.
pub fn postcode_to_int(postcode: &str) -> Option<u64> {
    let cleaned = clean(postcode);
    let mut acc: Option<u64> = None;
    for c in cleaned.chars() {
        let Some(digit) = c.to_digit(36) else {
            break;
        };
        acc = Some(
            acc.unwrap_or(0)
                .checked_mul(36)?
                .checked_add(u64::from(digit))?,
        );
    }
    acc
}
