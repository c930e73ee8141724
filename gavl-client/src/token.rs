//! Verdict token generation.
//!
//! Tokens are cosmetic identifiers derived from a case id and a millisecond
//! timestamp with a 32-bit rolling hash. They are neither unique nor
//! tamper-evident and must not be used as keys.

use chrono::Utc;

/// Prefix carried by every verdict token.
pub const TOKEN_PREFIX: &str = "GAVL-";

/// Generate a token for `case_id` using the current time.
pub fn make_token(case_id: &str) -> String {
    make_token_at(case_id, Utc::now().timestamp_millis())
}

/// Generate a token for `case_id` at the given Unix time in milliseconds.
pub fn make_token_at(case_id: &str, millis: i64) -> String {
    let combined = format!("{}{}", case_id, millis);
    let hash = rolling_hash(&combined);

    let hex = format!("{:016X}", hash.unsigned_abs());
    let groups = [&hex[0..4], &hex[4..8], &hex[8..12], &hex[12..16]];

    format!("{}{}", TOKEN_PREFIX, groups.join("-"))
}

/// `h = h * 31 + c` over UTF-16 code units, wrapped to i32.
fn rolling_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}
