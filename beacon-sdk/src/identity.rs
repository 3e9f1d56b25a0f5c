//! Client id derivation.
//!
//! The collector expects a client id shaped like `"<random>.<timestamp>"`
//! (`"1234567890.1700000000"`). The number part here is not random: it is
//! folded from a stable installation id so the same install always reports
//! the same number.
//!
//! Fold, over the UTF-8 bytes of the stable id, starting from zero:
//!
//! ```text
//! acc = (acc * 10 + byte % 10) % 10_000_000_000
//! ```
//!
//! rendered zero-padded to ten digits.

const CLIENT_NUMBER_MODULUS: u64 = 10_000_000_000;

/// The ten-digit number part of a client id.
pub fn client_number(stable_id: &str) -> String {
    let number = stable_id.bytes().fold(0u64, |acc, byte| {
        (acc * 10 + u64::from(byte % 10)) % CLIENT_NUMBER_MODULUS
    });
    format!("{number:010}")
}

/// Build a client id from a stable id and a Unix timestamp in seconds.
pub fn derive_client_id(stable_id: &str, unix_seconds: i64) -> String {
    format!("{}.{}", client_number(stable_id), unix_seconds)
}

/// Build a client id stamped with the current time.
pub fn client_id_now(stable_id: &str) -> String {
    derive_client_id(
        stable_id,
        time::OffsetDateTime::now_utc().unix_timestamp(),
    )
}
