//! # tally-types
//!
//! Shared domain types used across the Tally workspace: the persisted
//! entities of the points ledger, the decoded chain-event envelope, and the
//! composite-key helpers every component uses to address the store.
//!
//! Every persisted record implements [`Entity`]: a stable `KIND` tag (the
//! table it lives in) and a string id. Ids are built by the caller, e.g.
//! `"{user}:{epoch}"` for [`user::UserEpochStats`].

pub mod epoch;
pub mod events;
pub mod lp;
pub mod nft;
pub mod ranking;
pub mod reserve;
pub mod user;
pub mod ve;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record persisted in the keyed entity store.
pub trait Entity: Serialize + DeserializeOwned {
    /// Table tag. Unique per entity type.
    const KIND: &'static str;

    /// Primary key within [`Entity::KIND`].
    fn id(&self) -> String;
}

/// Seconds per day; daily bonuses and VP accrual use UTC day buckets.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Seconds per hour, the unit of the cumulative price index.
pub const SECONDS_PER_HOUR: u64 = 3_600;

/// USD prices carry 8 decimals.
pub const USD_DECIMALS: u32 = 8;

/// 1 USD in price units.
pub const USD_SCALE: u128 = 100_000_000;

/// Neutral multiplier (1.0×) in bps.
pub const NEUTRAL_MULTIPLIER_BPS: u64 = 10_000;

/// Errors raised while validating decoded event data.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// An address field is not 20 hex-encoded bytes.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// A numeric string could not be parsed.
    #[error("malformed number in field {field}: {value}")]
    MalformedNumber {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Convenience result type for type-level validation.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Canonical form of an address: lowercase, `0x`-prefixed, 20 bytes.
///
/// # Errors
///
/// - [`TypesError::MalformedAddress`] if the input is not 40 hex digits
pub fn normalize_address(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| TypesError::MalformedAddress(raw.to_string()))?;
    if bytes.len() != 20 {
        return Err(TypesError::MalformedAddress(raw.to_string()));
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Join key parts with `:`.
pub fn composite_id(parts: &[&str]) -> String {
    parts.join(":")
}

/// `"{user}:{epoch}"`.
pub fn user_epoch_id(user: &str, epoch: u64) -> String {
    format!("{user}:{epoch}")
}

/// UTC day number of a unix timestamp.
pub fn day_of(timestamp: u64) -> u64 {
    timestamp / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address_lowercases() {
        let addr = normalize_address("0xABCDEF0123456789abcdef0123456789ABCDEF01").expect("valid");
        assert_eq!(addr, "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_normalize_address_without_prefix() {
        let addr = normalize_address("abcdef0123456789abcdef0123456789abcdef01").expect("valid");
        assert!(addr.starts_with("0x"));
    }

    #[test]
    fn test_normalize_address_rejects_short() {
        assert!(normalize_address("0x1234").is_err());
        assert!(normalize_address("0xzz").is_err());
    }

    #[test]
    fn test_composite_ids() {
        assert_eq!(user_epoch_id("0xaa", 3), "0xaa:3");
        assert_eq!(composite_id(&["a", "b", "c"]), "a:b:c");
    }

    #[test]
    fn test_day_of() {
        assert_eq!(day_of(0), 0);
        assert_eq!(day_of(SECONDS_PER_DAY - 1), 0);
        assert_eq!(day_of(SECONDS_PER_DAY), 1);
    }
}
