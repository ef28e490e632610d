//! Building a JWT payload from `(type, value)` claim pairs.

use serde_json::map::Entry;
use serde_json::{Map, Value};

/// Registered time claims stamped onto a payload, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTimes {
    pub issued_at: i64,
    pub not_before: i64,
    pub expires: i64,
}

impl TokenTimes {
    /// Times for a token issued at `now` that lives for `lifetime_secs`.
    #[must_use]
    pub const fn starting_at(now: i64, lifetime_secs: i64) -> Self {
        Self {
            issued_at: now,
            not_before: now,
            expires: now.saturating_add(lifetime_secs),
        }
    }
}

/// Build a payload object from claims.
///
/// A claim type seen once becomes a string member. A claim type seen more
/// than once becomes an array of its values in insertion order. The `exp`,
/// `nbf` and `iat` members are only added when the claims do not already
/// carry them.
pub fn payload_from_claims<'a, I>(claims: I, times: TokenTimes) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut payload = Map::new();
    for (claim_type, value) in claims {
        let value = Value::String(value.to_string());
        match payload.entry(claim_type) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(values) => values.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }

    for (name, at) in [
        ("exp", times.expires),
        ("nbf", times.not_before),
        ("iat", times.issued_at),
    ] {
        payload.entry(name).or_insert_with(|| Value::from(at));
    }

    payload
}
