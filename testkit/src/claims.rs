//! Ordered `(type, value)` claims used to build test access tokens.

use std::ops::Deref;

/// Registered JWT claim names.
pub mod names {
    pub const AUDIENCE: &str = "aud";
    pub const ISSUER: &str = "iss";
    pub const SUBJECT: &str = "sub";
    pub const EXPIRES: &str = "exp";
    pub const NOT_BEFORE: &str = "nbf";
    pub const ISSUED_AT: &str = "iat";
}

/// A single claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// An ordered collection of claims.
///
/// Lookups compare claim types exactly and preserve insertion order.
/// Derefs to `[Claim]` for indexing and iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsList {
    claims: Vec<Claim>,
}

impl ClaimsList {
    #[must_use]
    pub const fn new() -> Self {
        Self { claims: Vec::new() }
    }

    /// Append a claim, keeping any existing claims of the same type.
    pub fn add(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.claims.push(Claim::new(claim_type, value));
    }

    /// Replace every claim of this type with a single new claim.
    ///
    /// The new claim is appended at the end of the list.
    pub fn set(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        let claim_type = claim_type.into();
        self.remove(&claim_type);
        self.add(claim_type, value);
    }

    /// Remove all claims of this type.
    pub fn remove(&mut self, claim_type: &str) {
        self.claims.retain(|claim| claim.claim_type != claim_type);
    }

    /// Remove every claim. A host with no claims sends no access token.
    pub fn clear(&mut self) {
        self.claims.clear();
    }

    /// All claims of this type, in insertion order.
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a Claim> + 'a {
        self.claims
            .iter()
            .filter(move |claim| claim.claim_type == claim_type)
    }

    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims
            .iter()
            .find(|claim| claim.claim_type == claim_type)
    }

    #[must_use]
    pub fn find_first_value(&self, claim_type: &str) -> Option<&str> {
        self.find_first(claim_type).map(|claim| claim.value.as_str())
    }

    /// Claims as borrowed `(type, value)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.claims
            .iter()
            .map(|claim| (claim.claim_type.as_str(), claim.value.as_str()))
    }
}

impl Deref for ClaimsList {
    type Target = [Claim];

    fn deref(&self) -> &Self::Target {
        &self.claims
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClaimsList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ClaimsList {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (claim_type, value) in iter {
            self.add(claim_type, value);
        }
    }
}

impl IntoIterator for ClaimsList {
    type Item = Claim;
    type IntoIter = std::vec::IntoIter<Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClaimsList {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}
