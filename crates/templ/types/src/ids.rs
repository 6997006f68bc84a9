//! Identities, amounts and fixed constants shared across the templ engine

use serde::{Deserialize, Serialize};

/// Token amounts in the smallest unit of their asset.
pub type Amount = u128;

/// Integer share out of [`BPS_DENOMINATOR`].
pub type BasisPoints = u32;

/// Denominator for every basis-point share (100%).
pub const BPS_DENOMINATOR: BasisPoints = 10_000;

/// Largest entry fee the curve may produce. Leaves headroom so that
/// `fee * BPS_DENOMINATOR` never overflows during fee splitting.
pub const MAX_ENTRY_FEE: Amount = u128::MAX / BPS_DENOMINATOR as u128;

/// Upper bound on simultaneously registered external reward streams.
pub const MAX_EXTERNAL_REWARD_STREAMS: usize = 256;

/// An already-authenticated caller or recipient identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The zero identity is the empty string and is never a valid party.
    pub fn is_zero(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a transferable asset (the access token, a donated token, ...)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The host chain's native asset, used for value attached to external calls.
    pub fn native() -> Self {
        Self("native".into())
    }

    pub fn is_native(&self) -> bool {
        self.0 == "native"
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a templ instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplId(pub String);

impl TemplId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Short display form (first 8 chars)
    pub fn short(&self) -> String {
        self.0.chars().take(8).collect()
    }
}

impl std::fmt::Display for TemplId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proposal identifier, assigned monotonically starting at 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub u64);

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `amount * bps / BPS_DENOMINATOR`, rounded down.
///
/// Callers keep `amount <= MAX_ENTRY_FEE`-sized values; a larger product
/// falls back to dividing first.
pub fn apply_bps(amount: Amount, bps: BasisPoints) -> Amount {
    match amount.checked_mul(bps as u128) {
        Some(product) => product / BPS_DENOMINATOR as u128,
        None => (amount / BPS_DENOMINATOR as u128) * bps as u128,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(Address::new("").is_zero());
        assert!(Address::new("   ").is_zero());
        assert!(!Address::new("alice").is_zero());
    }

    #[test]
    fn test_templ_id_generate() {
        let id = TemplId::generate();
        assert!(!id.0.is_empty());
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(100, 3_000), 30);
        assert_eq!(apply_bps(99, 3_333), 32);
        assert_eq!(apply_bps(0, 5_000), 0);
        assert_eq!(apply_bps(u128::MAX, BPS_DENOMINATOR), u128::MAX / 10_000 * 10_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ProposalId(7)), "#7");
        assert_eq!(format!("{}", AssetId::new("USDC")), "USDC");
        assert!(AssetId::native().is_native());
    }
}
