//! Templ configuration types
//!
//! Every config value is validated before it is accepted, both at bootstrap
//! and when an executed proposal replaces part of it. A config that fails
//! validation never reaches engine state.

use crate::{
    Address, AssetId, BasisPoints, EntryFeeCurve, TemplError, TemplId, TemplResult,
    BPS_DENOMINATOR,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Longest accepted templ name
pub const MAX_NAME_LEN: usize = 128;

/// Longest accepted templ description
pub const MAX_DESCRIPTION_LEN: usize = 4_096;

/// Longest accepted logo URI
pub const MAX_URI_LEN: usize = 2_048;

/// Serialize a `chrono::Duration` as whole seconds
pub mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(secs))
    }
}

/// How each entry fee is split. The four shares always sum to 10_000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Sent to the burn address
    pub burn_bps: BasisPoints,
    /// Kept as unreserved treasury
    pub treasury_bps: BasisPoints,
    /// Distributed to existing members
    pub member_pool_bps: BasisPoints,
    /// Paid to the protocol recipient (minus any referral)
    pub protocol_bps: BasisPoints,
}

impl Default for FeeSplit {
    fn default() -> Self {
        Self::new(3_000, 3_000, 3_000, 1_000)
    }
}

impl FeeSplit {
    pub fn new(
        burn_bps: BasisPoints,
        treasury_bps: BasisPoints,
        member_pool_bps: BasisPoints,
        protocol_bps: BasisPoints,
    ) -> Self {
        Self {
            burn_bps,
            treasury_bps,
            member_pool_bps,
            protocol_bps,
        }
    }

    pub fn total(&self) -> u64 {
        self.burn_bps as u64
            + self.treasury_bps as u64
            + self.member_pool_bps as u64
            + self.protocol_bps as u64
    }

    pub fn validate(&self) -> TemplResult<()> {
        let total = self.total();
        if total != BPS_DENOMINATOR as u64 {
            return Err(TemplError::InvalidFeeSplit { total });
        }
        Ok(())
    }
}

/// Quorum and timing parameters for proposals
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Share of eligible voters that must vote before early execution
    pub quorum_bps: BasisPoints,
    /// Wait between quorum and early execution
    #[serde(with = "duration_secs")]
    pub execution_delay: Duration,
    #[serde(with = "duration_secs")]
    pub default_voting_period: Duration,
    #[serde(with = "duration_secs")]
    pub min_voting_period: Duration,
    #[serde(with = "duration_secs")]
    pub max_voting_period: Duration,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            quorum_bps: 3_300,
            execution_delay: Duration::hours(36),
            default_voting_period: Duration::days(7),
            min_voting_period: Duration::days(1),
            max_voting_period: Duration::days(30),
        }
    }
}

impl GovernanceParams {
    pub fn validate(&self) -> TemplResult<()> {
        if self.quorum_bps == 0 || self.quorum_bps > BPS_DENOMINATOR {
            return Err(TemplError::InvalidConfig(format!(
                "quorum_bps {} outside 1..=10000",
                self.quorum_bps
            )));
        }
        if self.execution_delay < Duration::zero() {
            return Err(TemplError::InvalidConfig(
                "execution delay cannot be negative".into(),
            ));
        }
        if self.min_voting_period <= Duration::zero() {
            return Err(TemplError::InvalidConfig(
                "minimum voting period must be positive".into(),
            ));
        }
        if self.min_voting_period > self.default_voting_period
            || self.default_voting_period > self.max_voting_period
        {
            return Err(TemplError::InvalidConfig(
                "voting periods must satisfy min <= default <= max".into(),
            ));
        }
        Ok(())
    }

    /// Resolve a requested voting period, falling back to the default
    pub fn resolve_voting_period(&self, requested: Option<Duration>) -> TemplResult<Duration> {
        let period = requested.unwrap_or(self.default_voting_period);
        if period < self.min_voting_period || period > self.max_voting_period {
            return Err(TemplError::InvalidVotingPeriod {
                requested_secs: period.num_seconds(),
                min_secs: self.min_voting_period.num_seconds(),
                max_secs: self.max_voting_period.num_seconds(),
            });
        }
        Ok(period)
    }
}

/// Human-facing templ metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TemplMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}

impl TemplMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            logo_uri: None,
        }
    }

    pub fn with_logo(mut self, uri: impl Into<String>) -> Self {
        self.logo_uri = Some(uri.into());
        self
    }

    pub fn validate(&self) -> TemplResult<()> {
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(TemplError::InvalidConfig(format!(
                "name longer than {} chars",
                MAX_NAME_LEN
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(TemplError::InvalidConfig(format!(
                "description longer than {} chars",
                MAX_DESCRIPTION_LEN
            )));
        }
        if let Some(uri) = &self.logo_uri {
            if uri.chars().count() > MAX_URI_LEN {
                return Err(TemplError::InvalidConfig(format!(
                    "logo URI longer than {} chars",
                    MAX_URI_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Complete templ configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplConfig {
    pub metadata: TemplMetadata,
    /// Asset entry fees are paid in
    pub access_asset: AssetId,
    /// The templ's own account at the asset transfer collaborator
    pub templ_address: Address,
    /// Receives the burn share
    pub burn_address: Address,
    /// Receives the protocol share
    pub protocol_recipient: Address,
    pub entry_fee: EntryFeeCurve,
    pub fee_split: FeeSplit,
    /// Referral payout as a share of the protocol share
    #[serde(default)]
    pub referral_share_bps: BasisPoints,
    /// Proposal creation fee as a share of the current entry fee
    #[serde(default)]
    pub proposal_fee_bps: BasisPoints,
    #[serde(default)]
    pub governance: GovernanceParams,
    /// Member cap; 0 means unlimited
    #[serde(default)]
    pub max_members: u64,
    #[serde(default)]
    pub join_paused: bool,
    /// Admin may execute guarded actions directly
    #[serde(default)]
    pub dictatorship: bool,
}

impl Default for TemplConfig {
    fn default() -> Self {
        Self {
            metadata: TemplMetadata::new("templ", ""),
            access_asset: AssetId::new("ACCESS"),
            templ_address: Address::new("templ"),
            burn_address: Address::new("burn"),
            protocol_recipient: Address::new("protocol"),
            entry_fee: EntryFeeCurve::default(),
            fee_split: FeeSplit::default(),
            referral_share_bps: 0,
            proposal_fee_bps: 0,
            governance: GovernanceParams::default(),
            max_members: 0,
            join_paused: false,
            dictatorship: false,
        }
    }
}

impl TemplConfig {
    /// Parse a JSON config and validate it
    pub fn from_json(json: &str) -> TemplResult<Self> {
        let config: TemplConfig = serde_json::from_str(json)
            .map_err(|e| TemplError::InvalidConfig(format!("unparseable config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> TemplResult<()> {
        if self.templ_address.is_zero() {
            return Err(TemplError::ZeroIdentity("templ_address"));
        }
        if self.burn_address.is_zero() {
            return Err(TemplError::ZeroIdentity("burn_address"));
        }
        if self.protocol_recipient.is_zero() {
            return Err(TemplError::ZeroIdentity("protocol_recipient"));
        }
        if self.access_asset.0.trim().is_empty() {
            return Err(TemplError::InvalidConfig("access asset is empty".into()));
        }

        self.metadata.validate()?;
        self.entry_fee.validate()?;
        self.fee_split.validate()?;
        self.governance.validate()?;

        validate_share("referral_share_bps", self.referral_share_bps)?;
        validate_share("proposal_fee_bps", self.proposal_fee_bps)?;

        Ok(())
    }
}

pub(crate) fn validate_share(name: &str, bps: BasisPoints) -> TemplResult<()> {
    if bps > BPS_DENOMINATOR {
        return Err(TemplError::InvalidConfig(format!(
            "{} of {} exceeds 10000",
            name, bps
        )));
    }
    Ok(())
}

/// What the external factory supplies to bring a templ into existence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub templ_id: TemplId,
    /// Initial admin, enrolled as member #1
    pub admin: Address,
    pub config: TemplConfig,
}

impl BootstrapConfig {
    pub fn new(admin: Address, config: TemplConfig) -> Self {
        Self {
            templ_id: TemplId::generate(),
            admin,
            config,
        }
    }

    /// Create with a specific ID (for testing or migration)
    pub fn with_id(mut self, id: TemplId) -> Self {
        self.templ_id = id;
        self
    }

    pub fn validate(&self) -> TemplResult<()> {
        if self.admin.is_zero() {
            return Err(TemplError::ZeroIdentity("admin"));
        }
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CurveSegment;

    #[test]
    fn test_default_config_is_valid() {
        TemplConfig::default().validate().unwrap();
    }

    #[test]
    fn test_fee_split_must_sum_to_total() {
        assert!(FeeSplit::new(3_000, 3_000, 3_000, 1_000).validate().is_ok());
        assert_eq!(
            FeeSplit::new(3_000, 3_000, 3_000, 999).validate(),
            Err(TemplError::InvalidFeeSplit { total: 9_999 })
        );
        assert!(FeeSplit::new(0, 10_000, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_governance_validation() {
        let mut params = GovernanceParams::default();
        params.quorum_bps = 0;
        assert!(params.validate().is_err());

        let mut params = GovernanceParams::default();
        params.min_voting_period = Duration::days(10);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_resolve_voting_period() {
        let params = GovernanceParams::default();
        assert_eq!(params.resolve_voting_period(None).unwrap(), Duration::days(7));
        assert_eq!(
            params.resolve_voting_period(Some(Duration::days(2))).unwrap(),
            Duration::days(2)
        );
        assert!(matches!(
            params.resolve_voting_period(Some(Duration::hours(1))),
            Err(TemplError::InvalidVotingPeriod { .. })
        ));
    }

    #[test]
    fn test_zero_identities_rejected() {
        let mut config = TemplConfig::default();
        config.burn_address = Address::new("");
        assert_eq!(
            config.validate(),
            Err(TemplError::ZeroIdentity("burn_address"))
        );

        let bootstrap = BootstrapConfig::new(Address::new(""), TemplConfig::default());
        assert_eq!(bootstrap.validate(), Err(TemplError::ZeroIdentity("admin")));
    }

    #[test]
    fn test_json_roundtrip_and_validation() {
        let mut config = TemplConfig::default();
        config.entry_fee = EntryFeeCurve::new(1_000, CurveSegment::exponential(250));
        let json = serde_json::to_string(&config).unwrap();
        let parsed = TemplConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);

        let broken = json.replace("\"burn_bps\":3000", "\"burn_bps\":2000");
        assert!(matches!(
            TemplConfig::from_json(&broken),
            Err(TemplError::InvalidFeeSplit { total: 9_000 })
        ));

        assert!(matches!(
            TemplConfig::from_json("{not json"),
            Err(TemplError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let json = serde_json::to_value(GovernanceParams::default()).unwrap();
        assert_eq!(json["execution_delay"], 36 * 3600);
    }
}
