use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S"))
    }
}

// =============================================================================
// Risk
// =============================================================================

/// Risk tier assigned to an action kind.
///
/// Totally ordered: `Safe < Low < Medium < High < Critical`. The numeric
/// value is what gets persisted and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RiskLevel {
    #[serde(alias = "safe")]
    Safe = 1,
    #[serde(alias = "low")]
    Low = 2,
    #[serde(alias = "medium")]
    Medium = 3,
    #[serde(alias = "high")]
    High = 4,
    #[serde(alias = "critical")]
    Critical = 5,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Safe,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.value() == value)
    }

    /// True when this level is strictly above `ceiling`.
    pub fn exceeds(self, ceiling: RiskLevel) -> bool {
        self > ceiling
    }

    /// MEDIUM and above ask the operator before running.
    pub fn requires_confirmation(self) -> bool {
        self >= RiskLevel::Medium
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Safe => write!(f, "SAFE"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Ok(RiskLevel::Safe),
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Safe < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_values() {
        let values: Vec<u8> = RiskLevel::ALL.iter().map(|l| l.value()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
        assert_eq!(RiskLevel::from_value(4), Some(RiskLevel::High));
        assert_eq!(RiskLevel::from_value(0), None);
        assert_eq!(RiskLevel::from_value(6), None);
    }

    #[test]
    fn test_risk_level_from_str_is_case_insensitive() {
        assert_eq!("high".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!("CRITICAL".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert_eq!(" Low ".parse::<RiskLevel>().unwrap(), RiskLevel::Low);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_risk_level_display_matches_parse() {
        for level in RiskLevel::ALL {
            assert_eq!(level.to_string().parse::<RiskLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_exceeds_is_strict() {
        assert!(RiskLevel::High.exceeds(RiskLevel::Medium));
        assert!(!RiskLevel::High.exceeds(RiskLevel::High));
        assert!(!RiskLevel::Low.exceeds(RiskLevel::High));
    }

    #[test]
    fn test_requires_confirmation_threshold() {
        assert!(!RiskLevel::Safe.requires_confirmation());
        assert!(!RiskLevel::Low.requires_confirmation());
        assert!(RiskLevel::Medium.requires_confirmation());
        assert!(RiskLevel::High.requires_confirmation());
        assert!(RiskLevel::Critical.requires_confirmation());
    }

    #[test]
    fn test_risk_level_serde_accepts_lowercase_alias() {
        let level: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(level, RiskLevel::Medium);
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn test_timestamp_round_trip_datetime() {
        let ts = Timestamp(1_700_000_000);
        assert_eq!(Timestamp::from_datetime(ts.to_datetime()), ts);
        assert_eq!(ts.to_string(), "2023-11-14 22:13:20");
    }
}
