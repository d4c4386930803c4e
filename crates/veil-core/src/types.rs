use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque identifier assigned to an object by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sharing policy carried inside the artifact name.
///
/// Every field is optional; an absent field means "no restriction". The
/// policy is advisory: it is evaluated by the downloading client and offers
/// no protection against a client that ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Absolute expiry instant (RFC 3339 in the encoded form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of downloads after which access is denied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_downloads: Option<u32>,
    /// Deny after the first download and delete the object once opened
    #[serde(default, skip_serializing_if = "is_false")]
    pub self_destruct: bool,
    /// ISO 3166 region codes allowed to open the artifact (empty = any)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allowed_countries: BTreeSet<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Policy {
    /// True if no dimension restricts access.
    pub fn is_unrestricted(&self) -> bool {
        self.expires_at.is_none()
            && self.max_downloads.is_none()
            && !self.self_destruct
            && self.allowed_countries.is_empty()
    }
}

/// Why a policy check refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    Expired,
    DownloadLimitExceeded,
    SelfDestructed,
    RegionDenied,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DenyReason::Expired => "link expired",
            DenyReason::DownloadLimitExceeded => "download limit reached",
            DenyReason::SelfDestructed => "file has self-destructed",
            DenyReason::RegionDenied => "not available in your region",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_policy_serializes_empty() {
        let json = serde_json::to_string(&Policy::default()).unwrap();
        assert_eq!(json, "{}");
        assert!(Policy::default().is_unrestricted());
    }

    #[test]
    fn test_policy_camel_case_keys() {
        let policy = Policy {
            expires_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()),
            max_downloads: Some(3),
            self_destruct: true,
            allowed_countries: ["DE".to_string(), "FR".to_string()].into_iter().collect(),
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(
            json,
            r#"{"expiresAt":"2026-03-01T12:00:00Z","maxDownloads":3,"selfDestruct":true,"allowedCountries":["DE","FR"]}"#
        );
        let parsed: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
        assert!(!parsed.is_unrestricted());
    }

    #[test]
    fn test_policy_ignores_unknown_fields() {
        let parsed: Policy = serde_json::from_str(r#"{"maxDownloads":1,"note":"x"}"#).unwrap();
        assert_eq!(parsed.max_downloads, Some(1));
    }
}
