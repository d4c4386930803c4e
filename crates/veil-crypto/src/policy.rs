//! Client-side evaluation of sharing policies
//!
//! There is no server to count downloads or enforce expiry, so every check
//! here is advisory: a client that skips it can still decrypt with the key.

use chrono::{DateTime, Utc};
use veil_core::{DenyReason, Policy, VeilError, VeilResult};

/// What the downloading client knows about the current access attempt.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub now: DateTime<Utc>,
    /// Downloads this client has observed for the object (not authoritative)
    pub observed_downloads: u32,
    /// Caller's ISO 3166 region code, if known
    pub region: Option<String>,
}

impl AccessContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            observed_downloads: 0,
            region: None,
        }
    }

    pub fn with_downloads(mut self, observed: u32) -> Self {
        self.observed_downloads = observed;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }

    pub fn into_result(self) -> VeilResult<()> {
        match self {
            Decision::Admit => Ok(()),
            Decision::Deny(reason) => Err(VeilError::PolicyViolation(reason)),
        }
    }
}

/// Evaluate `policy` against `ctx`. Dimensions are checked in a fixed order
/// and the first failing one is reported; an absent restriction admits.
pub fn check(policy: &Policy, ctx: &AccessContext) -> Decision {
    if let Some(expires_at) = policy.expires_at {
        if ctx.now > expires_at {
            return Decision::Deny(DenyReason::Expired);
        }
    }

    if let Some(max) = policy.max_downloads {
        if ctx.observed_downloads >= max {
            return Decision::Deny(DenyReason::DownloadLimitExceeded);
        }
    }

    if policy.self_destruct && ctx.observed_downloads >= 1 {
        return Decision::Deny(DenyReason::SelfDestructed);
    }

    if !policy.allowed_countries.is_empty() {
        let allowed = ctx.region.as_deref().is_some_and(|region| {
            policy
                .allowed_countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(region))
        });
        if !allowed {
            return Decision::Deny(DenyReason::RegionDenied);
        }
    }

    Decision::Admit
}
