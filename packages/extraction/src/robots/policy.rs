//! Robots.txt parsing into per-domain disallow policies.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

/// How long a parsed robots.txt stays authoritative.
pub const PARSED_POLICY_TTL_HOURS: i64 = 24;

/// How long an "allow everything" default (no robots.txt) stays cached.
pub const DEFAULT_POLICY_TTL_HOURS: i64 = 1;

/// Disallow rules for one domain, as seen by one crawler identity.
///
/// Policies are immutable once built; expiry replaces them wholesale.
/// An empty `disallowed` set allows every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPolicy {
    /// `scheme://host` the policy applies to
    pub domain: String,

    /// Disallowed path prefixes from relevant `User-agent` sections
    pub disallowed: BTreeSet<String>,

    /// When the policy must be re-fetched
    pub expires_at: DateTime<Utc>,
}

impl DomainPolicy {
    /// Build a policy that allows everything, used when a site has no robots.txt.
    pub fn allow_all(domain: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            disallowed: BTreeSet::new(),
            expires_at: now + Duration::hours(DEFAULT_POLICY_TTL_HOURS),
        }
    }

    /// Parse robots.txt content for `identity`.
    ///
    /// A `User-agent:` line opens a section; the section is relevant when
    /// its agent is `*` or equals `identity` (case-insensitive). Only
    /// `Disallow:` lines inside relevant sections are collected. Sections
    /// end at the next `User-agent:` line.
    pub fn parse(
        domain: impl Into<String>,
        content: &str,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let mut disallowed = BTreeSet::new();
        let mut relevant = false;

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match directive.trim().to_ascii_lowercase().as_str() {
                "user-agent" => {
                    relevant = value == "*" || value.eq_ignore_ascii_case(identity);
                }
                "disallow" if relevant && !value.is_empty() => {
                    disallowed.insert(value.to_string());
                }
                _ => {}
            }
        }

        Self {
            domain: domain.into(),
            disallowed,
            expires_at: now + Duration::hours(PARSED_POLICY_TTL_HOURS),
        }
    }

    /// Whether the policy should be re-fetched.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check a path (including any query string) against the disallow set.
    ///
    /// Prefix matching is ordinal and case-sensitive; a `/` entry denies
    /// everything.
    pub fn is_path_allowed(&self, path: &str) -> bool {
        for prefix in &self.disallowed {
            if prefix == "/" {
                return false; // Disallow all
            }
            if path.starts_with(prefix.as_str()) {
                return false;
            }
        }

        true
    }

    /// Check if the policy disallows all crawling.
    pub fn disallows_all(&self) -> bool {
        self.disallowed.contains("/")
    }
}
