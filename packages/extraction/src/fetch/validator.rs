//! Outbound URL screening.
//!
//! Article links come from an untrusted feed and are followed on an agent's
//! behalf, so only public http(s) hosts are reachable. A hostname is judged
//! by what it resolves to, not by how it is spelled.

use std::net::{IpAddr, SocketAddr};

use ipnet::IpNet;
use url::{Host, Url};

use crate::error::SecurityError;

const PRIVATE_RANGES: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "127.0.0.0/8",
    "169.254.0.0/16", // cloud metadata lives here
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

const INTERNAL_HOSTS: &[&str] = &[
    "localhost",
    "instance-data",
    "metadata.google.internal",
    "metadata.gke.internal",
];

/// Rejects URLs that point at loopback, private ranges, metadata services or
/// non-web schemes.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    private_ranges: Vec<IpNet>,
    internal_hosts: Vec<String>,
    trusted_hosts: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    pub fn new() -> Self {
        Self {
            private_ranges: PRIVATE_RANGES
                .iter()
                .filter_map(|range| range.parse().ok())
                .collect(),
            internal_hosts: INTERNAL_HOSTS.iter().map(|h| h.to_string()).collect(),
            trusted_hosts: Vec::new(),
        }
    }

    /// Let a host through unchecked, e.g. a local test server.
    pub fn trust_host(mut self, host: impl Into<String>) -> Self {
        self.trusted_hosts.push(host.into());
        self
    }

    /// Treat another hostname as internal.
    pub fn deny_host(mut self, host: impl Into<String>) -> Self {
        self.internal_hosts.push(host.into().to_ascii_lowercase());
        self
    }

    /// Check the URL as written: scheme, host name and literal addresses.
    ///
    /// Names are not resolved here; see [`UrlValidator::validate_with_dns`].
    pub fn validate(&self, raw: &str) -> Result<(), SecurityError> {
        let url = Url::parse(raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SecurityError::Scheme(url.scheme().to_string()));
        }

        let host = url.host().ok_or(SecurityError::MissingHost)?;
        let name = host.to_string();
        if self.is_trusted(&name) {
            return Ok(());
        }

        let address = match host {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                if self.internal_hosts.contains(&domain) {
                    return Err(SecurityError::InternalHost(domain));
                }
                return Ok(());
            }
            Host::Ipv4(v4) => IpAddr::V4(v4),
            Host::Ipv6(v6) => IpAddr::V6(v6),
        };

        if self.is_private(address) {
            return Err(SecurityError::PrivateAddress(address));
        }
        Ok(())
    }

    /// [`validate`](Self::validate), then resolve the host and reject it if
    /// any address it maps to is private.
    pub async fn validate_with_dns(&self, raw: &str) -> Result<(), SecurityError> {
        self.validate(raw)?;

        let url = Url::parse(raw)?;
        let domain = match url.host() {
            Some(Host::Domain(domain)) if !self.is_trusted(domain) => domain.to_string(),
            _ => return Ok(()),
        };
        let port = url.port_or_known_default().unwrap_or(80);

        let addresses: Vec<SocketAddr> = tokio::net::lookup_host((domain.as_str(), port))
            .await
            .map_err(|e| SecurityError::Resolution {
                host: domain.clone(),
                reason: e.to_string(),
            })?
            .collect();
        self.check_resolved(&domain, &addresses)
    }

    /// Reject `host` if any of its resolved addresses is private.
    pub fn check_resolved(&self, host: &str, addresses: &[SocketAddr]) -> Result<(), SecurityError> {
        if addresses.is_empty() {
            return Err(SecurityError::Resolution {
                host: host.to_string(),
                reason: "no addresses".into(),
            });
        }
        match addresses.iter().map(SocketAddr::ip).find(|ip| self.is_private(*ip)) {
            Some(address) => Err(SecurityError::ResolvesPrivate {
                host: host.to_string(),
                address,
            }),
            None => Ok(()),
        }
    }

    fn is_trusted(&self, host: &str) -> bool {
        self.trusted_hosts.iter().any(|trusted| trusted == host)
    }

    fn is_private(&self, address: IpAddr) -> bool {
        // ::ffff:10.0.0.1 must be judged as 10.0.0.1
        let address = address.to_canonical();
        address.is_unspecified()
            || self.private_ranges.iter().any(|range| range.contains(&address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_hosts_pass() {
        let validator = UrlValidator::new();
        assert!(validator.validate("https://example.com/post").is_ok());
        assert!(validator.validate("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn test_internal_targets_are_refused() {
        let validator = UrlValidator::new();

        assert!(matches!(
            validator.validate("http://LOCALHOST:8080"),
            Err(SecurityError::InternalHost(_))
        ));
        for url in [
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/",
            "http://10.1.2.3/",
        ] {
            assert!(
                matches!(validator.validate(url), Err(SecurityError::PrivateAddress(_))),
                "{url} should be refused"
            );
        }
    }

    #[test]
    fn test_non_web_schemes_are_refused() {
        let validator = UrlValidator::new();

        assert!(matches!(
            validator.validate("ftp://example.com/file"),
            Err(SecurityError::Scheme(_))
        ));
        assert!(matches!(
            validator.validate("not a url"),
            Err(SecurityError::Malformed(_))
        ));
    }

    #[test]
    fn test_trusted_and_denied_hosts() {
        let trusted = UrlValidator::new().trust_host("localhost");
        assert!(trusted.validate("http://localhost:3000").is_ok());

        let denied = UrlValidator::new().deny_host("Intranet.corp");
        assert!(denied.validate("https://intranet.corp/").is_err());
    }

    #[test]
    fn test_trailing_dot_and_mapped_addresses() {
        let validator = UrlValidator::new();

        assert!(matches!(
            validator.validate("http://localhost./"),
            Err(SecurityError::InternalHost(_))
        ));
        assert!(matches!(
            validator.validate("http://[::ffff:127.0.0.1]/"),
            Err(SecurityError::PrivateAddress(_))
        ));
    }

    #[test]
    fn test_names_resolving_to_private_addresses_are_refused() {
        let validator = UrlValidator::new();
        let metadata: SocketAddr = "169.254.169.254:80".parse().unwrap();
        let public: SocketAddr = "93.184.216.34:443".parse().unwrap();

        // Spelled like a public host, so only resolution catches it
        assert!(validator
            .validate("http://169.254.169.254.nip.io/latest/meta-data")
            .is_ok());
        assert!(matches!(
            validator.check_resolved("169.254.169.254.nip.io", &[public, metadata]),
            Err(SecurityError::ResolvesPrivate { .. })
        ));
        assert!(validator.check_resolved("example.com", &[public]).is_ok());
        assert!(matches!(
            validator.check_resolved("example.com", &[]),
            Err(SecurityError::Resolution { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_with_dns() {
        let validator = UrlValidator::new();

        assert!(matches!(
            validator.validate_with_dns("http://[::1]/").await,
            Err(SecurityError::PrivateAddress(_))
        ));
        assert!(validator.validate_with_dns("http://93.184.216.34/").await.is_ok());
        assert!(matches!(
            validator.validate_with_dns("http://no-such-host.invalid/").await,
            Err(SecurityError::Resolution { .. })
        ));
        assert!(UrlValidator::new()
            .trust_host("no-such-host.invalid")
            .validate_with_dns("http://no-such-host.invalid/")
            .await
            .is_ok());
    }
}
