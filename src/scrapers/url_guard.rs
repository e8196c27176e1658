//! URL safety checks run before any page is fetched.
//!
//! Crawls follow links found in third-party markup, so every URL is checked
//! against scheme rules and blocked network ranges (loopback, private,
//! link-local, reserved) before the fetcher performs any I/O.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::LazyLock;
use std::time::Duration;

use ipnet::IpNet;
use thiserror::Error;
use tracing::{debug, warn};
use url::{Host, Url};

/// Default bound on DNS resolution.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Network ranges that are never fetched.
static BLOCKED_CIDRS: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    [
        "0.0.0.0/8",
        "10.0.0.0/8",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16", // link-local, cloud metadata
        "172.16.0.0/12",
        "192.0.0.0/24",
        "192.0.2.0/24",
        "192.168.0.0/16",
        "198.18.0.0/15",
        "198.51.100.0/24",
        "203.0.113.0/24",
        "224.0.0.0/4",
        "240.0.0.0/4",
        "::/128",
        "::1/128",
        "64:ff9b::/96",
        "2001:db8::/32",
        "fc00::/7",
        "fe80::/10",
        "ff00::/8",
    ]
    .into_iter()
    .map(|cidr| cidr.parse().unwrap())
    .collect()
});

/// Why a URL was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed URL {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("scheme '{scheme}' not allowed: {url}")]
    DisallowedScheme { url: String, scheme: String },

    #[error("URL has no host: {url}")]
    MissingHost { url: String },

    #[error("host '{host}' is blocked: {url}")]
    BlockedHost { url: String, host: String },

    #[error("{url} targets blocked address {ip}")]
    BlockedAddress { url: String, ip: IpAddr },
}

impl ValidationError {
    /// The URL that failed validation.
    pub fn url(&self) -> &str {
        match self {
            Self::Malformed { url, .. }
            | Self::DisallowedScheme { url, .. }
            | Self::MissingHost { url }
            | Self::BlockedHost { url, .. }
            | Self::BlockedAddress { url, .. } => url,
        }
    }
}

/// Validates URLs against scheme, hostname and address rules.
#[derive(Debug, Clone)]
pub struct UrlGuard {
    blocked_hosts: HashSet<String>,
    extra_cidrs: Vec<IpNet>,
    dns_timeout: Duration,
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlGuard {
    pub fn new() -> Self {
        Self {
            blocked_hosts: [
                "localhost",
                "localhost.localdomain",
                "metadata.google.internal",
                "metadata.gke.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            extra_cidrs: Vec::new(),
            dns_timeout: DEFAULT_DNS_TIMEOUT,
        }
    }

    /// Set the upper bound on DNS resolution.
    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// Block an additional hostname.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into().to_ascii_lowercase());
        self
    }

    /// Block an additional address range.
    pub fn block_cidr(mut self, cidr: IpNet) -> Self {
        self.extra_cidrs.push(cidr);
        self
    }

    fn is_blocked_ip(&self, ip: IpAddr) -> bool {
        // IPv4-mapped IPv6 addresses are checked as their IPv4 form.
        let ip = match ip {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
            v4 => v4,
        };
        ip.is_unspecified()
            || ip.is_loopback()
            || ip.is_multicast()
            || BLOCKED_CIDRS
                .iter()
                .chain(self.extra_cidrs.iter())
                .any(|cidr| cidr.contains(&ip))
    }

    /// Checks that need no network access: parsing, scheme, blocked host
    /// names and literal IP addresses.
    ///
    /// Returns the parsed URL when those pass.
    pub fn check_static(&self, url: &str) -> Result<Url, ValidationError> {
        let parsed = Url::parse(url).map_err(|e| ValidationError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::DisallowedScheme {
                url: url.to_string(),
                scheme: parsed.scheme().to_string(),
            });
        }

        let ip = match parsed.host() {
            None => {
                return Err(ValidationError::MissingHost {
                    url: url.to_string(),
                })
            }
            Some(Host::Ipv4(v4)) => Some(IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => Some(IpAddr::V6(v6)),
            Some(Host::Domain(domain)) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                if self.blocked_hosts.contains(&domain) || domain.ends_with(".localhost") {
                    return Err(ValidationError::BlockedHost {
                        url: url.to_string(),
                        host: domain,
                    });
                }
                None
            }
        };

        if let Some(ip) = ip {
            if self.is_blocked_ip(ip) {
                return Err(ValidationError::BlockedAddress {
                    url: url.to_string(),
                    ip,
                });
            }
        }

        Ok(parsed)
    }

    /// Full validation: static checks, then DNS resolution of the host with
    /// every resolved address checked against the blocked ranges.
    ///
    /// A hostname whose resolution fails or times out is let through (the
    /// fetch itself will then fail on the same name); only addresses that
    /// actually resolve into a blocked range are refused.
    pub async fn validate(&self, url: &str) -> Result<(), ValidationError> {
        let parsed = self.check_static(url)?;

        let host = match parsed.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            // Literal addresses were already checked.
            _ => return Ok(()),
        };
        let port = parsed.port_or_known_default().unwrap_or(80);

        let lookup = tokio::net::lookup_host((host.as_str(), port));
        let addrs = match tokio::time::timeout(self.dns_timeout, lookup).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => {
                warn!("DNS resolution failed for {}, allowing: {}", host, e);
                return Ok(());
            }
            Err(_) => {
                warn!(
                    "DNS resolution for {} timed out after {:?}, allowing",
                    host, self.dns_timeout
                );
                return Ok(());
            }
        };

        for addr in addrs {
            if self.is_blocked_ip(addr.ip()) {
                return Err(ValidationError::BlockedAddress {
                    url: url.to_string(),
                    ip: addr.ip(),
                });
            }
        }

        debug!("URL passed safety checks: {}", url);
        Ok(())
    }

    /// Boolean form of [`UrlGuard::validate`].
    pub async fn is_safe(&self, url: &str) -> bool {
        self.validate(url).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_loopback() {
        let guard = UrlGuard::new();
        assert!(!guard.is_safe("http://127.0.0.1/").await);
        assert!(!guard.is_safe("http://127.10.0.1:8080/admin").await);
        assert!(!guard.is_safe("http://[::1]/").await);
        assert!(!guard.is_safe("http://localhost/").await);
    }

    #[tokio::test]
    async fn test_rejects_metadata_endpoint() {
        let guard = UrlGuard::new();
        let err = guard
            .validate("http://169.254.169.254/latest/meta-data/")
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::BlockedAddress { .. }));
        assert_eq!(err.url(), "http://169.254.169.254/latest/meta-data/");
    }

    #[tokio::test]
    async fn test_rejects_private_ranges() {
        let guard = UrlGuard::new();
        for url in [
            "http://10.1.2.3/",
            "http://172.16.0.1/",
            "http://192.168.1.1/",
            "http://0.0.0.0/",
            "http://[fd00::1]/",
            "http://[::ffff:127.0.0.1]/",
        ] {
            assert!(!guard.is_safe(url).await, "{url} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_rejects_other_schemes() {
        let guard = UrlGuard::new();
        let err = guard.validate("ftp://example.com/").await.unwrap_err();
        assert_eq!(
            err,
            ValidationError::DisallowedScheme {
                url: "ftp://example.com/".to_string(),
                scheme: "ftp".to_string(),
            }
        );
        assert!(!guard.is_safe("file:///etc/passwd").await);
    }

    #[tokio::test]
    async fn test_rejects_malformed() {
        let guard = UrlGuard::new();
        assert!(matches!(
            guard.validate("not a url").await,
            Err(ValidationError::Malformed { .. })
        ));
        assert!(!guard.is_safe("").await);
    }

    #[tokio::test]
    async fn test_accepts_public_host() {
        let guard = UrlGuard::new().with_dns_timeout(Duration::from_secs(2));
        assert!(guard.is_safe("https://example.com/").await);
        assert!(guard.is_safe("http://93.184.215.14/").await);
    }

    #[test]
    fn test_extra_blocked_host() {
        let guard = UrlGuard::new().block_host("Internal.Example");
        assert!(matches!(
            guard.check_static("https://internal.example/x"),
            Err(ValidationError::BlockedHost { .. })
        ));
    }
}
