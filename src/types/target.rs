//! Scan targets and their resolution.
//!
//! A target is given as an IP literal or a hostname and is resolved exactly
//! once per session. Resolution failure is fatal to the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;
use tracing::debug;

/// A target that has been resolved to a single IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// The input as the user gave it (hostname or IP string).
    pub original: String,
    /// The address every probe in the session connects to.
    pub ip: IpAddr,
}

impl Target {
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }
}

impl From<IpAddr> for Target {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip.to_string(), ip)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.original, self.ip)
        }
    }
}

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// An unresolved target: an IP literal or a hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Ip(IpAddr),
    Hostname(String),
}

impl TargetSpec {
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Ip(ip));
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }
}

/// Turns a host string into a [`Target`].
///
/// Invoked once per session before any probe is dispatched.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Target, TargetError>;
}

/// Resolver backed by the system DNS configuration (`/etc/resolv.conf` and
/// the hosts file on Unix).
///
/// IP literals short-circuit without a lookup. For hostnames the first
/// returned address is used. If the system configuration cannot be read,
/// the lookup falls back to the resolver library's default upstreams.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<Target, TargetError> {
        let hostname = match TargetSpec::parse(host)? {
            TargetSpec::Ip(ip) => return Ok(Target::new(host.trim(), ip)),
            TargetSpec::Hostname(hostname) => hostname,
        };

        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            debug!(error = %e, "system resolver configuration unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        let response = resolver
            .lookup_ip(hostname.as_str())
            .await
            .map_err(|e| TargetError::DnsResolutionFailed(hostname.clone(), e.to_string()))?;

        let ip = response
            .iter()
            .next()
            .ok_or_else(|| TargetError::NoAddressesFound(hostname.clone()))?;

        Ok(Target::new(hostname, ip))
    }
}

/// RFC 1123 hostname check: labels of 1-63 alphanumerics or hyphens, not
/// starting or ending with a hyphen, 253 characters overall.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_ipv4() {
        let spec = TargetSpec::parse("192.168.1.1").unwrap();
        assert!(matches!(spec, TargetSpec::Ip(IpAddr::V4(_))));
    }

    #[test]
    fn test_parse_ipv6() {
        let spec = TargetSpec::parse("::1").unwrap();
        assert!(matches!(spec, TargetSpec::Ip(IpAddr::V6(_))));
    }

    #[test]
    fn test_parse_hostname() {
        let spec = TargetSpec::parse("scanme.example.com").unwrap();
        assert_eq!(spec, TargetSpec::Hostname("scanme.example.com".into()));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TargetSpec::parse("not a host").is_err());
        assert!(TargetSpec::parse("bad..host").is_err());
        assert!(TargetSpec::parse("-leading.com").is_err());
        assert!(TargetSpec::parse("").is_err());
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("my-server"));
        assert!(!is_valid_hostname("trailing-.com"));
        assert!(!is_valid_hostname(&"a".repeat(64)));
    }

    #[test]
    fn test_target_display() {
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert_eq!(Target::from(ip).to_string(), "127.0.0.1");
        assert_eq!(Target::new("localhost", ip).to_string(), "localhost (127.0.0.1)");
    }

    #[tokio::test]
    async fn test_resolve_ip_literal_skips_dns() {
        let target = DnsResolver.resolve(" 127.0.0.1 ").await.unwrap();
        assert_eq!(target.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(target.original, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_resolve_localhost_name() {
        let target = DnsResolver.resolve("localhost").await.unwrap();
        assert!(target.ip.is_loopback());
        assert_eq!(target.original, "localhost");
    }

    #[tokio::test]
    async fn test_resolve_malformed_host_fails() {
        let err = DnsResolver.resolve("no such host!").await.unwrap_err();
        assert!(matches!(err, TargetError::InvalidFormat(_)));
    }
}
