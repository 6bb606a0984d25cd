// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hostname parsing.
//!
//! Turns the `X-Forwarded-Host` / `Host` header into a [`DomainInfo`]. Pure:
//! no store or network access, and malformed input still yields a
//! best-effort result classified as a custom domain.

use std::net::{IpAddr, Ipv6Addr};

use axum::http::{header::HOST, HeaderMap};
use serde::Serialize;

/// Forwarding header set by the ingress.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Maximum length of a DNS name.
const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Parsed request hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    /// Hostname as received (lowercased, port and trailing dot removed).
    pub hostname: String,
    /// Domain used for `find_by_domain` lookups.
    pub domain: String,
    /// Tenant label under the platform domain.
    pub subdomain: Option<String>,
    pub port: Option<u16>,
    pub is_custom_domain: bool,
    pub is_localhost: bool,
}

impl DomainInfo {
    /// Whether the hostname is a syntactically valid DNS name or IP literal.
    pub fn is_well_formed(&self) -> bool {
        if self.hostname.parse::<IpAddr>().is_ok() {
            return true;
        }
        !self.hostname.is_empty()
            && self.hostname.len() <= MAX_HOSTNAME_LEN
            && self.hostname.split('.').all(is_valid_label)
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Classifies hostnames relative to the platform domain.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    platform_domain: String,
}

impl DomainResolver {
    /// `platform_domain` is the suffix under which a single label names a
    /// subdomain tenant (e.g. `platform.tld` for `acme.platform.tld`).
    pub fn new(platform_domain: impl Into<String>) -> Self {
        let platform_domain = platform_domain
            .into()
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase();
        Self { platform_domain }
    }

    pub fn platform_domain(&self) -> &str {
        &self.platform_domain
    }

    /// Raw host value of a request: first `X-Forwarded-Host` entry, else `Host`.
    pub fn host_header(headers: &HeaderMap) -> Option<String> {
        let forwarded = headers
            .get(X_FORWARDED_HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        forwarded
            .or_else(|| {
                headers
                    .get(HOST)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            })
            .map(str::to_string)
    }

    /// Parse the host of a request, if it carries one.
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<DomainInfo> {
        Self::host_header(headers).map(|host| self.parse(&host))
    }

    /// Parse a raw host value (`name[:port]` or `[v6]:port`).
    pub fn parse(&self, raw: &str) -> DomainInfo {
        let raw = raw.trim().to_ascii_lowercase();
        let (host, port) = split_port(&raw);
        let hostname = host.trim_end_matches('.').to_string();

        let is_localhost = is_local_host(&hostname);
        let well_formed_labels = !hostname.is_empty() && hostname.split('.').all(is_valid_label);

        if let Some(label) = self.platform_label(&hostname) {
            return DomainInfo {
                domain: hostname.clone(),
                subdomain: Some(label.to_string()),
                hostname,
                port,
                is_custom_domain: false,
                is_localhost,
            };
        }

        let is_platform_apex = hostname == self.platform_domain;
        let is_ip = hostname.parse::<IpAddr>().is_ok();
        let domain = hostname
            .strip_prefix("www.")
            .filter(|rest| rest.contains('.'))
            .unwrap_or(&hostname)
            .to_string();

        let is_custom_domain =
            !(is_localhost || is_platform_apex || is_ip) || !(well_formed_labels || is_ip);

        DomainInfo {
            is_custom_domain,
            domain,
            subdomain: None,
            hostname,
            port,
            is_localhost,
        }
    }

    /// The single label in front of the platform domain, if that's the shape.
    fn platform_label<'a>(&self, hostname: &'a str) -> Option<&'a str> {
        let label = hostname
            .strip_suffix(self.platform_domain.as_str())?
            .strip_suffix('.')?;
        (!label.contains('.') && is_valid_label(label) && label != "www").then_some(label)
    }
}

/// Split `host:port`, tolerating bracketed IPv6 literals and bare IPv6.
fn split_port(raw: &str) -> (&str, Option<u16>) {
    if let Some(rest) = raw.strip_prefix('[') {
        if let Some((host, after)) = rest.split_once(']') {
            let port = after.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
        return (raw, None);
    }

    // More than one colon without brackets is a bare IPv6 address.
    if raw.matches(':').count() > 1 {
        return (raw, None);
    }

    match raw.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (host, None),
        },
        None => (raw, None),
    }
}

fn is_local_host(hostname: &str) -> bool {
    if hostname == "localhost" || hostname.ends_with(".localhost") {
        return true;
    }
    match hostname.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_loopback() || v4.is_private() || v4.is_unspecified(),
        Ok(IpAddr::V6(v6)) => v6.is_loopback() || v6.is_unspecified() || is_unique_local(&v6),
        Err(_) => false,
    }
}

/// fc00::/7
fn is_unique_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn resolver() -> DomainResolver {
        DomainResolver::new("platform.tld")
    }

    #[test]
    fn subdomain_tenant() {
        let info = resolver().parse("Acme.Platform.tld:8443");
        assert_eq!(info.hostname, "acme.platform.tld");
        assert_eq!(info.subdomain.as_deref(), Some("acme"));
        assert_eq!(info.port, Some(8443));
        assert!(!info.is_custom_domain);
        assert!(!info.is_localhost);
    }

    #[test]
    fn nested_labels_are_custom_domains() {
        let info = resolver().parse("a.b.platform.tld");
        assert!(info.subdomain.is_none());
        assert!(info.is_custom_domain);
    }

    #[test]
    fn custom_domain_strips_www() {
        let info = resolver().parse("www.acme-diner.com");
        assert_eq!(info.domain, "acme-diner.com");
        assert_eq!(info.hostname, "www.acme-diner.com");
        assert!(info.is_custom_domain);
        assert!(info.subdomain.is_none());
    }

    #[test]
    fn localhost_variants() {
        for host in ["localhost:3000", "127.0.0.1", "192.168.1.20:8080", "[::1]:8080", "10.0.0.5"] {
            let info = resolver().parse(host);
            assert!(info.is_localhost, "{host} should be local");
            assert!(!info.is_custom_domain, "{host} should not be custom");
        }
        assert_eq!(resolver().parse("[::1]:8080").port, Some(8080));
    }

    #[test]
    fn subdomain_of_localhost_platform() {
        let info = DomainResolver::new("localhost").parse("acme.localhost:3000");
        assert_eq!(info.subdomain.as_deref(), Some("acme"));
        assert!(info.is_localhost);
    }

    #[test]
    fn malformed_input_is_best_effort_custom() {
        let info = resolver().parse("bad host!:notaport");
        assert!(info.is_custom_domain);
        assert!(info.port.is_none());
        assert!(!info.is_well_formed());

        let empty = resolver().parse("");
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn forwarded_host_wins_over_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        headers.insert(
            X_FORWARDED_HOST,
            HeaderValue::from_static("acme.platform.tld, proxy.internal"),
        );
        assert_eq!(
            DomainResolver::host_header(&headers).as_deref(),
            Some("acme.platform.tld")
        );

        headers.remove(X_FORWARDED_HOST);
        assert_eq!(DomainResolver::host_header(&headers).as_deref(), Some("internal:8080"));
    }

    #[test]
    fn platform_apex_is_not_custom() {
        let info = resolver().parse("platform.tld");
        assert!(!info.is_custom_domain);
        assert!(info.subdomain.is_none());
    }
}
