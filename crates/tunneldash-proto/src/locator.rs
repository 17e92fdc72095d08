//! Service-descriptor parsing
//!
//! Ingress rules describe the proxied service with a scheme-like string:
//! `tcp://db:5432`, `http://localhost:8080`, a bare `host:port`, or just a
//! protocol name like `ssh`. These helpers extract the address and protocol
//! from that shape. They are total: malformed input yields `None`, never an
//! error, so callers can fall through to the next resolution strategy.

use url::Url;

/// Extract the authority (`host` or `host:port`) from a service descriptor.
///
/// Descriptors without a scheme are treated as `ssh://<service>` for parsing
/// purposes, since bare `host:port` is the default SSH shape.
pub fn parse_endpoint_address(service: &str) -> Option<String> {
    if service.is_empty() {
        return None;
    }

    let parsed = if service.contains("://") {
        Url::parse(service)
    } else {
        Url::parse(&format!("ssh://{service}"))
    };

    let url = match parsed {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(service, %err, "could not parse service descriptor");
            return None;
        }
    };

    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Extract the protocol from a service descriptor.
///
/// With a `://` separator the protocol is the scheme; without one it is the
/// token before the first `:` of the raw string — never the `ssh` scheme
/// injected for address parsing. An empty token yields `None`.
pub fn parse_protocol(service: &str) -> Option<String> {
    if let Some(idx) = service.find("://") {
        let scheme = &service[..idx];
        return (!scheme.is_empty()).then(|| scheme.to_ascii_lowercase());
    }

    let token = service.split(':').next().unwrap_or_default();
    (!token.is_empty()).then(|| token.to_string())
}

/// Whether a service descriptor proxies plain HTTP or HTTPS
pub fn is_http_service(service: &str) -> bool {
    service.starts_with("http://") || service.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_from_scheme_descriptor() {
        assert_eq!(
            parse_endpoint_address("tcp://db:5432").as_deref(),
            Some("db:5432")
        );
        assert_eq!(
            parse_endpoint_address("http://localhost:8080").as_deref(),
            Some("localhost:8080")
        );
        assert_eq!(
            parse_endpoint_address("https://app.example.com").as_deref(),
            Some("app.example.com")
        );
    }

    #[test]
    fn address_from_bare_descriptor() {
        assert_eq!(
            parse_endpoint_address("bastion:22").as_deref(),
            Some("bastion:22")
        );
        assert_eq!(parse_endpoint_address("ssh").as_deref(), Some("ssh"));
    }

    #[test]
    fn address_of_malformed_descriptor_is_none() {
        assert_eq!(parse_endpoint_address(""), None);
        assert_eq!(parse_endpoint_address("://nope"), None);
        assert_eq!(parse_endpoint_address("tcp://"), None);
    }

    #[test]
    fn protocol_is_scheme_when_separator_present() {
        assert_eq!(parse_protocol("tcp://db:5432").as_deref(), Some("tcp"));
        assert_eq!(parse_protocol("TCP://db:5432").as_deref(), Some("tcp"));
        assert_eq!(
            parse_protocol("https://app.example.com").as_deref(),
            Some("https")
        );
        assert_eq!(parse_protocol("://db:5432"), None);
    }

    #[test]
    fn protocol_is_leading_token_without_separator() {
        assert_eq!(parse_protocol("ssh").as_deref(), Some("ssh"));
        assert_eq!(parse_protocol("bastion:22").as_deref(), Some("bastion"));
        assert_eq!(parse_protocol(""), None);
        assert_eq!(parse_protocol(":22"), None);
    }

    #[test]
    fn http_service_detection_is_a_prefix_check() {
        assert!(is_http_service("http://localhost:3000"));
        assert!(is_http_service("https://app.example.com"));
        assert!(!is_http_service("tcp://db:5432"));
        assert!(!is_http_service("httpish://x"));
    }
}
