//! Endpoint transport-security policy.

use std::net::IpAddr;

use url::{Host, Url};

use crate::error::BridgeError;

/// Parse `endpoint` and check that it is safe to send a bearer token to.
///
/// - `wss://` is always accepted
/// - `ws://` is accepted for loopback hosts (`localhost`, `127.0.0.0/8`, `::1`)
/// - `ws://` elsewhere is accepted only when `forwarded_proto` is `https`,
///   i.e. a reverse proxy in front of us already terminates TLS
pub fn validate_endpoint(endpoint: &str, forwarded_proto: Option<&str>) -> Result<Url, BridgeError> {
    let url = Url::parse(endpoint).map_err(|e| BridgeError::InvalidUrl(format!("{endpoint}: {e}")))?;

    match url.scheme() {
        "wss" => Ok(url),
        "ws" => {
            let behind_tls_proxy =
                forwarded_proto.is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));
            if is_loopback(&url) || behind_tls_proxy {
                Ok(url)
            } else {
                Err(BridgeError::InsecureEndpoint(endpoint.to_string()))
            }
        }
        other => Err(BridgeError::InvalidUrl(format!(
            "{endpoint}: unsupported scheme '{other}'"
        ))),
    }
}

/// Whether the URL's host is a loopback name or address.
pub fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wss_is_always_accepted() {
        assert!(validate_endpoint("wss://bridge.example.com/ws", None).is_ok());
    }

    #[test]
    fn test_loopback_is_exempt() {
        for endpoint in [
            "ws://localhost:8080/ws",
            "ws://LOCALHOST/ws",
            "ws://127.0.0.1:3000",
            "ws://127.10.0.5/ws",
            "ws://[::1]:9000/ws",
        ] {
            assert!(validate_endpoint(endpoint, None).is_ok(), "{endpoint}");
        }
    }

    #[test]
    fn test_plain_remote_is_rejected() {
        for endpoint in ["ws://bridge.example.com/ws", "ws://10.0.0.1/ws", "ws://128.0.0.1/ws"] {
            assert!(
                matches!(
                    validate_endpoint(endpoint, None),
                    Err(BridgeError::InsecureEndpoint(_))
                ),
                "{endpoint}"
            );
        }
    }

    #[test]
    fn test_forwarded_https_is_accepted() {
        assert!(validate_endpoint("ws://bridge.internal/ws", Some("https")).is_ok());
        assert!(validate_endpoint("ws://bridge.internal/ws", Some(" HTTPS ")).is_ok());
        assert!(matches!(
            validate_endpoint("ws://bridge.internal/ws", Some("http")),
            Err(BridgeError::InsecureEndpoint(_))
        ));
    }

    #[test]
    fn test_bad_urls() {
        assert!(matches!(
            validate_endpoint("not a url", None),
            Err(BridgeError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_endpoint("https://bridge.example.com", None),
            Err(BridgeError::InvalidUrl(_))
        ));
    }
}
