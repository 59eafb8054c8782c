//! Client identity resolution — one canonical address string per request.

use std::net::SocketAddr;

use coupond_core::ServiceError;

/// Header consulted for the originating client address when the service
/// sits behind a reverse proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the canonical client identity for a request.
///
/// A forwarding header may carry a comma-separated proxy chain; only the
/// first entry (the originating client) counts. Falls back to the socket
/// peer address, without the port. Pure function of request metadata.
///
/// Returns `ServiceError::Internal` when neither source yields a
/// non-empty identity — that only happens in a misconfigured
/// deployment, and allocating to an empty identity would let every
/// such request share one claim window.
pub fn resolve_identity(
    forwarded_for: Option<&str>,
    peer: Option<SocketAddr>,
) -> Result<String, ServiceError> {
    if let Some(chain) = forwarded_for {
        let first = chain.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Ok(first.to_string());
        }
    }

    if let Some(addr) = peer {
        return Ok(addr.ip().to_string());
    }

    Err(ServiceError::Internal(
        "cannot resolve client identity: no forwarding header and no peer address".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "192.0.2.7:54321".parse().unwrap()
    }

    #[test]
    fn forwarded_single_entry() {
        let id = resolve_identity(Some("203.0.113.5"), Some(peer())).unwrap();
        assert_eq!(id, "203.0.113.5");
    }

    #[test]
    fn forwarded_chain_takes_first() {
        let id = resolve_identity(
            Some("203.0.113.5, 10.0.0.2, 10.0.0.1"),
            Some(peer()),
        )
        .unwrap();
        assert_eq!(id, "203.0.113.5");
    }

    #[test]
    fn forwarded_entry_is_trimmed() {
        let id = resolve_identity(Some("  203.0.113.5 , 10.0.0.2"), Some(peer())).unwrap();
        assert_eq!(id, "203.0.113.5");
    }

    #[test]
    fn no_header_falls_back_to_peer_ip() {
        let id = resolve_identity(None, Some(peer())).unwrap();
        assert_eq!(id, "192.0.2.7");
    }

    #[test]
    fn empty_header_falls_back_to_peer_ip() {
        let id = resolve_identity(Some("   "), Some(peer())).unwrap();
        assert_eq!(id, "192.0.2.7");
    }

    #[test]
    fn nothing_to_resolve_is_internal_error() {
        let err = resolve_identity(None, None).unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));

        let err = resolve_identity(Some(""), None).unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
