// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request provenance.
//
// Who sent a document is recorded for the job list and upload metadata only;
// it never influences dispatch.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;

use printdrop_core::types::SourceInfo;

const IPV4_MAPPED_PREFIX: &str = "::ffff:";

/// Extractor for the sender of the current request.
#[derive(Debug, Clone)]
pub struct ClientSource(pub SourceInfo);

impl<S: Send + Sync> FromRequestParts<S> for ClientSource {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self(source_info(&parts.headers, peer)))
    }
}

/// Client address from the first `X-Forwarded-For` entry, else the peer
/// address; user agent from `User-Agent`, else "unknown".
pub fn source_info(headers: &HeaderMap, peer: Option<String>) -> SourceInfo {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned);

    let ip = forwarded.or(peer).unwrap_or_else(|| "unknown".to_owned());
    let ip = ip.strip_prefix(IPV4_MAPPED_PREFIX).map(str::to_owned).unwrap_or(ip);

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|ua| !ua.is_empty())
        .unwrap_or("unknown");

    SourceInfo::new(ip, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 10.1.2.3 , 172.16.0.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let info = source_info(&headers, Some("192.168.1.1".into()));
        assert_eq!(info.ip_address, "10.1.2.3");
        assert_eq!(info.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn peer_address_loses_ipv4_mapped_prefix() {
        let info = source_info(&HeaderMap::new(), Some("::ffff:192.168.1.40".into()));
        assert_eq!(info.ip_address, "192.168.1.40");
        assert_eq!(info.user_agent.as_deref(), Some("unknown"));
    }

    #[test]
    fn nothing_known_is_unknown() {
        let info = source_info(&HeaderMap::new(), None);
        assert_eq!(info.ip_address, "unknown");
        assert!(info.hostname.is_none());
    }
}
