//! Request metadata recorded alongside tracking events.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};

/// Who fetched the pixel or followed the link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
  pub ip:         Option<String>,
  pub user_agent: Option<String>,
}

impl ClientInfo {
  /// The first `X-Forwarded-For` entry wins over the socket peer address.
  pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
    let forwarded = headers
      .get("x-forwarded-for")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.split(',').next())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(str::to_owned);

    let user_agent = headers
      .get(header::USER_AGENT)
      .and_then(|v| v.to_str().ok())
      .filter(|v| !v.is_empty())
      .map(str::to_owned);

    Self {
      ip: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
      user_agent,
    }
  }
}

impl<S> FromRequestParts<S> for ClientInfo
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let peer = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| *addr);
    Ok(Self::from_headers(&parts.headers, peer))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn peer() -> Option<SocketAddr> { Some("198.51.100.4:40000".parse().unwrap()) }

  #[test]
  fn forwarded_for_wins() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
    headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    let info = ClientInfo::from_headers(&headers, peer());
    assert_eq!(info.ip.as_deref(), Some("203.0.113.9"));
    assert_eq!(info.user_agent.as_deref(), Some("Mozilla/5.0"));
  }

  #[test]
  fn falls_back_to_peer_address() {
    let info = ClientInfo::from_headers(&HeaderMap::new(), peer());
    assert_eq!(info.ip.as_deref(), Some("198.51.100.4"));
    assert_eq!(info.user_agent, None);
  }

  #[test]
  fn nothing_known() {
    assert_eq!(ClientInfo::from_headers(&HeaderMap::new(), None), ClientInfo::default());
  }
}
