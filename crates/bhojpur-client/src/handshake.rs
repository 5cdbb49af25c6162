//! Handshake header injection for the WebSocket upgrade request.
//!
//! Headers are fixed once the upgrade completes; they are applied in the
//! order `Origin`, extra headers, `Authorization`, so an extra header may
//! override the origin but never the bearer token.

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, ORIGIN};
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::errors::{ClientError, Result};

/// Origin and bearer token for one connection attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    /// Value of the `Origin` header.
    pub origin: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
}

impl AuthContext {
    /// Pair an origin with a token.
    pub fn new(origin: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            token: token.into(),
        }
    }
}

/// Everything needed to open a session.
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    /// `ws://` or `wss://` endpoint.
    pub endpoint: String,
    /// Explicit origin; derived from the endpoint when `None`.
    pub origin: Option<String>,
    /// Bearer token; no `Authorization` header when `None`.
    pub token: Option<String>,
    /// Additional handshake headers.
    pub extra_headers: Vec<(String, String)>,
}

impl ConnectOptions {
    /// Options for `endpoint` with no credentials.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the `Origin` header.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add an extra handshake header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Sets `Origin` and `Authorization: Bearer` on the upgrade request.
#[derive(Clone, Debug)]
pub struct HandshakePolicy {
    origin: String,
    token: Option<String>,
    extra_headers: Vec<(String, String)>,
}

impl HandshakePolicy {
    /// Policy for a fixed origin and token.
    pub fn new(auth: &AuthContext) -> Self {
        Self {
            origin: auth.origin.clone(),
            token: Some(auth.token.clone()),
            extra_headers: Vec::new(),
        }
    }

    /// Policy for `options`, deriving the origin from the endpoint if unset.
    pub fn from_options(options: &ConnectOptions) -> Result<Self> {
        let origin = match &options.origin {
            Some(origin) => origin.clone(),
            None => default_origin(&options.endpoint)?,
        };
        Ok(Self {
            origin,
            token: options.token.clone(),
            extra_headers: options.extra_headers.clone(),
        })
    }

    /// The origin this policy sends.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Write the policy's headers into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let _ = headers.insert(ORIGIN, header_value(ORIGIN.as_str(), &self.origin)?);

        for (name, value) in &self.extra_headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let _ = headers.insert(header, header_value(name, value)?);
        }

        if let Some(token) = &self.token {
            let bearer = format!("Bearer {token}");
            let _ = headers.insert(AUTHORIZATION, header_value(AUTHORIZATION.as_str(), &bearer)?);
        }
        Ok(())
    }

    /// Build the upgrade request for `endpoint` with the policy applied.
    pub fn build_request(&self, endpoint: &str) -> Result<Request> {
        let _ = parse_endpoint(endpoint)?;
        let mut request =
            endpoint
                .into_client_request()
                .map_err(|e| ClientError::InvalidEndpoint {
                    endpoint: endpoint.to_owned(),
                    reason: e.to_string(),
                })?;
        self.apply(request.headers_mut())?;
        Ok(request)
    }
}

/// Origin the server expects for `endpoint`: `wss` maps to `https`, `ws`
/// to `http`, keeping only the host.
pub fn default_origin(endpoint: &str) -> Result<String> {
    let uri = parse_endpoint(endpoint)?;
    let scheme = if uri.scheme_str() == Some("wss") {
        "https"
    } else {
        "http"
    };
    let host = uri.host().unwrap_or_default();
    Ok(format!("{scheme}://{host}/"))
}

fn parse_endpoint(endpoint: &str) -> Result<Uri> {
    let invalid = |reason: &str| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason: reason.to_owned(),
    };

    let uri: Uri = endpoint.parse().map_err(|_| invalid("not a valid URI"))?;
    match uri.scheme_str() {
        Some("ws" | "wss") => {}
        Some(_) => return Err(invalid("scheme must be ws or wss")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(uri)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
        name: name.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn header<'a>(request: &'a Request, name: &str) -> Vec<&'a str> {
        request
            .headers()
            .get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    // ── Fixed auth context ──────────────────────────────────────────

    #[test]
    fn sets_origin_and_bearer_exactly_once() {
        let policy = HandshakePolicy::new(&AuthContext::new("https://origin.example/", "tok-123"));
        let request = policy.build_request("wss://test/api/v1").unwrap();
        assert_eq!(header(&request, "origin"), vec!["https://origin.example/"]);
        assert_eq!(header(&request, "authorization"), vec!["Bearer tok-123"]);
    }

    #[test]
    fn keeps_websocket_upgrade_headers() {
        let policy = HandshakePolicy::new(&AuthContext::new("https://o/", "t"));
        let request = policy.build_request("ws://127.0.0.1:9/api/v1").unwrap();
        assert_eq!(request.uri().path(), "/api/v1");
        assert!(request.headers().contains_key("sec-websocket-key"));
    }

    #[test]
    fn empty_token_still_sends_bearer_prefix() {
        let policy = HandshakePolicy::new(&AuthContext::new("https://o/", ""));
        let request = policy.build_request("ws://host/").unwrap();
        assert_eq!(header(&request, "authorization"), vec!["Bearer "]);
    }

    // ── Options ─────────────────────────────────────────────────────

    #[test]
    fn origin_derived_from_secure_endpoint() {
        let options = ConnectOptions::new("wss://bhojpur.net:443/api/v1").with_token("t");
        let policy = HandshakePolicy::from_options(&options).unwrap();
        assert_eq!(policy.origin(), "https://bhojpur.net/");
    }

    #[test]
    fn origin_derived_from_plain_endpoint() {
        assert_eq!(
            default_origin("ws://localhost:3000/api/v1").unwrap(),
            "http://localhost/"
        );
    }

    #[test]
    fn no_token_means_no_authorization_header() {
        let options = ConnectOptions::new("ws://host/api");
        let request = HandshakePolicy::from_options(&options)
            .unwrap()
            .build_request(&options.endpoint)
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert_eq!(header(&request, "origin"), vec!["http://host/"]);
    }

    #[test]
    fn extra_headers_override_origin_but_not_authorization() {
        let options = ConnectOptions::new("ws://host/api")
            .with_token("secret")
            .with_header("Origin", "https://override/")
            .with_header("Authorization", "Basic nope")
            .with_header("X-Client", "testclient");
        let request = HandshakePolicy::from_options(&options)
            .unwrap()
            .build_request(&options.endpoint)
            .unwrap();
        assert_eq!(header(&request, "origin"), vec!["https://override/"]);
        assert_eq!(header(&request, "authorization"), vec!["Bearer secret"]);
        assert_eq!(header(&request, "x-client"), vec!["testclient"]);
    }

    // ── Rejections ──────────────────────────────────────────────────

    #[test]
    fn rejects_http_scheme() {
        let policy = HandshakePolicy::new(&AuthContext::new("https://o/", "t"));
        assert_matches!(
            policy.build_request("https://host/api"),
            Err(ClientError::InvalidEndpoint { .. })
        );
    }

    #[test]
    fn rejects_garbage_uri() {
        assert_matches!(
            default_origin("not a uri"),
            Err(ClientError::InvalidEndpoint { .. })
        );
    }

    #[test]
    fn rejects_relative_uri() {
        assert_matches!(
            default_origin("/api/v1"),
            Err(ClientError::InvalidEndpoint { .. })
        );
    }

    #[test]
    fn rejects_token_with_newline() {
        let policy = HandshakePolicy::new(&AuthContext::new("https://o/", "bad\ntoken"));
        assert_matches!(
            policy.build_request("ws://host/"),
            Err(ClientError::InvalidHeader { name, .. }) if name == "authorization"
        );
    }

    #[test]
    fn rejects_invalid_extra_header_name() {
        let options = ConnectOptions::new("ws://host/").with_header("bad name", "v");
        let policy = HandshakePolicy::from_options(&options).unwrap();
        assert_matches!(
            policy.build_request(&options.endpoint),
            Err(ClientError::InvalidHeader { .. })
        );
    }
}
