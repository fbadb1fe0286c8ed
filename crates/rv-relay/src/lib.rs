//! Remote-fetch relay: fetches a page server-side so the host can load
//! markup from origins that do not allow cross-origin reads.

mod upstream;

use rv_core::PreviewError;
use rv_core::PreviewResult;
use serde::Serialize;
use std::io::Cursor;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;
use tracing::error;
use tracing::info;
use tracing::warn;
use url::Url;

pub use upstream::HttpUpstream;
pub use upstream::Upstream;
pub use upstream::UpstreamResponse;

pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:8787";
pub const PROXY_PATH: &str = "/api/proxy";

/// A response ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl RelayResponse {
    fn json(status: u16, payload: &impl Serialize) -> Self {
        let body = serde_json::to_string(payload)
            .unwrap_or_else(|_| String::from("{\"error\":\"json encode failed\"}"));
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_owned())],
            body,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorPayload {
                error: message.into(),
            },
        )
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
}

#[derive(Debug, Serialize)]
struct ProxyPayload {
    contents: String,
    status: ProxyStatus,
}

#[derive(Debug, Serialize)]
struct ProxyStatus {
    url: String,
    content_type: Option<String>,
    http_code: u16,
}

/// Request handling, independent of the HTTP server.
#[derive(Debug, Clone)]
pub struct RelayService<U> {
    upstream: U,
}

impl<U: Upstream> RelayService<U> {
    pub fn new(upstream: U) -> Self {
        Self { upstream }
    }

    /// Handles `method request_target`, where the target is the path plus query.
    pub fn handle(&self, method: &str, request_target: &str) -> RelayResponse {
        let (path, query) = request_target
            .split_once('?')
            .unwrap_or((request_target, ""));
        if path != PROXY_PATH {
            return RelayResponse::error(404, "Not found");
        }
        if !method.eq_ignore_ascii_case("GET") {
            return RelayResponse::error(405, "Method not allowed");
        }

        let target = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
        let Some(target) = target else {
            return RelayResponse::error(400, "URL parameter is required");
        };

        let parsed = match Url::parse(&target) {
            Ok(parsed) => parsed,
            Err(_) => return RelayResponse::error(400, "Invalid URL"),
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return RelayResponse::error(400, "Invalid protocol");
        }

        let fetched = match self.upstream.fetch(&parsed) {
            Ok(fetched) => fetched,
            Err(failure) => {
                error!(url = %target, %failure, "relay upstream failed");
                return RelayResponse::error(500, failure.message);
            }
        };

        if !(200..300).contains(&fetched.status) {
            warn!(url = %target, status = fetched.status, "relay upstream returned an error status");
            return RelayResponse::error(
                fetched.status,
                format!("Failed to fetch: {}", fetched.reason),
            );
        }

        let mut response = RelayResponse::json(
            200,
            &ProxyPayload {
                contents: fetched.body,
                status: ProxyStatus {
                    url: target,
                    content_type: fetched.content_type,
                    http_code: fetched.status,
                },
            },
        );
        response
            .headers
            .push(("Access-Control-Allow-Origin", "*".to_owned()));
        response
            .headers
            .push(("Access-Control-Allow-Methods", "GET".to_owned()));
        response
    }
}

/// Serves the relay on `addr` until the listener fails.
pub fn serve<U: Upstream>(addr: &str, service: &RelayService<U>) -> PreviewResult<()> {
    let server = Server::http(addr).map_err(|failure| {
        PreviewError::new(
            "relay.bind_failed",
            format!("relay bind failed on {addr}: {failure}"),
        )
    })?;
    info!(%addr, "relay listening");

    for request in server.incoming_requests() {
        let method = request.method().to_string();
        let response = service.handle(&method, request.url());
        let status = response.status;
        if let Err(failure) = request.respond(to_wire(response)) {
            warn!(%failure, status, "relay failed to write response");
        }
    }
    Ok(())
}

fn to_wire(response: RelayResponse) -> Response<Cursor<Vec<u8>>> {
    let mut wire = Response::from_string(response.body).with_status_code(StatusCode(response.status));
    for (name, value) in &response.headers {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            wire.add_header(header);
        }
    }
    wire
}

#[cfg(test)]
mod tests {
    use super::RelayService;
    use super::Upstream;
    use super::UpstreamResponse;
    use rv_core::PreviewError;
    use rv_core::PreviewResult;
    use serde_json::Value;
    use std::cell::RefCell;
    use url::Url;

    struct CannedUpstream {
        reply: PreviewResult<UpstreamResponse>,
        seen: RefCell<Vec<String>>,
    }

    impl CannedUpstream {
        fn ok(status: u16, reason: &str, body: &str) -> Self {
            Self {
                reply: Ok(UpstreamResponse {
                    status,
                    reason: reason.to_owned(),
                    content_type: Some("text/html; charset=utf-8".to_owned()),
                    body: body.to_owned(),
                }),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Upstream for CannedUpstream {
        fn fetch(&self, url: &Url) -> PreviewResult<UpstreamResponse> {
            self.seen.borrow_mut().push(url.to_string());
            self.reply.clone()
        }
    }

    fn json(body: &str) -> Value {
        serde_json::from_str(body).unwrap_or(Value::Null)
    }

    #[test]
    fn relays_successful_fetches() {
        let service = RelayService::new(CannedUpstream::ok(200, "OK", "<p>remote</p>"));
        let response = service.handle("GET", "/api/proxy?url=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1");
        assert_eq!(response.status, 200);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        let body = json(&response.body);
        assert_eq!(body["contents"], "<p>remote</p>");
        assert_eq!(body["status"]["url"], "https://example.com/a?b=1");
        assert_eq!(body["status"]["content_type"], "text/html; charset=utf-8");
        assert_eq!(body["status"]["http_code"], 200);
        assert_eq!(
            service.upstream.seen.borrow().as_slice(),
            ["https://example.com/a?b=1".to_owned()]
        );
    }

    #[test]
    fn rejects_bad_requests_before_fetching() {
        let service = RelayService::new(CannedUpstream::ok(200, "OK", ""));
        let cases = [
            ("POST", "/api/proxy?url=https%3A%2F%2Fexample.com", 405, "Method not allowed"),
            ("GET", "/api/proxy", 400, "URL parameter is required"),
            ("GET", "/api/proxy?url=", 400, "URL parameter is required"),
            ("GET", "/api/proxy?url=not%20a%20url", 400, "Invalid URL"),
            ("GET", "/api/proxy?url=file%3A%2F%2F%2Fetc%2Fpasswd", 400, "Invalid protocol"),
            ("GET", "/elsewhere?url=https%3A%2F%2Fexample.com", 404, "Not found"),
        ];
        for (method, target, status, message) in cases {
            let response = service.handle(method, target);
            assert_eq!(response.status, status, "{method} {target}");
            assert_eq!(json(&response.body)["error"], message);
            assert_eq!(response.header("Access-Control-Allow-Origin"), None);
        }
        assert!(service.upstream.seen.borrow().is_empty());
    }

    #[test]
    fn upstream_error_statuses_pass_through() {
        let service = RelayService::new(CannedUpstream::ok(404, "Not Found", "missing"));
        let response = service.handle("GET", "/api/proxy?url=http%3A%2F%2Fexample.com%2Fgone");
        assert_eq!(response.status, 404);
        assert_eq!(json(&response.body)["error"], "Failed to fetch: Not Found");
    }

    #[test]
    fn upstream_failures_become_server_errors() {
        let service = RelayService::new(CannedUpstream {
            reply: Err(PreviewError::new("relay.upstream", "connection refused")),
            seen: RefCell::new(Vec::new()),
        });
        let response = service.handle("GET", "/api/proxy?url=https%3A%2F%2Fexample.com");
        assert_eq!(response.status, 500);
        assert_eq!(json(&response.body)["error"], "connection refused");
        assert_eq!(response.header("content-type"), Some("application/json"));
    }
}
