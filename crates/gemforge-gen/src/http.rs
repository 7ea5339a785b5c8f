//! HTTP service client for OpenAI and CSM
//!
//! One `ureq::Agent` is built per client and reused for every request, so
//! connection pooling and the transport timeout are configured once.

use crate::client::{Endpoint, ServiceClient};
use crate::config::GemforgeConfig;
use gemforge_core::{GemforgeError, Result, ServiceError, ServiceErrorKind};
use serde_json::Value;
use std::io::Read;
use std::time::{Duration, Instant};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CSM_URL: &str = "https://api.csm.ai";

/// How a provider expects its API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    ApiKeyHeader,
}

/// Blocking JSON-over-HTTP client for one provider
pub struct HttpServiceClient {
    name: String,
    base_url: String,
    api_key: String,
    auth: AuthScheme,
    agent: ureq::Agent,
}

impl HttpServiceClient {
    pub fn new(
        name: &str,
        base_url: &str,
        api_key: &str,
        auth: AuthScheme,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            auth,
            agent: build_agent(timeout),
        }
    }

    /// Build the client for a named provider ("openai" or "csm") from config
    pub fn from_config(name: &str, config: &GemforgeConfig) -> Result<Self> {
        let (default_url, auth) = match name {
            "openai" => (DEFAULT_OPENAI_URL, AuthScheme::Bearer),
            "csm" => (DEFAULT_CSM_URL, AuthScheme::ApiKeyHeader),
            _ => {
                return Err(GemforgeError::ConfigError(format!(
                    "Unknown HTTP provider '{}'. Available: openai, csm",
                    name
                )))
            }
        };

        if !config.is_enabled(name) {
            return Err(GemforgeError::ConfigError(format!(
                "Provider '{}' is disabled in config",
                name
            )));
        }

        let api_key = config.api_key(name).unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!(
                provider = name,
                "no API key configured; set GEMFORGE_{}_API_KEY or add it to .gemforge/config.toml",
                name.to_uppercase()
            );
        }

        Ok(Self::new(
            name,
            config.api_url(name).unwrap_or(default_url),
            api_key,
            auth,
            Duration::from_secs(config.generation.timeout_secs),
        ))
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn url_for(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn read_response(
        &self,
        endpoint: &Endpoint,
        response: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> std::result::Result<Value, ServiceError> {
        let mut response = response.map_err(map_transport_error)?;
        let status = response.status().as_u16();

        let body = match response.body_mut().read_to_string() {
            Ok(body) => body,
            Err(e) if is_success(status) => return Err(map_transport_error(e)),
            // The status alone is enough to classify an error response
            Err(_) => String::new(),
        };
        interpret_response(&self.name, endpoint, status, &body)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Classify a complete provider response: non-2xx by status, 2xx must be JSON
fn interpret_response(
    provider: &str,
    endpoint: &Endpoint,
    status: u16,
    body: &str,
) -> std::result::Result<Value, ServiceError> {
    if !is_success(status) {
        return Err(ServiceError::from_status(status, body));
    }
    serde_json::from_str(body).map_err(|e| {
        ServiceError::malformed(format!(
            "{} returned a non-JSON body for {}: {}",
            provider, endpoint, e
        ))
    })
}

impl ServiceClient for HttpServiceClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, endpoint: &Endpoint, payload: &Value) -> std::result::Result<Value, ServiceError> {
        if !self.has_api_key() {
            return Err(ServiceError::new(
                ServiceErrorKind::Unauthorized,
                format!("no API key configured for {}", self.name),
            ));
        }

        let url = self.url_for(endpoint);
        let (header, value) = match self.auth {
            AuthScheme::Bearer => ("Authorization", format!("Bearer {}", self.api_key)),
            AuthScheme::ApiKeyHeader => ("x-api-key", self.api_key.clone()),
        };

        let start = Instant::now();
        let response = if endpoint.is_lookup() {
            self.agent.get(&url).header(header, &value).call()
        } else {
            self.agent
                .post(&url)
                .header(header, &value)
                .header("Content-Type", "application/json")
                .send_json(payload)
        };
        let result = self.read_response(endpoint, response);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(provider = %self.name, %endpoint, elapsed_ms, "provider call complete"),
            Err(e) => tracing::warn!(provider = %self.name, %endpoint, elapsed_ms, kind = %e.kind, "provider call failed"),
        }
        result
    }

    fn download(&self, locator: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        if !(locator.starts_with("https://") || locator.starts_with("http://")) {
            return Err(ServiceError::new(
                ServiceErrorKind::InvalidRequest,
                format!("cannot download '{}': not an http(s) URL", locator),
            ));
        }

        let start = Instant::now();
        let response = self.agent.get(locator).call().map_err(map_transport_error)?;
        let status = response.status().as_u16();
        if !is_success(status) {
            return Err(ServiceError::from_status(status, ""));
        }

        let mut reader = response.into_body().into_reader();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ServiceError::unavailable(format!("failed to read download body: {}", e)))?;

        tracing::info!(
            provider = %self.name,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "artifact downloaded"
        );
        Ok(bytes)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

fn map_transport_error(e: ureq::Error) -> ServiceError {
    match e {
        ureq::Error::StatusCode(code) => ServiceError::from_status(code, ""),
        ureq::Error::Timeout(t) => ServiceError::unavailable(format!("request timed out ({:?})", t)),
        ureq::Error::Io(io) => ServiceError::unavailable(format!("I/O error: {}", io)),
        ureq::Error::ConnectionFailed => ServiceError::unavailable("connection failed"),
        ureq::Error::HostNotFound => ServiceError::unavailable("host not found"),
        ureq::Error::BadUri(uri) => {
            ServiceError::new(ServiceErrorKind::InvalidRequest, format!("bad URI: {}", uri))
        }
        ureq::Error::Json(e) => ServiceError::malformed(format!("invalid JSON: {}", e)),
        other => ServiceError::unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(key: &str) -> HttpServiceClient {
        HttpServiceClient::new(
            "openai",
            "https://api.example.com/v1/",
            key,
            AuthScheme::Bearer,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_url_building_trims_trailing_slash() {
        let c = client("k");
        assert_eq!(
            c.url_for(&Endpoint::ChatCompletion),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_key_is_unauthorized_without_network() {
        let c = client("");
        let err = c.call(&Endpoint::ChatCompletion, &json!({})).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Unauthorized);
    }

    #[test]
    fn test_download_rejects_non_http_locator() {
        let c = client("k");
        let err = c.download("./mesh.glb").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::InvalidRequest);
    }

    #[test]
    fn test_transport_error_mapping() {
        assert_eq!(
            map_transport_error(ureq::Error::ConnectionFailed).kind,
            ServiceErrorKind::Unavailable
        );
        assert_eq!(
            map_transport_error(ureq::Error::HostNotFound).kind,
            ServiceErrorKind::Unavailable
        );
        assert_eq!(
            map_transport_error(ureq::Error::StatusCode(429)).kind,
            ServiceErrorKind::RateLimited
        );
        assert_eq!(
            map_transport_error(ureq::Error::StatusCode(401)).kind,
            ServiceErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_interpret_response_status_table() {
        let cases = [
            (401, "invalid key", ServiceErrorKind::Unauthorized),
            (403, "", ServiceErrorKind::Unauthorized),
            (429, "slow down", ServiceErrorKind::RateLimited),
            (400, "bad prompt", ServiceErrorKind::InvalidRequest),
            (404, "", ServiceErrorKind::InvalidRequest),
            (503, "maintenance", ServiceErrorKind::Unavailable),
        ];
        for (status, body, kind) in cases {
            let err = interpret_response("openai", &Endpoint::ChatCompletion, status, body).unwrap_err();
            assert_eq!(err.kind, kind, "status {}", status);
            assert!(err.message.contains(&status.to_string()));
        }

        let err = interpret_response("csm", &Endpoint::ImageToMesh, 200, "not json").unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::MalformedResponse);
        assert!(err.message.contains("image_to_mesh"));

        let ok = interpret_response("csm", &Endpoint::ImageToMesh, 201, r#"{"session_code":"abc"}"#);
        assert_eq!(ok.unwrap()["session_code"], "abc");
    }

    /// Answer a single request on a loopback port with a fixed response
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use std::io::{BufRead, BufReader, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_call_maps_live_responses() {
        let cases = [
            ("401 Unauthorized", r#"{"error":"bad key"}"#, ServiceErrorKind::Unauthorized),
            ("429 Too Many Requests", "", ServiceErrorKind::RateLimited),
            ("400 Bad Request", r#"{"error":"bad image"}"#, ServiceErrorKind::InvalidRequest),
            ("503 Service Unavailable", "", ServiceErrorKind::Unavailable),
            ("200 OK", "not json", ServiceErrorKind::MalformedResponse),
        ];
        for (status_line, body, kind) in cases {
            let base = serve_once(status_line, body);
            let c = HttpServiceClient::new("csm", &base, "k", AuthScheme::ApiKeyHeader, Duration::from_secs(5));
            let err = c
                .call(&Endpoint::MeshSession("abc".into()), &Value::Null)
                .unwrap_err();
            assert_eq!(err.kind, kind, "{}", status_line);
        }

        let base = serve_once("200 OK", r#"{"data":{"session_code":"abc"}}"#);
        let c = HttpServiceClient::new("csm", &base, "k", AuthScheme::ApiKeyHeader, Duration::from_secs(5));
        let body = c.call(&Endpoint::MeshSession("abc".into()), &Value::Null).unwrap();
        assert_eq!(body["data"]["session_code"], "abc");
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let config = GemforgeConfig::default();
        assert!(matches!(
            HttpServiceClient::from_config("meshy", &config),
            Err(GemforgeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_config_uses_url_override() {
        let mut config = GemforgeConfig::default();
        config.providers.insert(
            "csm".to_string(),
            crate::config::ProviderConfig {
                api_key: Some("csm-key".to_string()),
                api_url: Some("https://csm.internal/".to_string()),
                enabled: true,
            },
        );
        let c = HttpServiceClient::from_config("csm", &config).unwrap();
        assert!(c.has_api_key());
        assert_eq!(c.auth, AuthScheme::ApiKeyHeader);
        assert_eq!(
            c.url_for(&Endpoint::ImageToMesh),
            "https://csm.internal/image-to-3d-sessions"
        );
    }
}
