use std::sync::RwLock;

use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub const SESSION_COOKIE: &str = "session_id";
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

const SECRET_FIELDS: [&str; 1] = ["password"];

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Authentication required")]
    Auth,
    #[error("Request failed with status {status}")]
    Http { status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Auth => Some(StatusCode::UNAUTHORIZED.as_u16()),
            TransportError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Copy of `body` that is safe to write to the log.
fn redacted(body: &Value) -> Value {
    match body {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| {
                    if SECRET_FIELDS.contains(&key.as_str()) {
                        (key.clone(), Value::String("***".to_string()))
                    } else {
                        (key.clone(), redacted(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

/// Single-attempt JSON transport. Holds the session cookie the server hands
/// out on sign-in and attaches it to session-bearing requests.
pub struct Transport {
    base_url: String,
    xsrf_token: String,
    client: reqwest::Client,
    session_token: RwLock<Option<String>>,
}

impl Transport {
    pub fn new(base_url: impl Into<String>, xsrf_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            xsrf_token: xsrf_token.into(),
            client: reqwest::Client::new(),
            session_token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_token(&self) -> Option<String> {
        match self.session_token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_session_token(&self, token: Option<String>) {
        match self.session_token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Sends one request. `Ok(None)` means the server answered 204.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
        requires_session: bool,
    ) -> Result<Option<Value>, TransportError> {
        let url = self.url(path);

        let mut builder = self.client
            .request(method.as_reqwest(), &url)
            .header(XSRF_HEADER, &self.xsrf_token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);

        if requires_session
            && let Some(token) = self.session_token()
        {
            builder = builder.header(COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }

        if let Some(body) = body {
            tracing::debug!("{:?} {} with payload: {}", method, url, redacted(&body));
            let bytes = serde_json::to_vec(&body)
                .map_err(|e| TransportError::Parse(e.to_string()))?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Request failed: {:?} {}: {}", method, url, e);
            TransportError::Network(e)
        })?;

        let status = response.status();
        tracing::info!("{:?} {} response status: {}", method, path, status);

        self.capture_session_cookie(&response);

        if status == StatusCode::UNAUTHORIZED {
            tracing::error!("Authentication failed for {:?} {}", method, path);
            return Err(TransportError::Auth);
        }

        if !status.is_success() {
            tracing::error!("Request failed: {:?} {} status {}", method, path, status);
            return Err(TransportError::Http { status: status.as_u16() });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Parse(format!("{} {}: {}", status, path, e)))?;

        Ok(Some(value))
    }

    fn capture_session_cookie(&self, response: &reqwest::Response) {
        if let Some(cookie) = response.cookies().find(|c| c.name() == SESSION_COOKIE) {
            let value = cookie.value();
            if value.is_empty() {
                self.set_session_token(None);
            } else {
                tracing::debug!("Received new session cookie");
                self.set_session_token(Some(value.to_string()));
            }
        }
    }
}
