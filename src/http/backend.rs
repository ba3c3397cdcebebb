use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// File sent as the `file` field of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    File(UploadFile),
}

/// A logical API call, replayable as many times as the auth flow needs
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn file(mut self, file: UploadFile) -> Self {
        self.body = Body::File(file);
        self
    }

    /// Flatten a serializable value into query pairs; nulls are skipped
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self, ClientError> {
        match serde_json::to_value(query)? {
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::Null => {}
                        Value::String(s) => self.query.push((key, s)),
                        Value::Array(items) => {
                            for item in items {
                                self.query.push((key.clone(), scalar_to_string(item)));
                            }
                        }
                        other => self.query.push((key, scalar_to_string(other))),
                    }
                }
            }
            Value::Null => {}
            other => {
                return Err(ClientError::Decode(<serde_json::Error as serde::ser::Error>::custom(format!(
                    "query parameters must serialize to an object, got {}",
                    other
                ))))
            }
        }
        Ok(self)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Raw HTTP response before envelope handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Wire transport. Implementations send exactly one HTTP exchange per call.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, ClientError>;
}

/// reqwest-backed transport rooted at the configured base URL
pub struct ReqwestBackend {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        // Validate early so a bad base URL fails at startup, not on first request
        Url::parse(&config.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, ClientError> {
        let url = self.url_for(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::File(file) => {
                let mut part = reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
                if let Some(mime) = &file.mime {
                    part = part.mime_str(mime)?;
                }
                builder.multipart(reqwest::multipart::Form::new().part("file", part))
            }
        };

        tracing::debug!("{} {}", request.method.as_str(), request.path);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }
}
