//! reqwest transport.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use tracing::{debug, info, instrument, warn};

use super::{RawResponse, TransportError, VerificationBackend, VerificationRequest};
use crate::error::{AttendError, Result};

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Build a client for `base_url` with a whole-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| AttendError::ConfigInvalid(format!("base_url '{base_url}': {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("attend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AttendError::Other(format!("HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, TransportError> {
        let joined = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&joined).map_err(|e| TransportError::new(format!("bad endpoint {joined}: {e}")))
    }

    fn form(request: &VerificationRequest) -> std::result::Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, value) in &request.fields {
            form = form.text(*name, value.clone());
        }
        for image in &request.files {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str("image/jpeg")
                .map_err(TransportError::from)?;
            form = form.part(image.field, part);
        }
        Ok(form)
    }

    async fn read(response: reqwest::Response) -> std::result::Result<RawResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(TransportError::from)?;
        Ok(RawResponse { status, body })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            message: e.to_string(),
            timed_out: e.is_timeout(),
        }
    }
}

impl VerificationBackend for HttpBackend {
    #[instrument(skip(self, request), fields(mode = request.mode, path = request.path))]
    async fn send(&self, request: &VerificationRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut url = self.endpoint(request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        debug!(
            %url,
            fields = request.fields.len(),
            files = request.files.len(),
            authenticated = request.bearer.is_some(),
            "Sending verification request"
        );

        let mut builder = self.client.post(url).multipart(Self::form(request)?);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Verification request failed");
            TransportError::from(e)
        })?;
        let raw = Self::read(response).await?;
        info!(status = raw.status, "Verification response");
        Ok(raw)
    }

    #[instrument(skip(self, password))]
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = self.endpoint("/api/login")?;
        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        Self::read(response).await
    }
}
