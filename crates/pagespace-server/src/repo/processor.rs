//! HTTP client for the external file processor (C12 step 6).

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use pagespace_core::DriveId;
use pagespace_upload::{ProcessedFile, ProcessorClient, UploadPayload};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// How long a minted `files:write` service token remains valid.
const SERVICE_TOKEN_TTL_SECS: u64 = 300;

/// Mint a short-lived `files:write` service token for one processor call.
///
/// The token is `"files:write:<expiryUnixSecs>"` followed by a BLAKE3
/// keyed hash of that payload, keyed off `secret` — the processor
/// verifies the signature and checks `expiryUnixSecs` against its own
/// clock, the same shape the CSRF guard uses for its own HMAC token.
#[must_use]
pub fn mint_service_token(secret: &SecretString) -> SecretString {
    let expiry = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() + SERVICE_TOKEN_TTL_SECS;
    let payload = format!("files:write:{expiry}");
    let key = blake3::derive_key("pagespace processor service token v1", secret.expose_secret().as_bytes());
    let digest = blake3::keyed_hash(&key, payload.as_bytes());
    SecretString::new(format!("{payload}.{}", digest.to_hex()).into())
}

/// Calls the processor's `POST /process` endpoint with a short-lived
/// `files:write` service token.
pub struct HttpProcessorClient {
    client: reqwest::Client,
    base_url: String,
    service_token_issuer: Box<dyn Fn(DriveId) -> SecretString + Send + Sync>,
}

impl HttpProcessorClient {
    /// Construct a client against `base_url`, minting a fresh
    /// `files:write` service token per call via `service_token_issuer`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String, service_token_issuer: impl Fn(DriveId) -> SecretString + Send + Sync + 'static) -> Self {
        Self { client, base_url, service_token_issuer: Box::new(service_token_issuer) }
    }
}

#[derive(Deserialize)]
struct ProcessResponse {
    #[serde(rename = "contentHash")]
    content_hash: String,
    deduplicated: bool,
    size: u64,
    #[serde(default)]
    jobs: Vec<String>,
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    async fn process(&self, drive_id: DriveId, payload: UploadPayload) -> Result<ProcessedFile, String> {
        let token = (self.service_token_issuer)(drive_id);
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(payload.bytes)
                .file_name(payload.filename)
                .mime_str(&payload.media_type)
                .map_err(|e| e.to_string())?,
        );

        let response = self
            .client
            .post(format!("{}/process", self.base_url))
            .bearer_auth(token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("processor responded with {}", response.status()));
        }

        let parsed: ProcessResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(ProcessedFile { content_hash: parsed.content_hash, deduplicated: parsed.deduplicated, size: parsed.size, jobs: parsed.jobs })
    }
}
