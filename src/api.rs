// API client module: a small blocking HTTP client that talks to the
// avatar service. One method per remote endpoint, no retries; a non-2xx
// response is reported with its status and body text.

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::Config;
use crate::subject::Gender;

/// Fixed identity-provider endpoint for the password-grant token exchange.
const TOKEN_URL: &str =
    "https://auth.meshcapade.com/realms/meshcapade-me/protocol/openid-connect/token";
const CLIENT_ID: &str = "meshcapade-me";

/// Image mode sent with every fitting request.
const IMAGE_MODE_AFI: &str = "AFI";

/// Blocking API client holding the base URL of the avatar service and an
/// optional bearer token for authenticated calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Expected response from the token endpoint. Only the access token is
/// used; expiry fields are ignored since one token lives for one run.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

/// Fitting request payload. `height` and `weight` are serialized only when
/// present in the subject's metadata.
#[derive(Serialize, Debug)]
pub struct FitRequest {
    pub avatarname: String,
    pub gender: Gender,
    #[serde(rename = "imageMode")]
    pub image_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl FitRequest {
    pub fn new(avatarname: String, gender: Gender, height: Option<f64>, weight: Option<f64>) -> Self {
        FitRequest {
            avatarname,
            gender,
            image_mode: IMAGE_MODE_AFI,
            height,
            weight,
        }
    }
}

impl ApiClient {
    /// Create an ApiClient for the base URL in `config`. The token is set
    /// later, after `authenticate` succeeds.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: config.api_url.clone(),
            token: None,
        })
    }

    /// Store a bearer token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    /// Helper to build the Authorization header map when a token is set.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(t) = &self.token {
            let val = format!("Bearer {}", t);
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&val).unwrap());
        }
        headers
    }

    /// Exchange username/password for an access token via the OAuth2
    /// password grant. Returns the opaque bearer-token string.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        self.authenticate_at(TOKEN_URL, username, password)
    }

    /// Same as `authenticate` but against an explicit token endpoint.
    pub fn authenticate_at(&self, token_url: &str, username: &str, password: &str) -> Result<String> {
        debug!("POST {}", token_url);
        let params = [
            ("grant_type", "password"),
            ("client_id", CLIENT_ID),
            ("username", username),
            ("password", password),
        ];
        let res = self
            .client
            .post(token_url)
            .form(&params)
            .send()
            .context("Failed to send token request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Authentication failed: {} - {}", status, txt);
        }
        let resp: TokenResponse = res.json().context("Parsing token response json")?;
        Ok(resp.access_token)
    }

    /// Create an empty avatar resource and return its id.
    pub fn create_avatar(&self) -> Result<String> {
        let url = format!("{}/avatars/create/from-images", &self.base_url);
        debug!("POST {}", url);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .send()
            .context("Failed to send create-avatar request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Avatar creation failed: {} - {}", status, txt);
        }
        let body: serde_json::Value = res.json().context("Parsing create-avatar response json")?;
        let id = body["data"]["id"]
            .as_str()
            .context("Create-avatar response has no data.id")?;
        Ok(id.to_string())
    }

    /// Request a presigned upload slot for one image of the avatar and
    /// return the upload URL.
    pub fn request_upload_slot(&self, avatar_id: &str) -> Result<String> {
        let url = format!("{}/avatars/{}/images", &self.base_url, avatar_id);
        debug!("POST {}", url);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .send()
            .context("Failed to send upload-slot request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Upload-slot request failed: {} - {}", status, txt);
        }
        let body: serde_json::Value = res.json().context("Parsing upload-slot response json")?;
        let upload_url = body["data"]["links"]["upload"]
            .as_str()
            .context("Upload-slot response has no data.links.upload")?;
        Ok(upload_url.to_string())
    }

    /// Transfer one image's raw bytes to a presigned URL. The presigned
    /// URL carries its own authorization, so no bearer header is sent.
    pub fn upload_image(&self, upload_url: &str, image: &Path) -> Result<()> {
        let bytes = std::fs::read(image)
            .with_context(|| format!("Failed to read image file {}", image.display()))?;
        let content_type = guess_content_type(image);
        debug!("PUT {} ({})", upload_url, content_type);
        let res = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .context("Failed to send image upload")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Image upload failed: {} - {}", status, txt);
        }
        Ok(())
    }

    /// Submit the fitting request. The response body is not inspected
    /// beyond the status code.
    pub fn start_fitting(&self, avatar_id: &str, req: &FitRequest) -> Result<()> {
        let url = format!("{}/avatars/{}/fit-to-images", &self.base_url, avatar_id);
        debug!("POST {}", url);
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(req)
            .send()
            .context("Failed to send fitting request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Fitting request failed: {} - {}", status, txt);
        }
        Ok(())
    }

    /// Fetch the remote avatar document (state, metadata, measurements).
    pub fn fetch_avatar(&self, avatar_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/avatars/{}", &self.base_url, avatar_id);
        debug!("GET {}", url);
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .context("Failed to send avatar status request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Avatar status request failed: {} - {}", status, txt);
        }
        res.json().context("Parsing avatar status response json")
    }
}

/// Guess the upload content type from the file extension. Anything that is
/// not a png is sent as image/jpeg.
pub fn guess_content_type(image: &Path) -> &'static str {
    match image
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}
