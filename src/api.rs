// API client module: builds the multipart upload request for a map and
// sends it to the hosting service with a small blocking HTTP client. The
// client is created once and reused for every sync cycle.

use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, Request};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, EncodingError, SyncError, SyncResult};
use crate::payload::Payload;

/// Public host of the map hosting service.
pub const DEFAULT_ENDPOINT: &str = "https://www.planetarium.digital";
/// Edit page that accepts map uploads, addressed by `?id=<resource id>`.
pub const EDIT_PATH: &str = "/games/edit/";
/// Name of the session cookie the service authenticates with.
pub const SESSION_COOKIE: &str = "spaceship";
/// File name the service expects for the map part.
pub const MAP_FILE_NAME: &str = "test.pmap";
const MAP_MIME: &str = "application/octet-stream";

/// Where to upload and under which session. Fixed for the process lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncTarget {
    resource_id: NonZeroU64,
    session_token: String,
}

impl SyncTarget {
    pub fn new(resource_id: u64, session_token: impl Into<String>) -> Result<Self, ConfigError> {
        let resource_id = NonZeroU64::new(resource_id).ok_or(ConfigError::MissingId)?;
        let session_token = session_token.into();
        if session_token.is_empty() {
            return Err(ConfigError::MissingSpace);
        }
        if !session_token.bytes().all(is_cookie_octet) {
            return Err(ConfigError::InvalidSpace);
        }
        Ok(Self {
            resource_id,
            session_token,
        })
    }

    pub fn resource_id(&self) -> u64 {
        self.resource_id.get()
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }
}

// RFC 6265 cookie-octet: visible ASCII minus DQUOTE, comma, semicolon and
// backslash.
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

// Keep the session token out of logs.
impl fmt::Debug for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTarget")
            .field("resource_id", &self.resource_id)
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Assembles the edit-page POST: three empty metadata fields followed by
/// the map bytes, with the session cookie attached.
#[derive(Debug, Clone)]
pub struct UploadRequestBuilder {
    endpoint: Url,
}

impl UploadRequestBuilder {
    /// `endpoint` is the scheme and host of the service, e.g. [`DEFAULT_ENDPOINT`].
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let invalid = |source: url::ParseError| ConfigError::InvalidEndpoint {
            url: endpoint.to_string(),
            source,
        };
        let endpoint = Url::parse(endpoint).map_err(invalid)?;
        if endpoint.cannot_be_a_base() {
            return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn upload_url(&self, target: &SyncTarget) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(EDIT_PATH);
        url.set_query(Some(&format!("id={}", target.resource_id())));
        url
    }

    /// The `Cookie` header value for `url`, or `None` when the URL is not
    /// https (the session cookie is marked `Secure`).
    pub fn session_cookie(&self, target: &SyncTarget, url: &Url) -> Option<HeaderValue> {
        let jar = Jar::default();
        jar.add_cookie_str(
            &format!(
                "{SESSION_COOKIE}={}; Path=/; Secure",
                target.session_token()
            ),
            url,
        );
        jar.cookies(url)
    }

    pub fn build(
        &self,
        client: &Client,
        target: &SyncTarget,
        payload: Payload,
    ) -> Result<Request, SyncError> {
        let url = self.upload_url(target);

        let map = multipart::Part::bytes(payload.into_bytes())
            .file_name(MAP_FILE_NAME)
            .mime_str(MAP_MIME)
            .map_err(|e| SyncError::from(EncodingError::Form(e)))?;
        let form = multipart::Form::new()
            .text("nam", "")
            .text("desc", "")
            .text("thum", "")
            .part("map", map);
        debug!(boundary = form.boundary(), "Built upload form");

        let mut request = client.post(url.clone()).multipart(form);
        if let Some(cookie) = require_cookie(&url, self.session_cookie(target, &url))? {
            request = request.header(COOKIE, cookie);
        }

        request
            .build()
            .map_err(|e| SyncError::from(EncodingError::Form(e)))
    }
}

/// The session cookie is mandatory over https; only plain http may go
/// without it.
fn require_cookie(
    url: &Url,
    cookie: Option<HeaderValue>,
) -> Result<Option<HeaderValue>, EncodingError> {
    match cookie {
        Some(cookie) => Ok(Some(cookie)),
        None if url.scheme() == "https" => Err(EncodingError::SessionCookie {
            url: url.to_string(),
        }),
        None => {
            warn!(%url, "Session cookie not attached to non-https endpoint");
            Ok(None)
        }
    }
}

/// Sends one map upload per cycle.
pub trait Uploader {
    fn upload(&self, target: &SyncTarget, payload: Payload) -> SyncResult;
}

/// Blocking HTTP client for the edit endpoint.
pub struct UploadClient {
    http: Client,
    builder: UploadRequestBuilder,
}

impl UploadClient {
    /// Uploads have no timeout; a stalled transfer blocks until the
    /// transport gives up.
    pub fn new(builder: UploadRequestBuilder) -> Result<Self> {
        let http = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!("upmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, builder })
    }

    /// Executes `request`. Only `200 OK` counts as success.
    pub fn send(&self, request: Request) -> SyncResult {
        let url = request.url().clone();
        let response = self.http.execute(request).map_err(SyncError::Network)?;
        let status = response.status();
        // Release the connection before reporting.
        drop(response);

        info!(%url, status = status.as_u16(), "Upload finished");
        classify_status(status)
    }
}

impl Uploader for UploadClient {
    fn upload(&self, target: &SyncTarget, payload: Payload) -> SyncResult {
        let request = self.builder.build(&self.http, target, payload)?;
        self.send(request)
    }
}

pub fn classify_status(status: StatusCode) -> SyncResult {
    if status == StatusCode::OK {
        return Ok(());
    }
    Err(SyncError::Remote {
        code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}
