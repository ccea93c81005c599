//! SchoolHub record store client utilities.
//!
//! This module provides a lightweight client for the remote record store that
//! backs the SchoolHub front end. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Discovering the bearer token from `SCHOOLHUB_API_TOKEN`
//! - Validating the base URL (from `SCHOOLHUB_API_BASE` or configuration)
//! - Building requests with a consistent User-Agent and Accept headers
//!
//! The primary entry point is [`RecordStoreClient`]. Create an instance via
//! [`RecordStoreClient::from_env`] and then post multipart forms with
//! [`RecordStoreClient::post_multipart`].
//!
//! # Example
//!
//! ```ignore
//! use schoolhub_api::RecordStoreClient;
//! use reqwest::multipart::Form;
//!
//! async fn run() -> anyhow::Result<()> {
//!     let client = RecordStoreClient::from_env("http://localhost:5000/api")?;
//!     let form = Form::new().text("firstName", "Asha");
//!     let response = client.post_multipart("/Newregistration/register", form).await?;
//!     println!("status: {}", response.status);
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use tracing::debug;
use url::Url;

/// Environment variable overriding the configured base URL.
pub const API_BASE_ENV: &str = "SCHOOLHUB_API_BASE";
/// Environment variable carrying the bearer token.
pub const API_TOKEN_ENV: &str = "SCHOOLHUB_API_TOKEN";

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Status and body of a completed record store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Thin wrapper around a configured `reqwest::Client` for record store access.
#[derive(Debug, Clone)]
pub struct RecordStoreClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl RecordStoreClient {
    /// Construct a client from the environment, falling back to
    /// `configured_base` when `SCHOOLHUB_API_BASE` is unset.
    pub fn from_env(configured_base: &str) -> Result<Self> {
        let base_url = env::var(API_BASE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| configured_base.to_string());
        let token = env::var(API_TOKEN_ENV).ok().filter(|value| !value.trim().is_empty());
        Self::new(&base_url, token.as_deref())
    }

    /// Construct a client for an explicit base URL and optional bearer token.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        let mut default_headers = header::HeaderMap::new();
        if let Some(token) = token {
            let mut authorization = header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .context("bearer token contains characters not allowed in a header")?;
            authorization.set_sensitive(true);
            default_headers.insert(header::AUTHORIZATION, authorization);
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("schoolhub/0.1; {}", env::consts::OS),
        })
    }

    /// Build a request for a method and store-relative path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        debug!(%url, "building request");

        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// POST a multipart form and collect the status and body text.
    ///
    /// Transport failures (DNS, refused connection, timeout) are errors; any
    /// HTTP status, including non-success ones, is returned to the caller.
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<RawResponse> {
        let response = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await
            .map_err(|error| anyhow!("Network error: {}", error))?;

        let status = response.status();
        let body = response.text().await.context("read response body")?;
        debug!(status = status.as_u16(), bytes = body.len(), "multipart response received");
        Ok(RawResponse { status, body })
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any http(s) scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid record store URL '{}': {}", base, e))?;

    if !matches!(parsed_base_url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "record store URL must use http or https; got '{}://'",
            parsed_base_url.scheme()
        ));
    }

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("record store URL must include a host"))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "record store URL must use https for non-localhost hosts; got '{}://{}'",
            parsed_base_url.scheme(),
            host_name
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_may_use_plain_http() {
        assert!(validate_base_url("http://localhost:5000/api").is_ok());
        assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn remote_hosts_require_https() {
        assert!(validate_base_url("https://records.example.org/api").is_ok());
        let error = validate_base_url("http://records.example.org/api").expect_err("plain http rejected");
        assert!(error.to_string().contains("https"));
        assert!(validate_base_url("ftp://localhost/api").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://localhost:5000/api", "/register"), "http://localhost:5000/api/register");
        assert_eq!(join_url("http://localhost:5000/api", "register"), "http://localhost:5000/api/register");
        assert_eq!(join_url("http://localhost:5000/api", ""), "http://localhost:5000/api");
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = RecordStoreClient::new("http://localhost:5000/api/", Some("token-value")).expect("client");
        assert_eq!(client.base_url, "http://localhost:5000/api");
    }

    #[test]
    fn environment_base_overrides_configuration() {
        temp_env::with_vars(
            [(API_BASE_ENV, Some("https://records.example.org/v2")), (API_TOKEN_ENV, None)],
            || {
                let client = RecordStoreClient::from_env("http://localhost:5000/api").expect("client");
                assert_eq!(client.base_url, "https://records.example.org/v2");
            },
        );
    }
}
