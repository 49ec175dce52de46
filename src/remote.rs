use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use url::Url;

use crate::reel::{GenerationRequest, GenerationResponse, ReelItem};

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

/// Envelope used by the listing endpoint: `{success, data}` or
/// `{success: false, error}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self, what: &str) -> Result<T> {
        if !self.success {
            bail!(
                "{what} failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }
        self.data
            .with_context(|| format!("{what} response missing data"))
    }
}

/// Client for the reel listing and generation endpoints.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("reel client user agent required");
        }
        let mut base_url = Url::parse(config.base_url.trim())
            .with_context(|| format!("parse reel service url {:?}", config.base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("build reel http client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn list_reels(&self, athlete_id: Option<&str>) -> Result<Vec<ReelItem>> {
        let url = reels_url(&self.base_url, athlete_id)?;
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("request reel listing")?;

        if !response.status().is_success() {
            bail!("reel listing failed with status {}", response.status());
        }

        let envelope: Envelope<Vec<ReelItem>> =
            response.json().context("decode reel listing")?;
        envelope.into_result("reel listing")
    }

    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = self
            .base_url
            .join("api/generate")
            .context("build generation url")?;
        let response = self
            .http
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .json(request)
            .send()
            .context("request reel generation")?;

        // Failures still carry a JSON body with an `error` field.
        let status = response.status();
        let body: GenerationResponse = response
            .json()
            .with_context(|| format!("decode generation response (status {status})"))?;
        if !body.success {
            bail!(
                "reel generation failed: {}",
                body.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(body)
    }
}

fn reels_url(base: &Url, athlete_id: Option<&str>) -> Result<Url> {
    let mut url = base.join("api/reels").context("build listing url")?;
    if let Some(id) = athlete_id.map(str::trim).filter(|id| !id.is_empty()) {
        url.query_pairs_mut().append_pair("athleteId", id);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_carries_athlete_filter() {
        let base = Url::parse("http://localhost:3000/").unwrap();
        assert_eq!(
            reels_url(&base, None).unwrap().as_str(),
            "http://localhost:3000/api/reels"
        );
        assert_eq!(
            reels_url(&base, Some("serena williams")).unwrap().as_str(),
            "http://localhost:3000/api/reels?athleteId=serena+williams"
        );
        assert_eq!(
            reels_url(&base, Some("  ")).unwrap().as_str(),
            "http://localhost:3000/api/reels"
        );
    }

    #[test]
    fn envelope_failure_surfaces_error_text() {
        let envelope: Envelope<Vec<ReelItem>> =
            serde_json::from_str(r#"{"success": false, "error": "Failed to fetch reels"}"#)
                .unwrap();
        let err = envelope.into_result("reel listing").unwrap_err();
        assert!(err.to_string().contains("Failed to fetch reels"));
    }

    #[test]
    fn envelope_success_yields_data() {
        let envelope: Envelope<Vec<ReelItem>> =
            serde_json::from_str(r#"{"success": true, "data": []}"#).unwrap();
        assert!(envelope.into_result("reel listing").unwrap().is_empty());
    }

    #[test]
    fn rejects_blank_user_agent() {
        let err = Client::new(ClientConfig {
            base_url: "http://localhost:3000".into(),
            user_agent: " ".into(),
            http_client: None,
        });
        assert!(err.is_err());
    }
}
