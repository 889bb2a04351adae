//! Release metadata and artifact downloads over HTTP.

use super::UpdateError;
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Default "latest release" endpoint.
pub const DEFAULT_RELEASES_URL: &str =
    "https://api.github.com/repos/balki97/MicMaster/releases/latest";

/// The newest published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Version with any leading `v` removed
    pub version: String,
    /// First asset's download URL, if the release has assets
    pub download_url: Option<String>,
}

/// An open download stream.
pub struct Download {
    /// Content length, when the server sent one
    pub length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

/// Where releases are published.
pub trait ReleaseFeed {
    fn latest(&self) -> Result<ReleaseInfo, UpdateError>;

    fn open(&self, url: &str) -> Result<Download, UpdateError>;
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    browser_download_url: Option<String>,
}

impl ReleasePayload {
    fn into_info(self) -> Result<ReleaseInfo, UpdateError> {
        let tag = self
            .tag_name
            .ok_or_else(|| UpdateError::MalformedResponse("missing tag_name".to_string()))?;
        let version = tag.trim().trim_start_matches('v').to_string();
        if version.is_empty() {
            return Err(UpdateError::MalformedResponse(format!("empty tag '{tag}'")));
        }

        Ok(ReleaseInfo {
            version,
            download_url: self
                .assets
                .into_iter()
                .next()
                .and_then(|asset| asset.browser_download_url),
        })
    }
}

/// GitHub releases API client.
pub struct GithubReleases {
    url: String,
    agent: ureq::Agent,
}

impl GithubReleases {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::builder()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .user_agent(concat!("MicMaster/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl ReleaseFeed for GithubReleases {
    fn latest(&self) -> Result<ReleaseInfo, UpdateError> {
        debug!(url = %self.url, "Checking for updates");
        let response = self
            .agent
            .get(&self.url)
            .set("Accept", "application/vnd.github+json")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(404, _) => UpdateError::NoReleases,
                ureq::Error::Status(code, _) => UpdateError::Network(format!("HTTP {code}")),
                ureq::Error::Transport(t) => UpdateError::Network(t.to_string()),
            })?;

        let payload: ReleasePayload = response
            .into_json()
            .map_err(|e| UpdateError::MalformedResponse(e.to_string()))?;
        payload.into_info()
    }

    fn open(&self, url: &str) -> Result<Download, UpdateError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| UpdateError::Download(e.to_string()))?;

        let length = response
            .header("Content-Length")
            .and_then(|v| v.parse::<u64>().ok());
        Ok(Download {
            length,
            reader: Box::new(response.into_reader()),
        })
    }
}
