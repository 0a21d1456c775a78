use std::fmt::{self, Display};

use reqwest::header::HeaderMap;
use serde::{de::DeserializeOwned, Deserialize};

use crate::TwitchProbeError;

pub(crate) const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Rate limit counters Twitch attaches to every helix response. Read and
/// reported, never acted on; a 429 is an ordinary failed call here.
#[derive(Clone, Copy, Debug, Default)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}

impl RateLimit {
    fn from_headers(headers: &HeaderMap) -> Self {
        fn read(headers: &HeaderMap, name: &str) -> Option<u64> {
            headers.get(name)?.to_str().ok()?.parse().ok()
        }

        Self {
            limit: read(headers, "Ratelimit-Limit"),
            remaining: read(headers, "Ratelimit-Remaining"),
            reset: read(headers, "Ratelimit-Reset"),
        }
    }
}

impl Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(value: Option<u64>) -> String {
            value.map_or_else(|| "?".to_string(), |v| v.to_string())
        }

        write!(
            f,
            "limit {}, remaining {}, resets at {}",
            show(self.limit),
            show(self.remaining),
            show(self.reset)
        )
    }
}

#[derive(Debug, Deserialize)]
struct HelixPage<T> {
    data: Vec<T>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Stream {
    pub title: String,
    pub game_name: String,
    pub viewer_count: u64,
    pub started_at: String,
}

/// Agent for authenticated GETs against the helix API.
pub struct HelixAgent {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    token: String,
}

impl HelixAgent {
    pub fn new(client_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(HELIX_BASE_URL, client_id, token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id: client_id.into(),
            token: token.into(),
        }
    }

    /// Look up a user by login name. An unknown login is an empty page, not
    /// an error.
    pub async fn get_user(
        &self,
        login: &str,
    ) -> Result<(Option<User>, RateLimit), TwitchProbeError> {
        let (page, rate): (HelixPage<User>, _) =
            self.get("/users", &[("login", login)]).await?;
        Ok((page.data.into_iter().next(), rate))
    }

    /// Total follower count for a broadcaster. Only the total is wanted, so
    /// ask for a single-entry page.
    pub async fn get_follower_count(
        &self,
        broadcaster_id: &str,
    ) -> Result<(u64, RateLimit), TwitchProbeError> {
        let (page, rate): (HelixPage<serde_json::Value>, _) = self
            .get(
                "/channels/followers",
                &[("broadcaster_id", broadcaster_id), ("first", "1")],
            )
            .await?;
        Ok((page.total.unwrap_or(0), rate))
    }

    /// The user's live stream, if they're live. Offline users come back as an
    /// empty page.
    pub async fn get_stream(
        &self,
        user_id: &str,
    ) -> Result<(Option<Stream>, RateLimit), TwitchProbeError> {
        let (page, rate): (HelixPage<Stream>, _) =
            self.get("/streams", &[("user_id", user_id)]).await?;
        Ok((page.data.into_iter().next(), rate))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(T, RateLimit), TwitchProbeError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .bearer_auth(&self.token)
            .header("Client-Id", &self.client_id)
            .send()
            .await?;

        let rate = RateLimit::from_headers(response.headers());
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TwitchProbeError::HelixError {
                status: status.as_u16(),
                body,
            });
        }

        Ok((serde_json::from_str(&body)?, rate))
    }
}
