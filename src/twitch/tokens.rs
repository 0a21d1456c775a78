use serde::{Deserialize, Serialize};

use crate::{config::Credentials, TwitchProbeError};

pub(crate) const ID_BASE_URL: &str = "https://id.twitch.tv/oauth2";

/// Access/refresh token pair as handed back by the token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenPair {
    pub access_token: String,

    /// Empty on app tokens; the client credentials grant doesn't come with
    /// one.
    #[serde(default)]
    pub refresh_token: String,

    /// Seconds until Twitch expires the access token. We report it but never
    /// track it.
    pub expires_in: u64,

    #[serde(default)]
    pub scope: Vec<String>,
}

/// What the validation endpoint knows about a live token. `login` and
/// `user_id` are absent when validating an app token.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenMetadata {
    pub login: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expires_in: u64,
}

/// Client for the Twitch identity host. The base URL is swappable so tests
/// can point it at a local server.
pub struct AuthAgent {
    client: reqwest::Client,
    base_url: String,
}

impl AuthAgent {
    pub fn new() -> Self {
        Self::with_base_url(ID_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Exchanges a one-time authorization code for a token pair. The code is
    /// burned whether or not this succeeds; there is no retry.
    pub async fn exchange_code(
        &self,
        creds: &Credentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenPair, TwitchProbeError> {
        #[derive(Serialize)]
        struct ExchangeBody<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            code: &'a str,
            grant_type: &'a str,
            redirect_uri: &'a str,
        }

        let body = ExchangeBody {
            client_id: &creds.client_id,
            client_secret: &creds.client_secret,
            code,
            grant_type: "authorization_code",
            redirect_uri,
        };
        self.request_token(&body).await
    }

    /// Trades the stored refresh token for a fresh pair. Fails before any
    /// network call if no refresh token is configured.
    pub async fn refresh(&self, creds: &Credentials) -> Result<TokenPair, TwitchProbeError> {
        let refresh_token = creds.require_refresh_token()?;

        #[derive(Serialize)]
        struct RefreshBody<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            grant_type: &'a str,
            refresh_token: &'a str,
        }

        let body = RefreshBody {
            client_id: &creds.client_id,
            client_secret: &creds.client_secret,
            grant_type: "refresh_token",
            refresh_token,
        };
        self.request_token(&body).await
    }

    /// App-only token via the client credentials grant. No user context, no
    /// refresh token.
    pub async fn app_access_token(
        &self,
        creds: &Credentials,
    ) -> Result<TokenPair, TwitchProbeError> {
        #[derive(Serialize)]
        struct AppTokenBody<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            grant_type: &'a str,
        }

        let body = AppTokenBody {
            client_id: &creds.client_id,
            client_secret: &creds.client_secret,
            grant_type: "client_credentials",
        };
        self.request_token(&body).await
    }

    /// Asks the identity host whether a token is still live. `Ok(None)` means
    /// invalid or expired; the endpoint's error payload isn't inspected any
    /// further than that.
    pub async fn validate(
        &self,
        access_token: &str,
    ) -> Result<Option<TokenMetadata>, TwitchProbeError> {
        let response = self
            .client
            .get(format!("{}/validate", self.base_url))
            .header("Authorization", format!("OAuth {access_token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }

    async fn request_token<B: Serialize>(&self, body: &B) -> Result<TokenPair, TwitchProbeError> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .form(body)
            .send()
            .await?;

        // success is "the body parses as a token pair". anything else, 2xx
        // or not, goes back to the caller as the raw payload.
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|_| TwitchProbeError::ExchangeFailed(text))
    }
}
