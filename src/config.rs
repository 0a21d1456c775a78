use std::env;

use log::{debug, warn};

use crate::TwitchProbeError;

/// Names an alternate secrets file to load instead of the usual `.env`.
pub const ENV_FILE_VAR: &str = "TWITCH_ENV_FILE";

/// Everything we know about who we are on Twitch. Loaded once at startup and
/// immutable afterwards; only the client id and secret are required up front.
/// Subcommands that need one of the optional values ask for it with the
/// `require_*` methods so the error can name the missing variable.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub channel: Option<String>,
}

impl Credentials {
    /// Loads the secrets file (if there is one) and reads credentials from
    /// the environment.
    pub fn load() -> Result<Self, TwitchProbeError> {
        match env::var(ENV_FILE_VAR) {
            Ok(path) => {
                if let Err(e) = dotenvy::from_path(&path) {
                    warn!("couldn't load secrets from {path}: {e}");
                }
            }
            Err(_) => {
                // no override set. load a .env if one is lying around.
                if let Ok(path) = dotenvy::dotenv() {
                    debug!("loaded secrets from {}", path.display());
                }
            }
        }

        Ok(Self {
            client_id: required("TWITCH_CLIENT_ID")?,
            client_secret: required("TWITCH_CLIENT_SECRET")?,
            access_token: optional("TWITCH_ACCESS_TOKEN"),
            refresh_token: optional("TWITCH_REFRESH_TOKEN"),
            username: optional("TWITCH_USERNAME"),
            channel: optional("TWITCH_CHANNEL"),
        })
    }

    pub fn require_access_token(&self) -> Result<&str, TwitchProbeError> {
        self.access_token
            .as_deref()
            .ok_or(TwitchProbeError::MissingCredential("TWITCH_ACCESS_TOKEN"))
    }

    pub fn require_refresh_token(&self) -> Result<&str, TwitchProbeError> {
        self.refresh_token
            .as_deref()
            .ok_or(TwitchProbeError::MissingCredential("TWITCH_REFRESH_TOKEN"))
    }
}

fn required(name: &'static str) -> Result<String, TwitchProbeError> {
    match optional(name) {
        Some(value) => Ok(value),
        None => Err(TwitchProbeError::MissingCredential(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // env vars are process-global, so these tests take turns.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_twitch_vars() {
        for var in [
            "TWITCH_CLIENT_ID",
            "TWITCH_CLIENT_SECRET",
            "TWITCH_ACCESS_TOKEN",
            "TWITCH_REFRESH_TOKEN",
            "TWITCH_USERNAME",
            "TWITCH_CHANNEL",
            ENV_FILE_VAR,
        ] {
            env::remove_var(var);
        }
        // keep load() away from any .env file lying around the workspace
        env::set_var(ENV_FILE_VAR, "/nonexistent/.env");
    }

    #[test]
    fn load_reads_and_trims_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_twitch_vars();

        env::set_var("TWITCH_CLIENT_ID", " my_client_id \n");
        env::set_var("TWITCH_CLIENT_SECRET", "my_secret");
        env::set_var("TWITCH_USERNAME", "muni");

        let creds = Credentials::load().unwrap();
        assert_eq!(creds.client_id, "my_client_id");
        assert_eq!(creds.client_secret, "my_secret");
        assert_eq!(creds.username.as_deref(), Some("muni"));
        assert!(creds.access_token.is_none());
        assert!(creds.refresh_token.is_none());
    }

    #[test]
    fn load_fails_without_client_id() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_twitch_vars();

        env::set_var("TWITCH_CLIENT_SECRET", "my_secret");

        let err = Credentials::load().unwrap_err();
        assert!(matches!(
            err,
            TwitchProbeError::MissingCredential("TWITCH_CLIENT_ID")
        ));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_twitch_vars();

        env::set_var("TWITCH_CLIENT_ID", "id");
        env::set_var("TWITCH_CLIENT_SECRET", "secret");
        env::set_var("TWITCH_REFRESH_TOKEN", "   ");

        let creds = Credentials::load().unwrap();
        assert!(creds.refresh_token.is_none());
        assert!(matches!(
            creds.require_refresh_token().unwrap_err(),
            TwitchProbeError::MissingCredential("TWITCH_REFRESH_TOKEN")
        ));
    }
}
