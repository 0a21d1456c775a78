use std::str::FromStr;

use url::Url;

pub mod routes;
pub mod state;

pub(crate) const CALLBACK_PORT: u16 = 3000;
pub(crate) const CALLBACK_PATH: &str = "/callback";
pub(crate) const REDIRECT_URI: &str = "http://localhost:3000/callback";

/// Scopes requested when none are given on the command line. Follower totals
/// need `moderator:read:followers`.
pub const DEFAULT_SCOPES: [&str; 2] = ["user:read:email", "moderator:read:followers"];

/// Returns the URL a user visits in their browser to authorize this client.
/// Pure construction; nothing here talks to Twitch.
pub fn authorize_url(client_id: &str, redirect_uri: &str, scopes: &[String]) -> Url {
    let mut url = Url::from_str("https://id.twitch.tv/oauth2/authorize").unwrap();

    let auth = vec![
        ("response_type", "code"),
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
    ];

    url.query_pairs_mut().extend_pairs(auth);
    url.query_pairs_mut().append_pair("scope", &scopes.join(" "));

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_all_query_parameters() {
        let scopes = vec!["chat:read".to_string(), "chat:edit".to_string()];
        let url = authorize_url("my_client_id", REDIRECT_URI, &scopes);

        assert_eq!(url.host_str(), Some("id.twitch.tv"));
        assert_eq!(url.path(), "/oauth2/authorize");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "my_client_id".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), REDIRECT_URI.to_string())));
    }

    #[test]
    fn scopes_are_space_joined() {
        let scopes = vec!["chat:read".to_string(), "chat:edit".to_string()];
        let url = authorize_url("my_client_id", REDIRECT_URI, &scopes);

        let scope = url
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.to_string())
            .unwrap();
        assert_eq!(scope, "chat:read chat:edit");
    }
}
