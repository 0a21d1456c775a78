use tokio::sync::mpsc::{Receiver, Sender};
use url::Url;

use super::{authorize_url, REDIRECT_URI};
use crate::{
    config::Credentials,
    twitch::tokens::{AuthAgent, TokenPair},
};

/// Everything the callback routes need to finish the flow: who we are, the
/// agent that talks to the identity host, and the channel that resolves the
/// server's single-shot lifecycle.
pub struct TwitchAuthState {
    pub credentials: Credentials,
    pub auth_agent: AuthAgent,
    auth_page_url: Url,
    pub token_tx: Sender<TokenPair>,
}

impl TwitchAuthState {
    pub fn new(credentials: Credentials, scopes: Vec<String>) -> (Self, Receiver<TokenPair>) {
        // get url for the auth page
        let auth_page_url = authorize_url(&credentials.client_id, REDIRECT_URI, &scopes);

        // create channel for receiving the token pair
        let (token_tx, token_rx) = tokio::sync::mpsc::channel(1);

        (
            Self {
                credentials,
                auth_agent: AuthAgent::new(),
                auth_page_url,
                token_tx,
            },
            token_rx,
        )
    }

    pub fn get_auth_page_url(&self) -> &Url {
        &self.auth_page_url
    }
}
