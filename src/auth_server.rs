use std::{sync::Arc, time::Duration};

use axum::{routing::get, Router};
use log::info;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use url::Url;

use crate::{
    config::Credentials,
    twitch::{
        auth::{
            routes::{placeholder, twitch_oauth_callback},
            state::TwitchAuthState,
            CALLBACK_PATH, CALLBACK_PORT,
        },
        tokens::TokenPair,
    },
    TwitchProbeError,
};

/// AuthServer is a one-shot server for the oauth authorization-code
/// callback. It listens until exactly one exchange succeeds, then releases
/// the socket and hands the token pair back to the caller. Error callbacks
/// leave it listening so the user can retry without relaunching.
pub struct AuthServer {
    state: Arc<TwitchAuthState>,
    token_rx: tokio::sync::mpsc::Receiver<TokenPair>,
}

impl AuthServer {
    pub fn new(credentials: Credentials, scopes: Vec<String>) -> Self {
        let (state, token_rx) = TwitchAuthState::new(credentials, scopes);

        Self {
            state: Arc::new(state),
            token_rx,
        }
    }

    pub fn auth_page_url(&self) -> &Url {
        self.state.get_auth_page_url()
    }

    /// Runs the listener until a token pair arrives. The confirmation page
    /// needs a moment to flush to the browser, so shutdown waits about a
    /// second after the pair lands.
    pub async fn run(mut self) -> Result<TokenPair, TwitchProbeError> {
        let listener = TcpListener::bind(("127.0.0.1", CALLBACK_PORT)).await?;
        info!(
            "listening for the oauth callback on {}",
            listener.local_addr()?
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(self.state.clone());
        let server: JoinHandle<std::io::Result<()>> = tokio::task::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let token = self
            .token_rx
            .recv()
            .await
            .ok_or(TwitchProbeError::AuthFlowInterrupted)?;

        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = shutdown_tx.send(());
        server.await.map_err(std::io::Error::other)??;

        Ok(token)
    }
}

fn router(state: Arc<TwitchAuthState>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(twitch_oauth_callback))
        .fallback(placeholder)
        .with_state(state)
}

/// Opens the authorization page with a new thread. open-rs is not supposed
/// to block, but it does anyways for some reason
#[must_use]
pub fn open_auth_page(auth_page_url: Url) -> JoinHandle<()> {
    tokio::task::spawn(async move {
        println!("opening authorization page");
        if let Err(e) = open::that(auth_page_url.to_string()) {
            eprintln!("couldn't open url: {e}");
            eprintln!("to authorize, open up this url: {auth_page_url}");
        } else {
            println!("opened auth page");
        }
    })
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::Receiver;

    use super::*;
    use crate::twitch::tokens::AuthAgent;

    fn test_credentials() -> Credentials {
        Credentials {
            client_id: "my_client_id".to_string(),
            client_secret: "my_secret".to_string(),
            access_token: None,
            refresh_token: None,
            username: None,
            channel: None,
        }
    }

    /// Serves the callback router on an ephemeral port, with the exchange
    /// client pointed at `id_base_url`. Returns the address and the token
    /// receiver.
    async fn spawn_test_server(id_base_url: &str) -> (String, Receiver<TokenPair>) {
        let (mut state, token_rx) = TwitchAuthState::new(test_credentials(), vec![]);
        state.auth_agent = AuthAgent::with_base_url(id_base_url);

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(state));
        tokio::task::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), token_rx)
    }

    #[tokio::test]
    async fn successful_callback_exchanges_and_delivers_the_pair() {
        let mut id_server = mockito::Server::new_async().await;
        let exchange = id_server
            .mock("POST", "/token")
            .with_body(
                r#"{"access_token": "a1", "refresh_token": "r1", "expires_in": 14400}"#,
            )
            .create_async()
            .await;

        let (base, mut token_rx) = spawn_test_server(&id_server.url()).await;

        let response = reqwest::get(format!("{base}/callback?code=onetimecode"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert!(response.text().await.unwrap().contains("authorized"));

        exchange.assert_async().await;
        let pair = token_rx.recv().await.unwrap();
        assert_eq!(pair.access_token, "a1");
        assert_eq!(pair.refresh_token, "r1");
    }

    #[tokio::test]
    async fn error_callback_gets_400_and_no_exchange() {
        let mut id_server = mockito::Server::new_async().await;
        let exchange = id_server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let (base, mut token_rx) = spawn_test_server(&id_server.url()).await;

        let response = reqwest::get(format!(
            "{base}/callback?error=access_denied&error_description=denied"
        ))
        .await
        .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        assert!(response.text().await.unwrap().contains("denied access"));

        exchange.assert_async().await;
        assert!(token_rx.try_recv().is_err());

        // the server is still up for a retry
        let retry = reqwest::get(format!("{base}/callback?error=access_denied"))
            .await
            .unwrap();
        assert_eq!(retry.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn failed_exchange_gets_500_with_the_raw_payload() {
        let mut id_server = mockito::Server::new_async().await;
        let payload = r#"{"status":400,"message":"Invalid authorization code"}"#;
        id_server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(payload)
            .create_async()
            .await;

        let (base, mut token_rx) = spawn_test_server(&id_server.url()).await;

        let response = reqwest::get(format!("{base}/callback?code=used_code"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(response.text().await.unwrap(), payload);
        assert!(token_rx.try_recv().is_err());

        // still listening after a failed exchange
        let placeholder = reqwest::get(format!("{base}/anything")).await.unwrap();
        assert_eq!(placeholder.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn other_paths_get_the_placeholder_page() {
        let id_server = mockito::Server::new_async().await;
        let (base, _token_rx) = spawn_test_server(&id_server.url()).await;

        let response = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert!(response.text().await.unwrap().contains("waiting for an oauth callback"));
    }
}
