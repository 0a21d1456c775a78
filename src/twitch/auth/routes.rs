use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use log::error;
use serde::Deserialize;

use super::{state::TwitchAuthState, REDIRECT_URI};
use crate::TwitchProbeError;

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Handles the redirect back from Twitch. An `error` parameter answers 400
/// and leaves the server listening so the user can retry; a `code` gets
/// exchanged on the spot. Only a successful exchange resolves the flow.
pub(crate) async fn twitch_oauth_callback(
    State(state): State<Arc<TwitchAuthState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        error!("caught an error with auth: {error} {description}");

        let page = match error.as_str() {
            "access_denied" => "twitch_probe was denied access".to_string(),
            _ => format!("twitch_probe could not be authorized: {description} ({error})"),
        };
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    }

    let Some(code) = query.code else {
        return (
            StatusCode::BAD_REQUEST,
            Html("expected a code or an error in the callback query".to_string()),
        )
            .into_response();
    };

    match state
        .auth_agent
        .exchange_code(&state.credentials, &code, REDIRECT_URI)
        .await
    {
        Ok(pair) => {
            if let Err(e) = state.token_tx.send(pair).await {
                error!("token send failed: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "got a token but had nowhere to put it".to_string(),
                )
                    .into_response();
            }
            Html("twitch_probe is authorized with twitch! you can close this tab".to_string())
                .into_response()
        }
        Err(e) => {
            error!("code exchange failed: {e}");
            // hand back the provider's payload as-is and keep listening for
            // another attempt
            let body = match e {
                TwitchProbeError::ExchangeFailed(payload) => payload,
                other => other.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

/// Every path that isn't the callback gets this.
pub(crate) async fn placeholder() -> Html<&'static str> {
    Html("<html><body>twitch_probe is waiting for an oauth callback on /callback</body></html>")
}
