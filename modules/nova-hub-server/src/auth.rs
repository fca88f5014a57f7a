//! Resolves "the caller is Client X" without any bcrypt/JWT machinery —
//! authentication itself is assumed to have already happened upstream.
//! This extractor's only job is mapping the asserted `client_id` header
//! to a catalog row and confirming a shared secret presented alongside it.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nova_hub_catalog::Client;
use sha2::{Digest, Sha256};

use crate::state::AppState;

const CLIENT_ID_HEADER: &str = "x-nova-client-id";
const CLIENT_SECRET_HEADER: &str = "x-nova-client-secret";

pub struct AuthenticatedClient {
    pub client: Client,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedClient {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let client_id = header_str(parts, CLIENT_ID_HEADER).ok_or_else(unauthorized)?;
        let secret = header_str(parts, CLIENT_SECRET_HEADER).ok_or_else(unauthorized)?;

        let client = Client::find_by_client_id(client_id, &state.pool)
            .await
            .map_err(|_| unauthorized())?
            .ok_or_else(unauthorized)?;

        if !client.active || !constant_time_eq(hash_secret(secret).as_bytes(), client.hashed_secret.as_bytes()) {
            return Err(unauthorized());
        }

        let _ = Client::touch_last_seen(client.id, &state.pool).await;
        Ok(AuthenticatedClient { client })
    }
}

const OPERATOR_TOKEN_HEADER: &str = "x-nova-operator-token";

/// Resolves "authenticated as operator" against a single shared token
/// rather than the sysop console's own session mechanism, which is out
/// of scope here. An unconfigured token disables the check — acceptable
/// only for local development.
pub struct AuthenticatedOperator;

impl FromRequestParts<Arc<AppState>> for AuthenticatedOperator {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.operator_token.as_deref() else {
            return Ok(AuthenticatedOperator);
        };

        let presented = header_str(parts, OPERATOR_TOKEN_HEADER).unwrap_or_default();
        if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            Ok(AuthenticatedOperator)
        } else {
            Err(unauthorized())
        }
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name)?.to_str().ok()
}

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fixed-cost comparison so a mismatched secret doesn't leak its length
/// of agreement through response timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"detail": "unauthorized"})),
    )
        .into_response()
}
