pub mod download;
pub mod list;
pub mod upload;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nova_hub_common::GameType;

/// Split a `{NNN[BF]}` path segment (e.g. `555B`) into its league number and
/// game letter. The league number is kept as text throughout the catalog,
/// so only the trailing letter is special-cased here.
pub fn parse_league_game(segment: &str) -> Option<(String, GameType)> {
    if segment.len() < 2 {
        return None;
    }
    let (number, letter) = segment.split_at(segment.len() - 1);
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let game: GameType = letter.parse().ok()?;
    Some((number.to_string(), game))
}

pub(crate) fn bad_request(detail: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, detail)
}

pub(crate) fn forbidden(detail: impl Into<String>) -> Response {
    error_response(StatusCode::FORBIDDEN, detail)
}

pub(crate) fn not_found(detail: impl Into<String>) -> Response {
    error_response(StatusCode::NOT_FOUND, detail)
}

pub(crate) fn internal_error(detail: impl Into<String>) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, detail)
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "detail": detail.into() }))).into_response()
}

/// Maps the hub's error taxonomy onto the status codes the wire contract
/// names; anything left over becomes a generic 500 with the detail logged,
/// not leaked to the caller.
pub(crate) fn hub_error_response(err: nova_hub_common::NovaHubError) -> Response {
    use nova_hub_common::NovaHubError as E;
    match err {
        E::Validation(msg) => bad_request(msg),
        E::Authorization(msg) => forbidden(msg),
        E::NotFound(msg) => not_found(msg),
        E::Policy(msg) => forbidden(msg),
        other => {
            tracing::error!(error = %other, "unexpected internal fault");
            internal_error("internal error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_league_game_segment() {
        let (number, game) = parse_league_game("555B").unwrap();
        assert_eq!(number, "555");
        assert_eq!(game, GameType::B);
    }

    #[test]
    fn rejects_missing_letter_or_digits() {
        assert!(parse_league_game("555").is_none());
        assert!(parse_league_game("B").is_none());
        assert!(parse_league_game("55X").is_none());
    }
}
