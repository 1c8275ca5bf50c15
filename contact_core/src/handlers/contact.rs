use crate::{contact::ContactForm, error::Result, AppState};
use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde_json::json;

/// `POST /api/contact`. Runs behind the rate limiter, so the body is only read
/// for admitted callers.
pub async fn handle_contact(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let form = ContactForm::from_json(&body)?;

    state.gate.submit(form).await?;

    Ok(Json(json!({ "ok": true })))
}
