use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::assistant::ProcessError;
use crate::error::ApiError;
use crate::inventory::fetch_inventory;
use crate::state::AppState;
use crate::uploads::store_audio_upload;

/// `POST /ask`: `{ "text": "..." }` -> `{ "reply": "..." }`
pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let text = payload
        .ok()
        .and_then(|Json(body)| body.get("text").and_then(Value::as_str).map(str::to_string))
        .filter(|text| !text.trim().is_empty());

    let Some(text) = text else {
        warn!("Rejected /ask request without text");
        return Err(ApiError::bad_request("Text input is required"));
    };

    // The script reads inventory itself; the snapshot is not forwarded.
    let inventory = fetch_inventory(state.inventory.as_ref()).await?;
    debug!("Inventory snapshot holds {} items", inventory.len());

    info!("Forwarding text question to assistant ({} chars)", text.chars().count());
    let reply = state.assistant.ask(&text).await?;

    Ok(Json(json!({ "reply": reply })))
}

/// `POST /audio`: multipart field `audio` -> `{ "response": "..." }`
pub async fn audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Rejected /audio request: {}", rejection.body_text());
        ApiError::BadRequest {
            message: "No audio file uploaded".to_string(),
            details: Some(rejection.body_text()),
        }
    })?;

    let upload = store_audio_upload(&mut multipart, &state.config.system.upload_path()).await?;
    info!("Forwarding audio question to assistant: {}", upload.path().display());

    // Detached so the upload is still removed if the client goes away
    // while the assistant is running.
    let assistant = state.assistant.clone();
    let invocation = tokio::spawn(async move {
        let result = assistant.ask_with_audio(upload.path()).await;
        match &result {
            // Nothing ran, so the upload is left where it is.
            Err(ProcessError::Spawn { .. }) => {
                warn!(
                    "Assistant never started; leaving upload {} in place",
                    upload.path().display()
                );
            }
            _ => upload.remove().await,
        }
        result
    });

    let response = invocation.await.map_err(|e| {
        error!("Audio invocation task failed: {}", e);
        ApiError::Internal(e.to_string())
    })??;
    Ok(Json(json!({ "response": response })))
}
