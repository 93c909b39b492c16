//! Bounded body collection and JSON decoding shared by every handler.

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::Request;
use serde::de::DeserializeOwned;

use strongbox_core::AppError;

/// Collect `req`'s body, rejecting anything over `limit` bytes with
/// `PayloadTooLarge` rather than buffering it.
pub async fn collect_limited(req: Request<Incoming>, limit: usize) -> Result<Bytes, AppError> {
    let body = req.into_body();
    Limited::new(body, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|_| AppError::PayloadTooLarge)
}

/// Collect and JSON-decode a request body bounded by
/// `MAX_JSON_BODY_BYTES`. A decode failure is `MalformedInput`, never a
/// panic or a 500 — the body's shape is attacker-controlled.
pub async fn json_body<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, AppError> {
    let bytes = collect_limited(req, strongbox_core::MAX_JSON_BODY_BYTES as usize).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::MalformedInput(format!("invalid request body: {e}")))
}
