//! Small helpers for building `Response<Full<Bytes>>` bodies, and the
//! single place `AppError` is turned into wire bytes.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, SET_COOKIE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use strongbox_core::AppError;

pub type Body = Full<Bytes>;

pub fn json<T: Serialize>(body: &T) -> Response<Body> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .expect("static response parts are valid")
}

pub fn text(body: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response parts are valid")
}

pub fn empty_ok() -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .body(Full::new(Bytes::new()))
        .expect("static response parts are valid")
}

pub fn binary_ok(bytes: Vec<u8>) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(Full::new(Bytes::from(bytes)))
        .expect("static response parts are valid")
}

pub fn with_cookie(mut resp: Response<Body>, cookie: hyper::header::HeaderValue) -> Response<Body> {
    resp.headers_mut().append(SET_COOKIE, cookie);
    resp
}

/// Status-code-only response, used everywhere except the login/claim
/// routes (which always reply with a JSON `{message}` body).
pub fn bare_status(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .expect("static response parts are valid")
}

fn status_for(err: &AppError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Render an `AppError` as a bare status code, logging the cause.
pub fn error_bare(err: &AppError) -> Response<Body> {
    log_error(err);
    bare_status(status_for(err))
}

/// Render an `AppError` as `{"message": ...}`, the shape login/claim use.
/// In development mode the message includes the underlying cause for
/// `Internal` errors; in production it stays generic.
pub fn error_message(err: &AppError, dev_mode: bool) -> Response<Body> {
    log_error(err);
    let message = match (err, dev_mode) {
        (AppError::Internal(cause), true) => cause.to_string(),
        _ => err.client_message(),
    };
    let body = serde_json::json!({ "message": message });
    Response::builder()
        .status(status_for(err))
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(serde_json::to_vec(&body).unwrap_or_default())))
        .expect("static response parts are valid")
}

fn log_error(err: &AppError) {
    match err {
        AppError::Internal(cause) => tracing::error!(%cause, "internal error handling request"),
        other => tracing::debug!(%other, "request rejected"),
    }
}
