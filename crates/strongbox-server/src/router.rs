//! Method+path dispatch. No framework: a direct match, the same
//! preference for hand-rolled routing over an abstraction layer this
//! workspace's HTTP crates show elsewhere.

use std::net::IpAddr;

use hyper::body::Incoming;
use hyper::{Method, Request, Response};

use strongbox_auth::Session;
use strongbox_core::AppError;

use crate::context::AppContext;
use crate::cookies;
use crate::handlers;
use crate::response::{self, Body};

/// Routes whose errors are rendered as `{"message": ...}` rather than a
/// bare status code.
fn uses_json_errors(path: &str) -> bool {
    matches!(path, "/api/login" | "/api/claimaccount")
}

pub async fn route(
    ctx: &AppContext,
    peer_ip: IpAddr,
    req: Request<Incoming>,
) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let client_key = peer_ip.to_string();
    let json_errors = uses_json_errors(&path);

    let result = dispatch(ctx, &client_key, &method, &path, req).await;
    match result {
        Ok(resp) => resp,
        Err(err) if json_errors => response::error_message(&err, ctx.config.dev_mode),
        Err(err) => response::error_bare(&err),
    }
}

async fn dispatch(
    ctx: &AppContext,
    client_key: &str,
    method: &Method,
    path: &str,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    match (method, path) {
        (&Method::POST, "/api/login") => handlers::login(ctx, client_key, req).await,
        (&Method::POST, "/api/logout") => {
            let token = cookies::session_token(req.headers());
            Ok(handlers::logout(ctx, token.as_deref()))
        }
        (&Method::POST, "/api/claimaccount") => handlers::claim_account(ctx, client_key, req).await,
        (&Method::GET, "/api/isloggedin") => {
            let session = current_session(ctx, &req);
            Ok(handlers::is_logged_in(session))
        }
        (&Method::GET, "/api/getusername") => {
            let session = require_session(ctx, &req)?;
            Ok(handlers::get_username(&session))
        }
        (&Method::GET, "/api/getstoragequota") => {
            let session = require_session(ctx, &req)?;
            handlers::get_storage_quota(ctx, &session)
        }
        (&Method::GET, "/api/getstorageused") => {
            let session = require_session(ctx, &req)?;
            handlers::get_storage_used(ctx, &session)
        }
        (&Method::POST, "/api/getfilesystem") => {
            let session = require_session(ctx, &req)?;
            handlers::get_filesystem(ctx, &session, req).await
        }
        (&Method::POST, "/api/filesystem/createFolder") => {
            let session = require_session(ctx, &req)?;
            handlers::create_folder(ctx, &session, req).await
        }
        (&Method::POST, "/api/filesystem/editmetadata") => {
            let session = require_session(ctx, &req)?;
            handlers::edit_metadata(ctx, &session, req).await
        }
        (&Method::POST, "/api/transfer/startupload") => {
            let session = require_session(ctx, &req)?;
            handlers::start_upload(ctx, &session, req).await
        }
        (&Method::POST, "/api/transfer/uploadchunk") => {
            let session = require_session(ctx, &req)?;
            handlers::upload_chunk(ctx, &session, req).await
        }
        (&Method::POST, "/api/transfer/finaliseupload") => {
            let session = require_session(ctx, &req)?;
            handlers::finalise_upload(ctx, &session, req).await
        }
        (&Method::POST, "/api/transfer/cancelupload") => {
            let session = require_session(ctx, &req)?;
            handlers::cancel_upload(ctx, &session, req).await
        }
        (&Method::POST, "/api/transfer/downloadchunk") => {
            let session = require_session(ctx, &req)?;
            handlers::download_chunk(ctx, &session, req).await
        }
        _ => Err(AppError::MalformedInput("no such route".into())),
    }
}

fn current_session(ctx: &AppContext, req: &Request<Incoming>) -> Option<Session> {
    let token = cookies::session_token(req.headers())?;
    ctx.auth.sessions().get(&token)
}

fn require_session(ctx: &AppContext, req: &Request<Incoming>) -> Result<Session, AppError> {
    current_session(ctx, req).ok_or(AppError::AuthRequired)
}
