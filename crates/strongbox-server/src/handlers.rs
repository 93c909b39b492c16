//! One function per route in the table, each taking the parsed request
//! and returning a `Response` or an `AppError` for the router to render.
//! Every handler re-expresses its slice of the old "any"-typed boundary
//! as a schema-validated record (see `dto`); validation rejects before
//! any business logic runs.

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::{Request, Response};

use strongbox_auth::Session;
use strongbox_core::model::FileEntry;
use strongbox_core::token::{is_alphanumeric_of_length, new_handle};
use strongbox_core::{AppError, FILE_HANDLE_LENGTH, MAX_BINARY_BODY_BYTES};

use crate::body::{collect_limited, json_body};
use crate::context::AppContext;
use crate::cookies;
use crate::dto::*;
use crate::response::{self, Body};

pub async fn login(
    ctx: &AppContext,
    client_key: &str,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    if cookies::session_token(req.headers())
        .is_some_and(|token| ctx.auth.sessions().get(&token).is_some())
    {
        return Err(AppError::Conflict(
            "already authenticated; call /api/logout first".into(),
        ));
    }
    if !ctx.rate_limiter.check(client_key) {
        return Err(AppError::RateLimited);
    }
    let body: LoginRequest = json_body(req).await?;
    let reply = ctx
        .auth
        .login(&body.username, &body.password)
        .map_err(crate::errors::from_auth)?;

    Ok(match reply {
        strongbox_auth::LoginReply::Salt(salt) => response::json(&LoginResponse::Salt {
            password_public_salt: hex::encode(salt.password_public_salt),
        }),
        strongbox_auth::LoginReply::Authenticated(auth) => {
            let resp = response::json(&LoginResponse::Authenticated {
                master_key_salt: hex::encode(auth.master_key_salt),
                ed25519_private_key_encrypted_b64: encode_b64(&auth.ed25519_private_key_encrypted),
                ed25519_public_key_b64: encode_b64(&auth.ed25519_public_key),
                x25519_private_key_encrypted_b64: encode_b64(&auth.x25519_private_key_encrypted),
                x25519_public_key_b64: encode_b64(&auth.x25519_public_key),
            });
            response::with_cookie(resp, cookies::set_session_cookie(&auth.token, ctx.config.secure_cookies))
        }
    })
}

pub fn logout(ctx: &AppContext, token: Option<&str>) -> Response<Body> {
    if let Some(token) = token {
        ctx.auth.sessions().revoke(token);
    }
    let resp = response::empty_ok();
    response::with_cookie(resp, cookies::clear_session_cookie(ctx.config.secure_cookies))
}

pub async fn claim_account(
    ctx: &AppContext,
    client_key: &str,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    if !ctx.rate_limiter.check(client_key) {
        return Err(AppError::RateLimited);
    }
    let body: ClaimAccountRequest = json_body(req).await?;

    if !body.is_commit() {
        let probe = ctx.auth.claim_probe(&body.code).map_err(crate::errors::from_auth)?;
        return Ok(response::json(&ClaimProbeResponse {
            storage_quota: probe.storage_quota_bytes,
            password_public_salt: hex::encode(probe.password_public_salt),
            master_key_salt: hex::encode(probe.master_key_salt),
        }));
    }

    let keypairs = body
        .keypairs()
        .map_err(AppError::MalformedInput)?;
    let username = body.username.as_deref().unwrap_or_default();
    let password = body.password.as_deref().unwrap_or_default();
    ctx.auth
        .claim_commit(&body.code, username, password, keypairs)
        .map_err(crate::errors::from_auth)?;
    Ok(response::json(&MessageResponse {
        message: "account claimed".to_string(),
    }))
}

pub fn is_logged_in(session: Option<Session>) -> Response<Body> {
    response::json(&BoolValue {
        value: session.is_some(),
    })
}

pub fn get_username(session: &Session) -> Response<Body> {
    response::text(&session.username)
}

pub fn get_storage_quota(ctx: &AppContext, session: &Session) -> Result<Response<Body>, AppError> {
    let user = ctx
        .catalog
        .lookup_user_by_id(session.user_id)
        .map_err(crate::errors::from_catalog)?
        .ok_or(AppError::AuthRequired)?;
    Ok(response::json(&U64Value {
        value: user.storage_quota_bytes,
    }))
}

pub fn get_storage_used(ctx: &AppContext, session: &Session) -> Result<Response<Body>, AppError> {
    let used = ctx
        .catalog
        .bytes_used(session.user_id)
        .map_err(crate::errors::from_catalog)?;
    Ok(response::json(&U64Value { value: used }))
}

pub async fn get_filesystem(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: HandleRequest = json_body(req).await?;
    if !is_alphanumeric_of_length(&body.handle, FILE_HANDLE_LENGTH)
        && body.handle != strongbox_core::ROOT_HANDLE
    {
        return Err(AppError::MalformedInput("malformed handle".into()));
    }
    let entries = ctx
        .download
        .list_children(session.user_id, &body.handle)
        .map_err(crate::errors::from_download)?;
    Ok(response::json(&FileSystemListing {
        data: entries.into_iter().map(FileSystemEntryDto::from).collect(),
    }))
}

pub async fn create_folder(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: CreateFolderRequest = json_body(req).await?;
    if !is_alphanumeric_of_length(&body.parent_handle, FILE_HANDLE_LENGTH)
        && body.parent_handle != strongbox_core::ROOT_HANDLE
    {
        return Err(AppError::MalformedInput("malformed parent handle".into()));
    }
    let metadata = decode_b64(&body.encrypted_metadata_b64)
        .map_err(|_| AppError::MalformedInput("malformed metadata".into()))?;
    if metadata.len() > strongbox_core::ENCRYPTED_FILE_METADATA_MAX_SIZE {
        return Err(AppError::MalformedInput("metadata too large".into()));
    }
    if body.parent_handle != strongbox_core::ROOT_HANDLE {
        let parent = ctx
            .catalog
            .get_file(&body.parent_handle)
            .map_err(crate::errors::from_catalog)?
            .ok_or(AppError::NotAuthorised)?;
        if parent.owner_id != session.user_id {
            return Err(AppError::NotAuthorised);
        }
    }

    let handle = new_handle();
    let entry = FileEntry {
        owner_id: session.user_id,
        handle: handle.clone(),
        parent_handle: body.parent_handle,
        size_bytes: 0,
        encrypted_file_crypt_key: Vec::new(),
        encrypted_metadata: metadata,
        signature: String::new(),
    };
    ctx.catalog.insert_file(&entry).map_err(crate::errors::from_catalog)?;
    Ok(response::json(&HandleResponse { handle }))
}

pub async fn edit_metadata(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: Vec<EditMetadataEntry> = json_body(req).await?;
    for entry in body {
        if !is_alphanumeric_of_length(&entry.handle, FILE_HANDLE_LENGTH) {
            return Err(AppError::MalformedInput("malformed handle".into()));
        }
        let metadata = decode_b64(&entry.encrypted_metadata_b64)
            .map_err(|_| AppError::MalformedInput("malformed metadata".into()))?;
        if metadata.len() > strongbox_core::ENCRYPTED_FILE_METADATA_MAX_SIZE {
            return Err(AppError::MalformedInput("metadata too large".into()));
        }
        let affected = ctx
            .catalog
            .update_metadata(session.user_id, &entry.handle, &metadata)
            .map_err(crate::errors::from_catalog)?;
        if affected == 0 {
            return Err(AppError::NotAuthorised);
        }
    }
    Ok(response::empty_ok())
}

pub async fn start_upload(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: StartUploadRequest = json_body(req).await?;
    let encrypted_size = strongbox_core::encrypted_size(body.file_size);
    let handle = ctx
        .upload
        .start(session.user_id, encrypted_size)
        .await
        .map_err(crate::errors::from_upload)?;
    Ok(response::json(&HandleResponse { handle }))
}

pub async fn upload_chunk(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let content_type = req
        .headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let boundary = multer::parse_boundary(&content_type)
        .map_err(|_| AppError::MalformedInput("missing multipart boundary".into()))?;

    let bytes = collect_limited(req, MAX_BINARY_BODY_BYTES as usize).await?;
    let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut handle: Option<String> = None;
    let mut chunk_id: Option<u32> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedInput(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("handle") => {
                handle = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::MalformedInput(e.to_string()))?,
                );
            }
            Some("chunkId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::MalformedInput(e.to_string()))?;
                chunk_id = Some(
                    text.parse()
                        .map_err(|_| AppError::MalformedInput("malformed chunkId".into()))?,
                );
            }
            Some("data") => {
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::MalformedInput(e.to_string()))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let handle = handle.ok_or_else(|| AppError::MalformedInput("missing handle field".into()))?;
    let chunk_id = chunk_id.ok_or_else(|| AppError::MalformedInput("missing chunkId field".into()))?;
    let data = data.ok_or_else(|| AppError::MalformedInput("missing data field".into()))?;

    ctx.upload
        .chunk(session.user_id, &handle, chunk_id, data)
        .await
        .map_err(crate::errors::from_upload)?;
    Ok(response::empty_ok())
}

pub async fn finalise_upload(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: FinaliseUploadRequest = json_body(req).await?;
    let metadata = decode_b64(&body.encrypted_metadata_b64)
        .map_err(|_| AppError::MalformedInput("malformed metadata".into()))?;
    let crypt_key = decode_b64(&body.encrypted_file_crypt_key_b64)
        .map_err(|_| AppError::MalformedInput("malformed crypt key".into()))?;

    ctx.upload
        .finalise(
            session.user_id,
            &body.handle,
            &body.parent_handle,
            metadata,
            crypt_key,
            body.signature,
        )
        .await
        .map_err(crate::errors::from_upload)?;
    Ok(response::empty_ok())
}

pub async fn cancel_upload(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: HandleRequest = json_body(req).await?;
    ctx.upload
        .cancel(session.user_id, &body.handle)
        .await
        .map_err(crate::errors::from_upload)?;
    Ok(response::empty_ok())
}

pub async fn download_chunk(
    ctx: &AppContext,
    session: &Session,
    req: Request<Incoming>,
) -> Result<Response<Body>, AppError> {
    let body: DownloadChunkRequest = json_body(req).await?;
    let bytes = ctx
        .download
        .chunk(session.user_id, &body.handle, body.chunk_id)
        .await
        .map_err(crate::errors::from_download)?;
    Ok(response::binary_ok(bytes))
}
