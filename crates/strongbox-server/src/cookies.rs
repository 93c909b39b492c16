//! Minimal `Cookie`/`Set-Cookie` handling for the one cookie this service
//! sets: the opaque session token.

use hyper::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};

const SESSION_COOKIE_NAME: &str = "session";

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE_NAME).then(|| value.to_string())
    })
}

pub fn set_session_cookie(token: &str, secure: bool) -> HeaderValue {
    let secure_attr = if secure { "; Secure" } else { "" };
    let raw = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict{secure_attr}");
    HeaderValue::from_str(&raw).expect("cookie value is ASCII")
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    let secure_attr = if secure { "; Secure" } else { "" };
    let raw = format!(
        "{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0{secure_attr}"
    );
    HeaderValue::from_str(&raw).expect("cookie value is ASCII")
}
