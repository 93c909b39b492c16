mod common;

use common::harness::{dummy_keypair_fields, TestServer, DUMMY_PASSWORD_HASH};
use serde_json::json;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("build http client")
}

#[tokio::test]
async fn claim_login_and_logout_round_trip() {
    let server = TestServer::spawn().await;
    let code = server.reserve_account(10 * 1024 * 1024);

    let http = client();

    // Probing the code before supplying credentials returns salts, not an account.
    let probe = http
        .post(format!("{}/api/claimaccount", server.base_url))
        .json(&json!({ "code": code }))
        .send()
        .await
        .expect("probe request");
    assert_eq!(probe.status(), 200);
    let probe_body: serde_json::Value = probe.json().await.expect("probe json");
    assert!(probe_body.get("storageQuota").is_some());

    let mut commit_body = json!({
        "code": code,
        "username": "alice",
        "password": DUMMY_PASSWORD_HASH,
    });
    for (key, value) in dummy_keypair_fields() {
        commit_body[key] = json!(value);
    }
    let commit = http
        .post(format!("{}/api/claimaccount", server.base_url))
        .json(&commit_body)
        .send()
        .await
        .expect("commit request");
    assert_eq!(commit.status(), 200);

    // Not logged in until `login` is called, even with the account claimed.
    let is_logged_in = http
        .get(format!("{}/api/isloggedin", server.base_url))
        .send()
        .await
        .expect("isloggedin request")
        .json::<serde_json::Value>()
        .await
        .expect("isloggedin json");
    assert_eq!(is_logged_in["value"], json!(false));

    let login = http
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "alice", "password": DUMMY_PASSWORD_HASH }))
        .send()
        .await
        .expect("login request");
    assert_eq!(login.status(), 200);
    let login_body: serde_json::Value = login.json().await.expect("login json");
    assert!(login_body.get("masterKeySalt").is_some());

    let username = http
        .get(format!("{}/api/getusername", server.base_url))
        .send()
        .await
        .expect("getusername request")
        .text()
        .await
        .expect("getusername text");
    assert_eq!(username, "alice");

    // A second login attempt while already authenticated is refused outright.
    let relogin = http
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "alice", "password": DUMMY_PASSWORD_HASH }))
        .send()
        .await
        .expect("relogin request");
    assert_eq!(relogin.status(), 400);

    let logout = http
        .post(format!("{}/api/logout", server.base_url))
        .send()
        .await
        .expect("logout request");
    assert_eq!(logout.status(), 200);

    let after_logout = http
        .get(format!("{}/api/getusername", server.base_url))
        .send()
        .await
        .expect("getusername after logout");
    assert_eq!(after_logout.status(), 401);

    server.shutdown().await;
}

#[tokio::test]
async fn login_with_unknown_username_is_indistinguishable_from_wrong_password() {
    let server = TestServer::spawn().await;
    let http = client();

    let salt_for_unknown = http
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "ghost", "password": "" }))
        .send()
        .await
        .expect("salt request")
        .status();
    assert_eq!(salt_for_unknown, 200);

    let wrong_password = http
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "ghost", "password": DUMMY_PASSWORD_HASH }))
        .send()
        .await
        .expect("wrong password request");
    assert_eq!(wrong_password.status(), 400);

    server.shutdown().await;
}

#[tokio::test]
async fn claim_with_unknown_code_is_rejected() {
    let server = TestServer::spawn().await;
    let http = client();

    let response = http
        .post(format!("{}/api/claimaccount", server.base_url))
        .json(&json!({ "code": "not-a-real-code" }))
        .send()
        .await
        .expect("probe request");
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("error json");
    assert!(body.get("message").is_some());

    server.shutdown().await;
}

#[tokio::test]
async fn unauthenticated_requests_to_protected_routes_are_rejected() {
    let server = TestServer::spawn().await;
    let http = client();

    let response = http
        .get(format!("{}/api/getstoragequota", server.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    server.shutdown().await;
}

#[tokio::test]
async fn create_folder_list_and_upload_round_trip() {
    let server = TestServer::spawn().await;
    let code = server.reserve_account(10 * 1024 * 1024);
    let http = client();

    let mut commit_body = json!({
        "code": code,
        "username": "bob",
        "password": DUMMY_PASSWORD_HASH,
    });
    for (key, value) in dummy_keypair_fields() {
        commit_body[key] = json!(value);
    }
    http.post(format!("{}/api/claimaccount", server.base_url))
        .json(&commit_body)
        .send()
        .await
        .expect("claim request");
    http.post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "bob", "password": DUMMY_PASSWORD_HASH }))
        .send()
        .await
        .expect("login request");

    let create_folder = http
        .post(format!("{}/api/filesystem/createFolder", server.base_url))
        .json(&json!({
            "parentHandle": "0000000000000000",
            "encryptedMetadataB64": "c29tZSBtZXRhZGF0YQ==",
        }))
        .send()
        .await
        .expect("create folder request");
    assert_eq!(create_folder.status(), 200);
    let folder: serde_json::Value = create_folder.json().await.expect("folder json");
    let folder_handle = folder["handle"].as_str().expect("handle present").to_string();
    assert_eq!(folder_handle.len(), 16);

    let listing = http
        .post(format!("{}/api/getfilesystem", server.base_url))
        .json(&json!({ "handle": "0000000000000000" }))
        .send()
        .await
        .expect("listing request");
    assert_eq!(listing.status(), 200);
    let listing_body: serde_json::Value = listing.json().await.expect("listing json");
    let entries = listing_body["data"].as_array().expect("data array");
    assert!(entries.iter().any(|e| e["handle"] == json!(folder_handle)));
    assert_eq!(entries[0]["isFolder"], json!(true));

    let start_upload = http
        .post(format!("{}/api/transfer/startupload", server.base_url))
        .json(&json!({ "fileSize": 10u64 }))
        .send()
        .await
        .expect("start upload request");
    assert_eq!(start_upload.status(), 200);
    let upload_handle = start_upload
        .json::<serde_json::Value>()
        .await
        .expect("start upload json")["handle"]
        .as_str()
        .expect("upload handle")
        .to_string();

    let cancel = http
        .post(format!("{}/api/transfer/cancelupload", server.base_url))
        .json(&json!({ "handle": upload_handle }))
        .send()
        .await
        .expect("cancel upload request");
    assert_eq!(cancel.status(), 200);

    server.shutdown().await;
}
