//! Spins up a real `strongbox-server` gateway on an ephemeral port, backed
//! by a temporary catalog and storage tree, for end-to-end HTTP tests.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use strongbox_core::model::Salt;
use strongbox_server::server::GatewayServer;
use strongbox_server::{AppContext, Config};
use tempfile::TempDir;

/// 64 lowercase-hex characters: the shape `login`/`claimaccount` expect
/// for an already-pre-hashed client password. The exact bytes don't
/// matter to these tests, only that both sides agree on the same value.
pub const DUMMY_PASSWORD_HASH: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2";

pub struct TestServer {
    pub base_url: String,
    pub ctx: Arc<AppContext>,
    _temp_dir: TempDir,
    gateway: Option<GatewayServer>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = Config {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            secure_cookies: false,
            dev_mode: true,
            db_path: temp_dir.path().join("catalog.db"),
            storage_path: temp_dir.path().join("storage"),
            upload_temp_path: temp_dir.path().join("uploads"),
            server_secret: [7u8; 32],
        };
        let ctx = Arc::new(AppContext::build(config).expect("build app context"));
        let gateway = GatewayServer::start(Arc::clone(&ctx)).await.expect("start gateway");
        let base_url = format!("http://{}", gateway.addr);

        Self {
            base_url,
            ctx,
            _temp_dir: temp_dir,
            gateway: Some(gateway),
        }
    }

    /// Reserve an account directly against the catalog (bypassing HTTP,
    /// since reservation is an admin-console operation, not a route) and
    /// return its claim code.
    pub fn reserve_account(&self, quota_bytes: u64) -> String {
        let salts = (Salt::random(), Salt::random(), Salt::random());
        self.ctx
            .catalog
            .reserve_account(quota_bytes, salts)
            .expect("reserve account")
    }

    pub async fn shutdown(mut self) {
        if let Some(gateway) = self.gateway.take() {
            gateway.stop().await;
        }
    }
}

/// Placeholder sealed-key / public-key bytes for `claimaccount`'s four
/// base64 key fields; their content is opaque to the server.
pub fn dummy_keypair_fields() -> [(&'static str, String); 4] {
    use base64::Engine;
    let sealed = base64::engine::general_purpose::STANDARD.encode([0u8; 72]);
    let public = base64::engine::general_purpose::STANDARD.encode([1u8; 32]);
    [
        ("ed25519PrivateKeyEncryptedB64", sealed.clone()),
        ("ed25519PublicKeyB64", public.clone()),
        ("x25519PrivateKeyEncryptedB64", sealed),
        ("x25519PublicKeyB64", public),
    ]
}
