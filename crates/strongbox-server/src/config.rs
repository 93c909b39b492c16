//! Application configuration, merged from defaults, `.env`, the process
//! environment, and CLI flags, in that order of increasing precedence.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use clap::Parser;

const DEFAULT_PORT: u16 = 8080;

/// Command-line overrides layered on top of environment configuration.
#[derive(Parser, Debug, Default)]
#[command(name = "strongbox-server", about = "Encrypted file storage gateway")]
pub struct ServerArgs {
    /// Listen on this port, overriding `PORT`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Shorthand for disabling secure cookies and verbose-logging prod
    /// safeguards, overriding `DEVELOPMENT_MODE`.
    #[arg(long)]
    pub dev: bool,

    /// Explicitly set the `Secure` flag on session cookies, overriding
    /// both `SECURE_COOKIES` and `--dev`.
    #[arg(long)]
    pub securecookies: Option<bool>,

    /// Increase log verbosity; repeat for more (`-v`, `-vv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: IpAddr,
    pub port: u16,
    pub secure_cookies: bool,
    pub dev_mode: bool,
    pub db_path: PathBuf,
    pub storage_path: PathBuf,
    pub upload_temp_path: PathBuf,
    pub server_secret: [u8; 32],
}

impl Config {
    /// Build a [`Config`] from `.env`, the environment, and `args`, in
    /// that precedence order. Reads `.env` relative to the current
    /// working directory if present; its absence is not an error.
    pub fn load(args: &ServerArgs) -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !matches!(err, dotenvy::Error::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound)
            {
                tracing::warn!(%err, "failed to load .env");
            }
        }

        let env_dev_mode = env_bool("DEVELOPMENT_MODE").unwrap_or(false);
        let dev_mode = args.dev || env_dev_mode;

        let env_secure_cookies = env_bool("SECURE_COOKIES").unwrap_or(!dev_mode);
        let secure_cookies = args
            .securecookies
            .unwrap_or(if dev_mode { false } else { env_secure_cookies });

        let port = args
            .port
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        let db_path = env_path("USER_DATABASE_FILE_PATH", "data/databases/userdata.db");
        let storage_path = env_path("USER_FILE_STORAGE_PATH", "data/userfiles");
        let upload_temp_path = env_path("USER_UPLOAD_TEMPORARY_STORAGE_PATH", "data/uploads");

        let server_secret = load_secret(dev_mode)?;

        Ok(Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            secure_cookies,
            dev_mode,
            db_path,
            storage_path,
            upload_temp_path,
            server_secret,
        })
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

/// `SECRET` must decode to at least 64 raw bytes of hex; the keyed-hash
/// routines only need 32, so the decoded secret is folded down with
/// `blake3` rather than truncated, so every byte the operator supplied
/// contributes to the derived key.
fn load_secret(dev_mode: bool) -> anyhow::Result<[u8; 32]> {
    match std::env::var("SECRET") {
        Ok(hex_secret) => {
            let raw = hex::decode(hex_secret.trim())
                .map_err(|e| anyhow::anyhow!("SECRET is not valid hex: {e}"))?;
            if raw.len() < 64 {
                anyhow::bail!("SECRET must decode to at least 64 bytes, got {}", raw.len());
            }
            Ok(*blake3::hash(&raw).as_bytes())
        }
        Err(_) if dev_mode => {
            tracing::warn!("no SECRET set; using an ephemeral development secret");
            Ok(*blake3::hash(b"strongbox-development-secret").as_bytes())
        }
        Err(_) => anyhow::bail!("SECRET is required outside development mode"),
    }
}
