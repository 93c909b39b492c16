//! The request gateway (C5) and quota/lifecycle management (C6): wires
//! `strongbox-auth`/`-upload`/`-download`/`-catalog` behind a hand-rolled
//! `hyper` HTTP surface, plus the background sweepers and admin console
//! that round out the service.

pub mod body;
pub mod config;
pub mod context;
pub mod cookies;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod lifecycle;
pub mod quota;
pub mod response;
pub mod router;
pub mod server;

pub use config::{Config, ServerArgs};
pub use context::AppContext;

/// Install a `tracing` subscriber whose verbosity follows `-v`/`-vv` (or
/// `RUST_LOG` if set), writing to stderr so stdout stays free for piped
/// output.
pub fn setup_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_filter = match verbose {
        0 => "strongbox_server=info,strongbox_auth=info,strongbox_catalog=info,strongbox_upload=info,strongbox_download=info,warn",
        1 => "strongbox_server=debug,strongbox_auth=debug,strongbox_catalog=debug,strongbox_upload=debug,strongbox_download=debug,info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
