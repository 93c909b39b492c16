//! The constructed application context threaded through every handler,
//! replacing the process-wide `database`/`env` singletons a naive port
//! would reach for.

use std::sync::Arc;
use std::time::Duration;

use strongbox_auth::ratelimit::RateLimiter;
use strongbox_auth::Authenticator;
use strongbox_catalog::Catalog;
use strongbox_core::{AUTH_RATE_LIMIT_REQUESTS, AUTH_RATE_LIMIT_WINDOW_SECS};
use strongbox_download::DownloadStreamer;
use strongbox_upload::UploadCoordinator;

use crate::config::Config;

pub struct AppContext {
    pub catalog: Arc<Catalog>,
    pub auth: Authenticator,
    pub upload: UploadCoordinator,
    pub download: DownloadStreamer,
    pub rate_limiter: RateLimiter,
    pub config: Config,
}

impl AppContext {
    pub fn build(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.storage_path)?;
        std::fs::create_dir_all(&config.upload_temp_path)?;

        let catalog = Arc::new(Catalog::open(&config.db_path)?);
        let auth = Authenticator::new(Arc::clone(&catalog), config.server_secret);
        let upload = UploadCoordinator::new(
            Arc::clone(&catalog),
            config.upload_temp_path.clone(),
            config.storage_path.clone(),
        );
        let download = DownloadStreamer::new(Arc::clone(&catalog), config.storage_path.clone());
        let rate_limiter = RateLimiter::new(
            AUTH_RATE_LIMIT_REQUESTS,
            Duration::from_secs(AUTH_RATE_LIMIT_WINDOW_SECS),
        );

        Ok(Self {
            catalog,
            auth,
            upload,
            download,
            rate_limiter,
            config,
        })
    }
}
