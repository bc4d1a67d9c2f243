pub mod bridge;
pub mod classify;
mod db;
pub mod demo;
pub mod error;
pub mod history;
pub mod models;
pub mod sensing;
pub mod server;
pub mod service;
pub mod settings;
pub mod summary;
pub mod timer;
mod utils;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};

pub use db::Database;
pub use error::{FocusError, FocusResult};
pub use service::FocusService;

use demo::SyntheticCamera;
use settings::SettingsStore;

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let level = if settings::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    log::info!("Spirit Companion starting up...");

    let data_dir = settings::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_store = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
    log::info!("Settings loaded from {}", settings_store.path().display());
    let current = settings_store.current();
    let addr: SocketAddr = current
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {:?}", current.bind_addr))?;

    let database = Database::new(data_dir.join("spirit.sqlite3"))?;
    let service = FocusService::new(
        database,
        settings_store,
        Arc::new(SyntheticCamera::default()),
        Box::new(demo::classifier(&current)),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("spirit-runtime")
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(server::serve(service, addr))
}
