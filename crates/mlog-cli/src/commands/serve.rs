//! Serve command: HTTP query service.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use mlog_db::Database;
use mlog_web::{AppState, SharedStore};

pub fn run(db: Database, addr: SocketAddr, default_threshold: u64) -> Result<()> {
    let store: SharedStore = Arc::new(Mutex::new(db));
    let state = AppState::new(store, default_threshold);

    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime
        .block_on(mlog_web::serve(addr, state))
        .with_context(|| format!("HTTP server on {addr} failed"))
}
