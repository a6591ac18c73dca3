//! Multi-threaded architecture for MargaNav.
//!
//! Separates concerns into two threads:
//! - Feed thread: inbound samples, selection and graph edits
//! - Guidance thread: periodic tick and command delivery

mod feed;
mod guidance;

pub use feed::{FeedThread, apply_message};
pub use guidance::GuidanceThread;

use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::MargaConfig;
use crate::error::{MargaError, Result};
use crate::shared::SharedState;
use crate::sink::CommandSink;

/// Thread handles for the multi-threaded system.
pub struct ThreadHandles {
    pub feed: JoinHandle<()>,
    pub guidance: JoinHandle<()>,
}

/// Bind the feed listener and spawn all threads.
pub fn spawn_threads(
    config: &MargaConfig,
    shared_state: Arc<SharedState>,
    sink: Box<dyn CommandSink>,
) -> Result<ThreadHandles> {
    let bind_addr = &config.connection.feed_bind;
    let listener = TcpListener::bind(bind_addr).map_err(|e| {
        MargaError::Config(format!("Failed to bind feed listener to {}: {}", bind_addr, e))
    })?;
    tracing::info!("Feed listener bound to {}", bind_addr);

    let mut feed_thread = FeedThread::new(
        Arc::clone(&shared_state),
        listener,
        config.graph_path(),
    )?;
    let feed_handle = thread::Builder::new()
        .name("feed".into())
        .spawn(move || feed_thread.run())?;

    let mut guidance_thread =
        GuidanceThread::new(Arc::clone(&shared_state), sink, config.tick_interval());
    let guidance_handle = thread::Builder::new()
        .name("guidance".into())
        .spawn(move || guidance_thread.run())?;

    Ok(ThreadHandles {
        feed: feed_handle,
        guidance: guidance_handle,
    })
}
