//! Shared state for multi-threaded architecture.
//!
//! Provides thread-safe shared state between:
//! - Feed thread (inbound samples, selection, graph edits)
//! - Guidance thread (periodic tick, command sending)
//! - Main thread (status monitoring, shutdown)
//!
//! Lock order is graph before controller. The guidance thread only ever
//! takes the controller lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{
    Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::Duration;

use crate::error::Result;
use crate::graph::GraphStore;
use crate::guidance::GuidanceController;

/// Shared state between all threads.
pub struct SharedState {
    /// Location graph
    graph: RwLock<GraphStore>,

    /// Guidance session, the single mutex for session state
    controller: Mutex<GuidanceController>,

    /// Signalled when selection, graph or shutdown state changes
    wake: Condvar,

    /// Snapshot file that graph edits are written back to
    persist_path: Option<PathBuf>,

    /// Shutdown signal for graceful termination
    pub shutdown: AtomicBool,

    /// Feed messages applied
    pub feed_messages: AtomicU64,

    /// Feed lines that failed to parse or apply
    pub rejected_messages: AtomicU64,

    /// Commands delivered to the sink
    pub commands_sent: AtomicU64,

    /// Sends that failed
    pub sink_failures: AtomicU64,

    /// Connected feed clients
    pub feed_clients: AtomicU32,
}

impl SharedState {
    /// Create new shared state.
    pub fn new(
        graph: GraphStore,
        controller: GuidanceController,
        persist_path: Option<PathBuf>,
    ) -> Self {
        Self {
            graph: RwLock::new(graph),
            controller: Mutex::new(controller),
            wake: Condvar::new(),
            persist_path,
            shutdown: AtomicBool::new(false),
            feed_messages: AtomicU64::new(0),
            rejected_messages: AtomicU64::new(0),
            commands_sent: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            feed_clients: AtomicU32::new(0),
        }
    }

    /// Read access to the graph.
    pub fn graph(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the graph.
    pub fn graph_mut(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the guidance controller.
    pub fn controller(&self) -> MutexGuard<'_, GuidanceController> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while the controller is idle.
    ///
    /// Returns `None` on shutdown. Wakes at least every `max_wait` so the
    /// shutdown flag is observed even without a notification.
    pub fn wait_until_active(
        &self,
        max_wait: Duration,
    ) -> Option<MutexGuard<'_, GuidanceController>> {
        let mut guard = self.controller();
        while !guard.is_active() {
            if self.should_shutdown() {
                return None;
            }
            guard = self
                .wake
                .wait_timeout(guard, max_wait)
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        if self.should_shutdown() {
            return None;
        }
        Some(guard)
    }

    /// Wake the guidance thread after a state change.
    pub fn notify(&self) {
        self.wake.notify_all();
    }

    /// Write the graph back to its snapshot file, if persistence is enabled.
    pub fn persist_graph(&self, graph: &GraphStore) -> Result<()> {
        if let Some(path) = &self.persist_path {
            graph.save(path)?;
        }
        Ok(())
    }

    /// Signal shutdown.
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.notify();
    }

    /// Check if shutdown is signaled.
    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Log a one-line status summary.
    pub fn log_status(&self) {
        let (state, progress, last) = {
            let controller = self.controller();
            (
                controller.state(),
                controller.session().progress_percent,
                controller.session().last_command,
            )
        };

        tracing::info!(
            "Status: {:?}, progress {:.1}%, last command {}, {} feed msgs ({} rejected), {} sent ({} failed), {} client(s)",
            state,
            progress,
            last.map(|c| c.name()).unwrap_or("none"),
            self.feed_messages.load(Ordering::Relaxed),
            self.rejected_messages.load(Ordering::Relaxed),
            self.commands_sent.load(Ordering::Relaxed),
            self.sink_failures.load(Ordering::Relaxed),
            self.feed_clients.load(Ordering::Relaxed),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Location, Point};
    use std::sync::Arc;
    use std::time::Instant;

    fn create_state() -> SharedState {
        let graph = GraphStore::from_parts(
            vec![
                Location::new("a", "Lobby", Point::new(0.0, 0.0)),
                Location::new("b", "Office", Point::new(5.0, 0.0)),
            ],
            vec![Edge::new("e", "a", "b")],
        )
        .unwrap();
        SharedState::new(graph, GuidanceController::with_defaults(), None)
    }

    #[test]
    fn test_wait_returns_none_on_shutdown() {
        let state = Arc::new(create_state());
        let waiter = Arc::clone(&state);

        let handle = std::thread::spawn(move || {
            waiter
                .wait_until_active(Duration::from_secs(10))
                .is_none()
        });

        std::thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        state.signal_shutdown();
        assert!(handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_wakes_when_route_selected() {
        let state = Arc::new(create_state());
        let waiter = Arc::clone(&state);

        let handle = std::thread::spawn(move || {
            waiter
                .wait_until_active(Duration::from_secs(10))
                .map(|c| c.is_active())
        });

        std::thread::sleep(Duration::from_millis(50));
        {
            let graph = state.graph();
            let mut controller = state.controller();
            controller.select_start(Some("a".into()), &graph);
            controller.select_end(Some("b".into()), &graph);
        }
        state.notify();

        assert_eq!(handle.join().unwrap(), Some(true));
    }
}
