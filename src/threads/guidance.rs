//! Guidance thread: periodic tick and command delivery.
//!
//! Sleeps on the shared condition variable while the controller is idle.
//! While active it ticks every `tick_interval`; the command is taken out of
//! the controller under the lock and sent after the lock is released.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::guidance::GuidanceCommand;
use crate::shared::SharedState;
use crate::sink::CommandSink;

/// Longest wait between shutdown checks while idle.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Guidance thread state and logic.
pub struct GuidanceThread {
    shared_state: Arc<SharedState>,
    sink: Box<dyn CommandSink>,
    tick_interval: Duration,
}

impl GuidanceThread {
    /// Create a new guidance thread.
    pub fn new(
        shared_state: Arc<SharedState>,
        sink: Box<dyn CommandSink>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            shared_state,
            sink,
            tick_interval,
        }
    }

    /// Run the guidance thread main loop.
    pub fn run(&mut self) {
        tracing::info!(
            "Guidance thread started, sending to {}",
            self.sink.describe()
        );

        while let Some(command) = self.next_command() {
            if let Some(command) = command {
                self.deliver(command);
            }
            std::thread::sleep(self.tick_interval);
        }

        tracing::info!("Guidance thread shutting down");
    }

    /// Wait for an active session and tick it once.
    ///
    /// Outer `None` means shutdown.
    fn next_command(&self) -> Option<Option<GuidanceCommand>> {
        let mut controller = self.shared_state.wait_until_active(IDLE_WAIT)?;
        Some(controller.on_tick(Instant::now()))
    }

    fn deliver(&mut self, command: GuidanceCommand) {
        match self.sink.send(command) {
            Ok(()) => {
                self.shared_state
                    .commands_sent
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Sent {} ({})", command, command.code());
            }
            Err(e) => {
                self.shared_state
                    .sink_failures
                    .fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Failed to send {}: {}", command, e);
            }
        }
    }
}
