//! Feed thread: accepts feed clients and applies their messages.
//!
//! Polls a non-blocking listener and every connected client. Each complete
//! line is parsed and applied under the graph/controller locks. Malformed
//! lines are logged and dropped; the client stays connected.

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::{MargaError, Result};
use crate::feed::{ControlMessage, InboundMessage, MAX_LINE_LEN, parse_line};
use crate::graph::{GraphStore, Point};
use crate::planning::nearest_location;
use crate::shared::SharedState;

/// Poll period when no client has data.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Which endpoint a selection message targets.
#[derive(Clone, Copy, Debug)]
enum Endpoint {
    Start,
    End,
}

struct FeedClient {
    stream: TcpStream,
    peer: SocketAddr,
    pending: Vec<u8>,
}

impl FeedClient {
    /// Read whatever is available. Returns false once the client is gone.
    fn poll(&mut self, shared: &SharedState, graph_path: &Path, scratch: &mut [u8]) -> bool {
        loop {
            match self.stream.read(scratch) {
                Ok(0) => return false,
                Ok(n) => {
                    self.pending.extend_from_slice(&scratch[..n]);
                    self.drain_lines(shared, graph_path);
                    if self.pending.len() > MAX_LINE_LEN {
                        tracing::warn!("Feed client {} sent an oversized line, dropping", self.peer);
                        return false;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return true,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Feed client {} read error: {}", self.peer, e);
                    return false;
                }
            }
        }
    }

    fn drain_lines(&mut self, shared: &SharedState, graph_path: &Path) {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);

            let result = parse_line(&line).and_then(|msg| match msg {
                Some(msg) => apply_message(shared, graph_path, msg),
                None => Ok(()),
            });

            match result {
                Ok(()) => {
                    shared.feed_messages.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    shared.rejected_messages.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Feed client {}: {}", self.peer, e);
                }
            }
        }
    }
}

/// Feed thread state and logic.
pub struct FeedThread {
    shared_state: Arc<SharedState>,
    listener: TcpListener,
    graph_path: PathBuf,
    clients: Vec<FeedClient>,
}

impl FeedThread {
    /// Create a feed thread around an already-bound listener.
    pub fn new(
        shared_state: Arc<SharedState>,
        listener: TcpListener,
        graph_path: PathBuf,
    ) -> Result<Self> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            shared_state,
            listener,
            graph_path,
            clients: Vec::new(),
        })
    }

    /// Run the feed thread main loop.
    pub fn run(&mut self) {
        let mut scratch = vec![0u8; 4096];
        tracing::info!("Feed thread started");

        while !self.shared_state.should_shutdown() {
            self.accept_clients();

            let shared = &self.shared_state;
            let graph_path = &self.graph_path;
            self.clients.retain_mut(|client| {
                let alive = client.poll(shared, graph_path, &mut scratch);
                if !alive {
                    tracing::info!("Feed client disconnected: {}", client.peer);
                    shared.feed_clients.fetch_sub(1, Ordering::Relaxed);
                }
                alive
            });

            std::thread::sleep(IDLE_POLL);
        }

        tracing::info!("Feed thread shutting down");
    }

    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        tracing::warn!("Failed to set nonblocking mode for {}: {}", peer, e);
                        continue;
                    }
                    tracing::info!("Feed client connected: {}", peer);
                    self.shared_state.feed_clients.fetch_add(1, Ordering::Relaxed);
                    self.clients.push(FeedClient {
                        stream,
                        peer,
                        pending: Vec::new(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::error!("Error accepting feed client: {}", e);
                    return;
                }
            }
        }
    }
}

/// Apply one inbound message to the shared session.
///
/// `graph_path` is the snapshot re-read by `reload_graph`.
pub fn apply_message(
    shared: &SharedState,
    graph_path: &Path,
    message: InboundMessage,
) -> Result<()> {
    match message {
        InboundMessage::Sample(sample) => {
            shared.controller().on_feed_message(sample.into());
        }
        InboundMessage::Heading(heading) => {
            shared.controller().on_heading(heading);
        }
        InboundMessage::Control(control) => apply_control(shared, graph_path, control)?,
    }
    Ok(())
}

fn apply_control(shared: &SharedState, graph_path: &Path, control: ControlMessage) -> Result<()> {
    match control {
        ControlMessage::SelectStart { location_id } => {
            select(shared, Endpoint::Start, Some(location_id))?;
        }
        ControlMessage::SelectEnd { location_id } => {
            select(shared, Endpoint::End, Some(location_id))?;
        }
        ControlMessage::ClearStart => select(shared, Endpoint::Start, None)?,
        ControlMessage::ClearEnd => select(shared, Endpoint::End, None)?,
        ControlMessage::ClearSelection => {
            shared.controller().clear_selection();
        }
        ControlMessage::SnapStart { coordinates } => snap(shared, Endpoint::Start, coordinates)?,
        ControlMessage::SnapEnd { coordinates } => snap(shared, Endpoint::End, coordinates)?,
        ControlMessage::Calibrate { offset_degrees } => {
            if !offset_degrees.is_finite() {
                return Err(MargaError::Protocol("Calibration offset must be finite".into()));
            }
            shared.controller().set_calibration(offset_degrees);
        }
        ControlMessage::ReloadGraph => {
            *shared.graph_mut() = GraphStore::load(graph_path)?;
            replan(shared);
        }
        ControlMessage::AddLocation { name, coordinates } => {
            edit_graph(shared, |graph| {
                let id = graph.add_location(name.as_str(), coordinates);
                tracing::info!("Added location {} '{}'", id, name);
                Ok(())
            })?;
        }
        ControlMessage::RemoveLocation { location_id } => {
            edit_graph(shared, |graph| {
                let removed = graph.remove_location(&location_id)?;
                tracing::info!("Removed location {} and {} edge(s)", location_id, removed);
                Ok(())
            })?;
        }
        ControlMessage::AddEdge { from, to } => {
            edit_graph(shared, |graph| {
                let id = graph.add_edge(&from, &to)?;
                tracing::info!("Added edge {} between {} and {}", id, from, to);
                Ok(())
            })?;
        }
        ControlMessage::RemoveEdge { edge_id } => {
            edit_graph(shared, |graph| {
                graph.remove_edge(&edge_id)?;
                tracing::info!("Removed edge {}", edge_id);
                Ok(())
            })?;
        }
    }

    shared.notify();
    Ok(())
}

fn select(shared: &SharedState, endpoint: Endpoint, id: Option<String>) -> Result<()> {
    let graph = shared.graph();
    if let Some(id) = &id
        && graph.location(id).is_none()
    {
        return Err(MargaError::Graph(format!("Unknown location '{}'", id)));
    }

    let mut controller = shared.controller();
    let status = match endpoint {
        Endpoint::Start => controller.select_start(id, &graph),
        Endpoint::End => controller.select_end(id, &graph),
    };
    tracing::debug!("Selection {:?} changed: {:?}", endpoint, status);
    Ok(())
}

fn snap(shared: &SharedState, endpoint: Endpoint, point: Point) -> Result<()> {
    let id = {
        let graph = shared.graph();
        let location = nearest_location(point, graph.locations()).ok_or_else(|| {
            MargaError::Graph("No eligible location to snap to".into())
        })?;
        tracing::info!(
            "Snapped ({:.5}, {:.5}) to {} '{}'",
            point.x,
            point.y,
            location.id,
            location.name
        );
        location.id.clone()
    };
    select(shared, endpoint, Some(id))
}

/// Mutate the graph, persist it and replan the active route.
fn edit_graph<F>(shared: &SharedState, edit: F) -> Result<()>
where
    F: FnOnce(&mut GraphStore) -> Result<()>,
{
    {
        let mut graph = shared.graph_mut();
        edit(&mut graph)?;
        if let Err(e) = shared.persist_graph(&graph) {
            tracing::error!("Failed to persist graph: {}", e);
        }
    }
    replan(shared);
    Ok(())
}

fn replan(shared: &SharedState) {
    let graph = shared.graph();
    let status = shared.controller().on_graph_changed(&graph);
    tracing::debug!("Graph changed, route status: {:?}", status);
}
