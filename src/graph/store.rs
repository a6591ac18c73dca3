//! In-memory location graph with an explicit mutation boundary.
//!
//! The store owns the "deleting a location deletes every edge touching it"
//! invariant. Snapshots loaded from disk may still contain dangling edges
//! (written by older editors); those are kept and skipped at query time.

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::types::{Edge, Location, Point};
use crate::error::{MargaError, Result};
use crate::planning::nearest::is_structural;

/// On-disk graph snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Location graph store.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    locations: Vec<Location>,
    edges: Vec<Edge>,
    /// Last id handed out, so ids stay unique within one millisecond
    last_id: u64,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-authored parts.
    ///
    /// Duplicate location ids are rejected; dangling edges are tolerated.
    pub fn from_parts(locations: Vec<Location>, edges: Vec<Edge>) -> Result<Self> {
        let mut store = Self::new();
        for location in locations {
            store.insert_location(location)?;
        }
        store.edges = edges;

        let dangling = store.dangling_edge_count();
        if dangling > 0 {
            tracing::warn!(
                "Graph has {} edge(s) referencing missing locations; they will be skipped",
                dangling
            );
        }
        Ok(store)
    }

    /// Load a graph snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MargaError::Graph(format!("Failed to read graph file: {}", e)))?;
        let snapshot: GraphSnapshot = serde_json::from_str(&content)
            .map_err(|e| MargaError::Graph(format!("Failed to parse graph file: {}", e)))?;
        let store = Self::from_parts(snapshot.locations, snapshot.edges)?;
        tracing::info!(
            "Loaded graph from {:?}: {} locations, {} edges",
            path,
            store.locations.len(),
            store.edges.len()
        );
        Ok(store)
    }

    /// Write the graph snapshot to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, content)?;
        tracing::debug!("Graph saved to {:?}", path);
        Ok(())
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            locations: self.locations.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a location by id.
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Map of location id to coordinates.
    pub fn coordinates(&self) -> HashMap<String, Point> {
        self.locations
            .iter()
            .map(|l| (l.id.clone(), l.coordinates))
            .collect()
    }

    /// Number of edges whose endpoints are not both present.
    pub fn dangling_edge_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.nodes.iter().any(|id| self.location(id).is_none()))
            .count()
    }

    /// Create a new location and return its id.
    pub fn add_location(&mut self, name: impl Into<String>, coordinates: Point) -> String {
        let id = self.next_id();
        self.locations.push(Location::new(id.clone(), name, coordinates));
        id
    }

    /// Insert a location with a caller-chosen id.
    pub fn insert_location(&mut self, location: Location) -> Result<()> {
        if self.location(&location.id).is_some() {
            return Err(MargaError::Graph(format!(
                "Duplicate location id '{}'",
                location.id
            )));
        }
        self.locations.push(location);
        Ok(())
    }

    /// Remove a location together with every edge that references it.
    ///
    /// Returns the number of edges removed.
    pub fn remove_location(&mut self, id: &str) -> Result<usize> {
        let before = self.locations.len();
        self.locations.retain(|l| l.id != id);
        if self.locations.len() == before {
            return Err(MargaError::Graph(format!("Unknown location '{}'", id)));
        }

        let edges_before = self.edges.len();
        self.edges.retain(|e| !e.references(id));
        let removed = edges_before - self.edges.len();
        tracing::debug!("Removed location {} and {} edge(s)", id, removed);
        Ok(removed)
    }

    /// Connect two existing locations and return the new edge id.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<String> {
        if from == to {
            return Err(MargaError::Graph(format!(
                "Edge endpoints must differ ('{}')",
                from
            )));
        }
        for id in [from, to] {
            if self.location(id).is_none() {
                return Err(MargaError::Graph(format!("Unknown location '{}'", id)));
            }
        }
        let id = self.next_id();
        self.edges.push(Edge::new(id.clone(), from, to));
        Ok(id)
    }

    /// Remove a single edge.
    pub fn remove_edge(&mut self, id: &str) -> Result<()> {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        if self.edges.len() == before {
            return Err(MargaError::Graph(format!("Unknown edge '{}'", id)));
        }
        Ok(())
    }

    /// Case-insensitive name search over non-structural locations.
    ///
    /// An empty query matches every eligible location.
    pub fn search(&self, query: &str) -> Vec<&Location> {
        let query = query.to_lowercase();
        self.locations
            .iter()
            .filter(|l| !is_structural(&l.name))
            .filter(|l| l.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Generate a unique id from the wall-clock millisecond timestamp.
    fn next_id(&mut self) -> String {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut candidate = now_ms.max(self.last_id + 1);
        while self.location(&candidate.to_string()).is_some()
            || self.edges.iter().any(|e| e.id == candidate.to_string())
        {
            candidate += 1;
        }
        self.last_id = candidate;
        candidate.to_string()
    }
}
