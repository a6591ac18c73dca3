//! Guidance controller: turns a route and a live heading into steering commands.
//!
//! Owns the guidance session explicitly. Event handlers (`on_feed_message`,
//! selection and graph changes) update the session; the periodic timer calls
//! `on_tick`, which compares the effective heading against the target bearing
//! and emits at most one command per dwell interval.

use std::time::{Duration, Instant};

use crate::graph::{GraphStore, Point};
use crate::planning::{PlannedRoute, RouteGeometry, find_path, plan_bearing_on, progress_on};
use crate::utils::{normalize_180, normalize_degrees};

use super::command::GuidanceCommand;

/// Configuration for the guidance controller.
#[derive(Clone, Debug)]
pub struct GuidanceConfig {
    /// Minimum interval between emitted commands
    pub dwell: Duration,
    /// How far ahead of the current progress the target bearing looks (percent of route)
    pub lookahead_percent: f64,
    /// Initial calibration offset added to the sensed heading (degrees)
    pub calibration_offset_deg: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(3000),
            lookahead_percent: 5.0,
            calibration_offset_deg: 0.0,
        }
    }
}

/// Controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuidanceState {
    /// No complete selection, or no route between the selected locations
    Idle,
    /// Route found, commands are being issued
    Active,
}

/// Result of (re)planning after a selection or graph change.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteStatus {
    /// Start or end not selected
    Incomplete,
    /// Route found
    Active { hops: usize, distance: f64 },
    /// Both endpoints selected but no route connects them
    Unreachable,
}

/// Selected route endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// One message from the position/heading feed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedSample {
    pub heading_degrees: f64,
    pub position: Point,
}

/// Route currently being followed.
#[derive(Clone, Debug)]
pub struct ActiveRoute {
    pub route: PlannedRoute,
    pub geometry: RouteGeometry,
}

/// Transient guidance session.
///
/// The latest sensor sample survives selection changes; everything derived
/// from the route is reset. The dwell timer only resets with the selection.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    /// Latest sensed heading (degrees, [0, 360))
    pub live_heading_deg: Option<f64>,
    /// Latest sensed position
    pub live_position: Option<Point>,
    /// Correction added to the sensed heading (degrees)
    pub calibration_offset_deg: f64,
    /// Direction the walker should face (degrees, [0, 360))
    pub target_bearing_deg: Option<f64>,
    /// Route progress in [0, 100]
    pub progress_percent: f64,
    /// Closest route point to the live position
    pub projected: Option<Point>,
    /// Lookahead point the target bearing aims at
    pub forward_point: Option<Point>,
    /// When the last command was emitted
    pub last_command_at: Option<Instant>,
    /// Last emitted command
    pub last_command: Option<GuidanceCommand>,
}

impl SessionState {
    /// Clear everything derived from the route.
    fn reset_route_state(&mut self) {
        self.target_bearing_deg = None;
        self.progress_percent = 0.0;
        self.projected = None;
        self.forward_point = None;
    }

    /// Forget the last emission so the next command goes out immediately.
    fn reset_dwell(&mut self) {
        self.last_command_at = None;
        self.last_command = None;
    }
}

/// Guidance controller state machine.
pub struct GuidanceController {
    config: GuidanceConfig,
    selection: Selection,
    route: Option<ActiveRoute>,
    session: SessionState,
    state: GuidanceState,
}

impl GuidanceController {
    /// Create a new controller in the idle state.
    pub fn new(config: GuidanceConfig) -> Self {
        let session = SessionState {
            calibration_offset_deg: config.calibration_offset_deg,
            ..Default::default()
        };

        Self {
            config,
            selection: Selection::default(),
            route: None,
            session,
            state: GuidanceState::Idle,
        }
    }

    /// Create a new controller with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(GuidanceConfig::default())
    }

    pub fn state(&self) -> GuidanceState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == GuidanceState::Active
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn route(&self) -> Option<&ActiveRoute> {
        self.route.as_ref()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Sensed heading plus calibration offset, normalized.
    pub fn effective_heading(&self) -> Option<f64> {
        self.session
            .live_heading_deg
            .map(|h| normalize_degrees(h + self.session.calibration_offset_deg))
    }

    /// Signed difference from effective heading to target bearing, in (-180, 180].
    ///
    /// Positive means the target lies counter-clockwise (to the left).
    pub fn heading_error(&self) -> Option<f64> {
        let target = self.session.target_bearing_deg?;
        let heading = self.effective_heading()?;
        Some(normalize_180(target - heading))
    }

    /// Select (or deselect with `None`) the start location.
    pub fn select_start(&mut self, start: Option<String>, graph: &GraphStore) -> RouteStatus {
        self.selection.start = start;
        self.session.reset_dwell();
        self.replan(graph)
    }

    /// Select (or deselect with `None`) the end location.
    pub fn select_end(&mut self, end: Option<String>, graph: &GraphStore) -> RouteStatus {
        self.selection.end = end;
        self.session.reset_dwell();
        self.replan(graph)
    }

    /// Replace both endpoints at once.
    pub fn set_selection(&mut self, selection: Selection, graph: &GraphStore) -> RouteStatus {
        self.selection = selection;
        self.session.reset_dwell();
        self.replan(graph)
    }

    /// Deselect both endpoints and go idle.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
        self.route = None;
        self.session.reset_route_state();
        self.session.reset_dwell();
        self.state = GuidanceState::Idle;
        tracing::info!("Selection cleared, guidance idle");
    }

    /// Change the heading calibration offset.
    ///
    /// Progress and bearing are recomputed from the latest sample. The dwell
    /// timer keeps running.
    pub fn set_calibration(&mut self, offset_deg: f64) {
        self.session.calibration_offset_deg = offset_deg;
        self.session.reset_route_state();
        self.refresh_progress();
        tracing::info!("Calibration offset set to {:.1}°", offset_deg);
    }

    /// Recompute the route against a new graph snapshot.
    ///
    /// The dwell timer keeps running, so edits cannot force an early command.
    pub fn on_graph_changed(&mut self, graph: &GraphStore) -> RouteStatus {
        self.replan(graph)
    }

    /// Store a feed sample as the latest heading and position.
    pub fn on_feed_message(&mut self, sample: FeedSample) {
        self.session.live_heading_deg = Some(normalize_degrees(sample.heading_degrees));
        self.session.live_position = Some(sample.position);
        self.refresh_progress();
    }

    /// Store a heading-only sample; position stays as last reported.
    pub fn on_heading(&mut self, heading_degrees: f64) {
        self.session.live_heading_deg = Some(normalize_degrees(heading_degrees));
    }

    /// Periodic control step.
    ///
    /// Returns the command to send, if any. The emission time is recorded
    /// before the command is handed out, so dwell runs from send time.
    pub fn on_tick(&mut self, now: Instant) -> Option<GuidanceCommand> {
        if self.state != GuidanceState::Active {
            return None;
        }

        let diff = self.heading_error()?;

        if let Some(last) = self.session.last_command_at
            && now.saturating_duration_since(last) < self.config.dwell
        {
            return None;
        }

        let command = GuidanceCommand::from_angle_diff(diff);
        self.session.last_command_at = Some(now);
        self.session.last_command = Some(command);

        tracing::debug!(
            "tick: target={:.1}°, heading={:.1}°, diff={:.1}° -> {}",
            self.session.target_bearing_deg.unwrap_or_default(),
            self.effective_heading().unwrap_or_default(),
            diff,
            command
        );

        Some(command)
    }

    /// Recompute the route for the current selection. Leaves the dwell timer alone.
    fn replan(&mut self, graph: &GraphStore) -> RouteStatus {
        self.session.reset_route_state();
        self.route = None;
        self.state = GuidanceState::Idle;

        let (Some(start), Some(end)) = (&self.selection.start, &self.selection.end) else {
            return RouteStatus::Incomplete;
        };

        let planned = find_path(start, end, graph.locations(), graph.edges()).and_then(|route| {
            RouteGeometry::from_path(&route.nodes, &graph.coordinates())
                .map(|geometry| ActiveRoute { route, geometry })
        });

        let Some(active) = planned else {
            tracing::warn!("No route from {} to {}", start, end);
            return RouteStatus::Unreachable;
        };

        let status = RouteStatus::Active {
            hops: active.route.nodes.len().saturating_sub(1),
            distance: active.route.distance,
        };
        tracing::info!(
            "Route {} -> {}: {} locations, distance {:.4}",
            start,
            end,
            active.route.nodes.len(),
            active.route.distance
        );

        self.route = Some(active);
        self.state = GuidanceState::Active;
        self.refresh_progress();
        status
    }

    /// Update progress and target bearing from the latest position.
    ///
    /// When the bearing is degenerate (end of route, zero-length route) the
    /// last target bearing is kept.
    fn refresh_progress(&mut self) {
        let (Some(active), Some(position)) = (&self.route, self.session.live_position) else {
            return;
        };

        let progress = progress_on(&active.geometry, position);
        self.session.progress_percent = progress.percent;
        self.session.projected = progress.projected;

        if let Some(plan) =
            plan_bearing_on(&active.geometry, progress.percent, self.config.lookahead_percent)
        {
            self.session.target_bearing_deg = Some(plan.bearing_degrees);
            self.session.forward_point = Some(plan.forward_point);
        }
    }
}
