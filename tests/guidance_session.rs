//! End-to-end guidance sessions on the sample floor.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use marga_nav::config::MargaConfig;
use marga_nav::graph::{GraphStore, Point};
use marga_nav::guidance::{
    FeedSample, GuidanceCommand, GuidanceConfig, GuidanceController, GuidanceState, RouteStatus,
};
use marga_nav::planning::{find_path, nearest_location};
use marga_nav::shared::SharedState;
use marga_nav::sink::{SinkFormat, TcpCommandSink};
use marga_nav::threads::spawn_threads;

const ENTRANCE: &str = "1716400000001";
const ROOM_101: &str = "1716400000007";

fn sample_floor_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("maps/sample_floor.json")
}

fn load_sample_floor() -> GraphStore {
    GraphStore::load(&sample_floor_path()).unwrap()
}

fn sample(heading: f64, x: f64, y: f64) -> FeedSample {
    FeedSample {
        heading_degrees: heading,
        position: Point::new(x, y),
    }
}

#[test]
fn test_route_through_corridor() {
    let graph = load_sample_floor();
    let route = find_path(ENTRANCE, ROOM_101, graph.locations(), graph.edges()).unwrap();

    assert_eq!(
        route.nodes,
        vec![
            ENTRANCE,
            "1716400000002",
            "1716400000003",
            "1716400000004",
            ROOM_101
        ]
    );
    assert!((route.distance - 38.0).abs() < 1e-9);
}

#[test]
fn test_search_and_snap_skip_structural_locations() {
    let graph = load_sample_floor();

    let all: Vec<&str> = graph.search("").iter().map(|l| l.name.as_str()).collect();
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|n| !n.contains("door") && !n.contains("hallway")));

    let rooms = graph.search("ROOM");
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, ROOM_101);

    // Standing on the door snaps to the entrance instead
    let nearest = nearest_location(Point::new(4.1, 0.2), graph.locations()).unwrap();
    assert_eq!(nearest.id, ENTRANCE);
}

#[test]
fn test_walk_to_room_101() {
    let graph = load_sample_floor();
    let mut controller = GuidanceController::new(GuidanceConfig::default());

    controller.select_start(Some(ENTRANCE.into()), &graph);
    let status = controller.select_end(Some(ROOM_101.into()), &graph);
    assert!(matches!(status, RouteStatus::Active { hops: 4, .. }));

    let mut now = Instant::now();
    let step = Duration::from_millis(3000);

    // Walking east down the corridor, facing east
    controller.on_feed_message(sample(2.0, 12.0, 0.3));
    assert_eq!(controller.on_tick(now), Some(GuidanceCommand::Straight));

    // Faster ticks inside the dwell window stay silent
    assert_eq!(controller.on_tick(now + Duration::from_millis(500)), None);

    // Approaching the corner, the lookahead already bends south
    now += step;
    controller.on_feed_message(sample(0.0, 29.0, 0.0));
    assert_eq!(controller.on_tick(now), Some(GuidanceCommand::SlightRight));

    // Past the corner still facing east: a hard right
    now += step;
    controller.on_feed_message(sample(0.0, 30.0, -3.0));
    assert_eq!(controller.on_tick(now), Some(GuidanceCommand::HardRight));

    // Turned south
    now += step;
    controller.on_feed_message(sample(272.0, 30.0, -5.0));
    assert_eq!(controller.on_tick(now), Some(GuidanceCommand::Straight));
    assert!(controller.session().progress_percent > 90.0);
}

#[test]
fn test_calibrated_compass() {
    let graph = load_sample_floor();
    let mut controller = GuidanceController::new(GuidanceConfig {
        calibration_offset_deg: -20.0,
        ..Default::default()
    });
    controller.select_start(Some(ENTRANCE.into()), &graph);
    controller.select_end(Some(ROOM_101.into()), &graph);

    // Compass reads 20° but the walker faces east
    controller.on_feed_message(sample(20.0, 12.0, 0.0));
    assert!(controller.effective_heading().unwrap().abs() < 1e-9);
    assert_eq!(
        controller.on_tick(Instant::now()),
        Some(GuidanceCommand::Straight)
    );
}

#[test]
fn test_removing_corridor_stops_guidance() {
    let mut graph = load_sample_floor();
    let mut controller = GuidanceController::new(GuidanceConfig::default());
    controller.select_start(Some(ENTRANCE.into()), &graph);
    controller.select_end(Some(ROOM_101.into()), &graph);
    assert_eq!(controller.state(), GuidanceState::Active);

    let removed = graph.remove_location("1716400000004").unwrap();
    assert_eq!(removed, 3);
    assert_eq!(controller.on_graph_changed(&graph), RouteStatus::Unreachable);

    controller.on_feed_message(sample(0.0, 12.0, 0.0));
    assert_eq!(controller.on_tick(Instant::now()), None);
}

/// Reserve an ephemeral port for a listener bound later.
fn free_local_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

#[test]
fn test_daemon_feed_to_actuator() {
    let actuator = TcpListener::bind("127.0.0.1:0").unwrap();
    let actuator_addr = actuator.local_addr().unwrap().to_string();

    let mut config = MargaConfig::default();
    config.connection.feed_bind = free_local_addr();
    config.connection.sink_addr = Some(actuator_addr.clone());
    config.graph.path = sample_floor_path().to_string_lossy().into_owned();
    config.graph.persist_edits = false;
    config.guidance.tick_interval_ms = 20;

    let graph = load_sample_floor();
    let controller = GuidanceController::new(config.guidance_config());
    let shared = Arc::new(SharedState::new(graph, controller, None));
    let sink = TcpCommandSink::new(&actuator_addr, SinkFormat::Digit, config.timeout()).unwrap();

    let handles = spawn_threads(&config, Arc::clone(&shared), Box::new(sink)).unwrap();

    let mut feed = TcpStream::connect(&config.connection.feed_bind).unwrap();
    writeln!(feed, r#"{{"type": "select_start", "locationId": "{}"}}"#, ENTRANCE).unwrap();
    writeln!(feed, r#"{{"type": "select_end", "locationId": "{}"}}"#, ROOM_101).unwrap();
    // Facing north in the eastbound corridor
    writeln!(feed, r#"{{"headingDegrees": 90.0, "coordinates": [12.0, 0.0]}}"#).unwrap();
    feed.flush().unwrap();

    let (mut conn, _) = actuator.accept().unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut byte = [0u8; 1];
    conn.read_exact(&mut byte).unwrap();
    assert_eq!(byte[0], b'0' + GuidanceCommand::HardRight.code());

    shared.signal_shutdown();
    handles.feed.join().unwrap();
    handles.guidance.join().unwrap();
}
