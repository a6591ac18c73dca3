//! MargaNav - Indoor walking guidance daemon
//!
//! Loads a floor graph, listens for position/heading samples and control
//! messages, and drives a directional feedback actuator with one of five
//! steering commands.
//!
//! ## Multi-Threaded Architecture
//!
//! - **Feed Thread**: Accepts feed clients, applies samples, selection
//!   changes and graph edits
//! - **Guidance Thread** (~2Hz): Ticks the guidance controller while a route
//!   is active and sends commands to the actuator
//! - **Main Thread**: Status reporting and shutdown

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info, warn};

use marga_nav::error::{MargaError, Result};
use marga_nav::graph::{GraphStore, Point};
use marga_nav::guidance::{GuidanceController, RouteStatus, Selection};
use marga_nav::planning::{find_path, nearest_location};
use marga_nav::shared::SharedState;
use marga_nav::sink::{CommandSink, LogSink, TcpCommandSink};
use marga_nav::threads::spawn_threads;
use marga_nav::MargaConfig;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG: &str = "marga.toml";

#[derive(Parser, Debug)]
#[command(name = "marga-nav", version)]
#[command(about = "Indoor walking guidance over a location graph")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (default: marga.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Graph snapshot file
    #[arg(short, long, global = true)]
    graph: Option<String>,

    /// Feed listener address
    #[arg(long, global = true)]
    feed_bind: Option<String>,

    /// Actuator address (commands are only logged when unset)
    #[arg(long, global = true)]
    sink: Option<String>,

    /// Start location id
    #[arg(long, global = true)]
    start: Option<String>,

    /// End location id
    #[arg(long, global = true)]
    end: Option<String>,

    /// Heading calibration offset in degrees
    #[arg(long, global = true, allow_hyphen_values = true)]
    calibration: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the guidance daemon (default)
    Run,
    /// Print the shortest route between two locations
    Route {
        /// Start location id
        from: String,
        /// End location id
        to: String,
    },
    /// Search destinations by name
    Search {
        /// Case-insensitive name fragment
        query: String,
    },
    /// Find the destination closest to a map point
    Nearest {
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true)]
        y: f64,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "marga_nav=info"
                    .parse()
                    .map_err(|e| MargaError::Config(format!("Invalid log directive: {}", e)))?,
            ),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config),
        Commands::Route { from, to } => print_route(&config, &from, &to),
        Commands::Search { query } => print_search(&config, &query),
        Commands::Nearest { x, y } => print_nearest(&config, Point::new(x, y)),
    }
}

/// Load the config file and apply command line overrides.
fn load_config(args: &Args) -> Result<MargaConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MargaConfig::load(path)?
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG);
            MargaConfig::load(Path::new(DEFAULT_CONFIG))?
        }
        None => {
            info!("Using default configuration");
            MargaConfig::default()
        }
    };

    if let Some(graph) = &args.graph {
        config.graph.path = graph.clone();
    }
    if let Some(bind) = &args.feed_bind {
        config.connection.feed_bind = bind.clone();
    }
    if let Some(sink) = &args.sink {
        config.connection.sink_addr = Some(sink.clone());
    }
    if let Some(start) = &args.start {
        config.selection.start = Some(start.clone());
    }
    if let Some(end) = &args.end {
        config.selection.end = Some(end.clone());
    }
    if let Some(offset) = args.calibration {
        config.guidance.calibration_offset_deg = offset;
    }

    config.validate()?;
    Ok(config)
}

/// Load the graph snapshot; a missing file starts an empty graph.
fn load_graph(config: &MargaConfig) -> Result<GraphStore> {
    let path = config.graph_path();
    if !path.exists() {
        warn!("Graph file {:?} not found, starting with an empty graph", path);
        return Ok(GraphStore::new());
    }

    GraphStore::load(&path)
}

fn create_sink(config: &MargaConfig) -> Result<Box<dyn CommandSink>> {
    match &config.connection.sink_addr {
        Some(addr) => Ok(Box::new(TcpCommandSink::new(
            addr,
            config.connection.sink_format,
            config.timeout(),
        )?)),
        None => {
            warn!("No sink address configured, commands will only be logged");
            Ok(Box::new(LogSink::new()))
        }
    }
}

/// Forward SIGINT/SIGTERM to the shutdown flag.
fn install_signal_handler(shared_state: Arc<SharedState>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, initiating shutdown...", sig);
                shared_state.signal_shutdown();
            }
        })?;
    Ok(())
}

fn run(config: MargaConfig) -> Result<()> {
    info!("MargaNav v{}", env!("CARGO_PKG_VERSION"));

    let graph = load_graph(&config)?;

    let mut controller = GuidanceController::new(config.guidance_config());
    let selection = Selection {
        start: config.selection.start.clone(),
        end: config.selection.end.clone(),
    };
    match controller.set_selection(selection, &graph) {
        RouteStatus::Active { hops, distance } => {
            info!("Initial route: {} hops, distance {:.4}", hops, distance)
        }
        RouteStatus::Unreachable => warn!("Initial selection has no route"),
        RouteStatus::Incomplete => info!("Waiting for start and end selection"),
    }

    let persist_path = config.graph.persist_edits.then(|| config.graph_path());
    let shared_state = Arc::new(SharedState::new(graph, controller, persist_path));

    let sink = create_sink(&config)?;
    install_signal_handler(Arc::clone(&shared_state))?;

    let handles = spawn_threads(&config, Arc::clone(&shared_state), sink)?;

    // Main thread: Monitor and report status
    let check_interval = Duration::from_millis(200);
    let status_interval = config.status_interval();
    let mut last_status = Instant::now();

    loop {
        thread::sleep(check_interval);

        if shared_state.should_shutdown() {
            break;
        }

        if handles.feed.is_finished() || handles.guidance.is_finished() {
            warn!("A worker thread exited unexpectedly");
            break;
        }

        if !status_interval.is_zero() && last_status.elapsed() >= status_interval {
            shared_state.log_status();
            last_status = Instant::now();
        }
    }

    // Signal shutdown to all threads
    shared_state.signal_shutdown();
    info!("Waiting for threads to finish...");

    if let Err(e) = handles.feed.join() {
        error!("Feed thread panicked: {:?}", e);
    }
    if let Err(e) = handles.guidance.join() {
        error!("Guidance thread panicked: {:?}", e);
    }

    shared_state.log_status();
    info!("MargaNav finished");
    Ok(())
}

fn print_route(config: &MargaConfig, from: &str, to: &str) -> Result<()> {
    let graph = GraphStore::load(&config.graph_path())?;

    for id in [from, to] {
        if graph.location(id).is_none() {
            return Err(MargaError::Graph(format!("Unknown location '{}'", id)));
        }
    }

    match find_path(from, to, graph.locations(), graph.edges()) {
        Some(route) => {
            for (i, id) in route.nodes.iter().enumerate() {
                let name = graph.location(id).map(|l| l.name.as_str()).unwrap_or("?");
                println!("{:>3}. {} {}", i + 1, id, name);
            }
            println!("distance: {:.6}", route.distance);
        }
        None => println!("unreachable"),
    }
    Ok(())
}

fn print_search(config: &MargaConfig, query: &str) -> Result<()> {
    let graph = GraphStore::load(&config.graph_path())?;
    let matches = graph.search(query);
    if matches.is_empty() {
        println!("no matches");
    }
    for location in matches {
        println!(
            "{} {} ({:.6}, {:.6})",
            location.id, location.name, location.coordinates.x, location.coordinates.y
        );
    }
    Ok(())
}

fn print_nearest(config: &MargaConfig, point: Point) -> Result<()> {
    let graph = GraphStore::load(&config.graph_path())?;
    match nearest_location(point, graph.locations()) {
        Some(location) => println!(
            "{} {} (distance {:.6})",
            location.id,
            location.name,
            location.coordinates.distance(&point)
        ),
        None => println!("no eligible location"),
    }
    Ok(())
}
