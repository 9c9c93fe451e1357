use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

mod logging;
mod pattern;

use logging::{init_logging, LogFormat, LogLevel};
use opc_client::config::DEFAULT_ADDRESS;
use opc_client::{ClientConfig, ClientHandle, Connector, LayoutConfig, OpcClient, TcpConnector};
use pattern::{spawn_generator, Pattern};

const STATS_PERIOD: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "opc_client")]
#[command(about = "Open Pixel Control client\n\nRenders a demo pattern and streams it to an OPC server over TCP.", long_about = None)]
struct Cli {
    /// Address and port of the OPC server to connect to
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    addr: String,

    /// Framebuffer width in pixels
    #[arg(long, default_value_t = 800)]
    width: usize,

    /// Framebuffer height in pixels
    #[arg(long, default_value_t = 200)]
    height: usize,

    /// How often to (re)connect and push the current frame
    #[arg(long, default_value_t = 500)]
    flush_interval_ms: u64,

    /// Pending frames kept before new ones are dropped
    #[arg(long, default_value_t = 25)]
    queue_capacity: usize,

    /// LED layout file (JSON); defaults to four horizontal 64-LED strips
    #[arg(long)]
    layout: Option<String>,

    /// Demo pattern to render
    #[arg(long, value_enum, default_value = "solid")]
    pattern: Pattern,

    /// Frames per second generated by animated patterns
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Exit if the server is unreachable at startup
    #[arg(long)]
    require_connect: bool,

    /// Log output format (stderr)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Report statistics every few seconds
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            flush_interval_ms: self.flush_interval_ms,
            queue_capacity: self.queue_capacity,
            ..ClientConfig::new(self.addr.clone(), self.width, self.height)
        }
    }
}

/// Layout used when no file is given: four stacked strips across the middle
fn default_layout(width: usize, height: usize) -> LayoutConfig {
    let x = width as f64 / 2.0;
    let spacing = width as f64 / 70.0;
    let mut layout = LayoutConfig::default();
    for (row, offset) in [-30.0, 0.0, 30.0, 60.0].into_iter().enumerate() {
        layout.strips.push(opc_client::config::StripConfig {
            index: row * 64,
            count: 64,
            x,
            y: height as f64 / 2.0 + offset,
            spacing,
            angle: 0.0,
            reversed: false,
        });
    }
    layout
}

fn spawn_stats_thread(handle: ClientHandle) {
    let stats = handle.stats_counter();
    thread::spawn(move || {
        let mut last = stats.snapshot();
        while !handle.is_stopped() {
            thread::sleep(STATS_PERIOD);
            let current = stats.snapshot();
            let secs = STATS_PERIOD.as_secs_f64();
            info!(
                submitted_fps = %format!("{:.1}", (current.frames_submitted - last.frames_submitted) as f64 / secs),
                sent_fps = %format!("{:.1}", (current.packets_sent - last.packets_sent) as f64 / secs),
                dropped = current.frames_dropped - last.frames_dropped,
                connect_failures = current.connect_failures,
                "Stats"
            );
            last = current;
        }
    });
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);
    info!("OPC client starting");

    let config = cli.client_config();
    let mut client = OpcClient::from_config(config).context("Invalid client configuration")?;

    let layout = match &cli.layout {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("Failed to read layout file {}", path))?;
            LayoutConfig::from_json(&data)
                .with_context(|| format!("Failed to parse layout file {}", path))?
        }
        None => default_layout(cli.width, cli.height),
    };
    layout.apply(&mut client);
    info!(leds = client.layout().len(), "Layout registered");

    if cli.require_connect {
        let timeout = client.config().connect_timeout();
        TcpConnector::new(cli.addr.clone())
            .connect_timeout(Some(timeout))
            .connect()
            .with_context(|| format!("OPC server {} is unreachable", cli.addr))?;
        info!(addr = %cli.addr, "OPC server reachable");
    }

    let handle = client.handle();
    let stopper = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutting down...");
        stopper.stop();
    }) {
        warn!(error = %e, "Could not set Ctrl-C handler");
    }

    if cli.debug {
        spawn_stats_thread(handle.clone());
    }
    let generator = spawn_generator(handle.clone(), cli.pattern, cli.width, cli.height, cli.fps);

    // Blocks until Ctrl-C
    client.run();

    let _ = generator.join();
    let stats = handle.stats();
    info!(
        packets_sent = stats.packets_sent,
        frames_dropped = stats.frames_dropped,
        "OPC client exited"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = Cli::try_parse_from(["opc_client"]).unwrap();
        assert_eq!(cli.addr, "127.0.0.1:7890");
        assert_eq!(cli.pattern, Pattern::Solid);
        let config = cli.client_config();
        assert_eq!(config.width, 800);
        assert_eq!(config.flush_interval(), Duration::from_millis(500));
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "opc_client",
            "--addr",
            "10.0.0.2:7890",
            "--pattern",
            "chase",
            "--flush-interval-ms",
            "40",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.pattern, Pattern::Chase);
        assert_eq!(cli.client_config().flush_interval(), Duration::from_millis(40));
    }

    #[test]
    fn default_layout_has_four_strips() {
        let layout = default_layout(800, 200);
        assert_eq!(layout.strips.len(), 4);
        assert_eq!(layout.strips[3].index, 192);

        let mut client = OpcClient::new("127.0.0.1:7890", 800, 200, Duration::ZERO);
        layout.apply(&mut client);
        assert_eq!(client.layout().len(), 256);
    }
}
