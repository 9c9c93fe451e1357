use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender, TrySendError};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::config::ClientConfig;
use crate::connection::{Connector, TcpConnector};
use crate::error::ConfigError;
use crate::layout::Layout;
use crate::pixel::{Color, PixelBuffer};
use crate::protocol::Packet;

/// Counters updated by the client, readable from any thread
#[derive(Debug, Default)]
pub struct ClientStats {
    frames_submitted: AtomicU64,
    frames_dropped: AtomicU64,
    packets_sent: AtomicU64,
    connect_attempts: AtomicU64,
    connect_failures: AtomicU64,
    write_failures: AtomicU64,
    encode_failures: AtomicU64,
}

/// Point-in-time copy of [`ClientStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_submitted: u64,
    pub frames_dropped: u64,
    pub packets_sent: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub write_failures: u64,
    pub encode_failures: u64,
}

impl ClientStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Layout change queued by a [`ClientHandle`], applied by the run loop
#[derive(Debug, Clone, PartialEq)]
enum LayoutCommand {
    Led {
        index: usize,
        x: usize,
        y: usize,
    },
    Strip {
        start_index: usize,
        count: usize,
        x: f64,
        y: f64,
        spacing: f64,
        angle: f64,
        reversed: bool,
    },
}

impl LayoutCommand {
    fn apply(self, layout: &mut Layout) {
        match self {
            LayoutCommand::Led { index, x, y } => layout.register_led(index, x, y),
            LayoutCommand::Strip {
                start_index,
                count,
                x,
                y,
                spacing,
                angle,
                reversed,
            } => layout.register_strip(start_index, count, x, y, spacing, angle, reversed),
        }
    }
}

/// Cloneable entry point for other threads: submit frames, change the
/// layout and request stop.
///
/// None of these block or touch the client's connection.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    frames: Sender<PixelBuffer>,
    layout: Sender<LayoutCommand>,
    stop: Sender<()>,
    stopped: Arc<AtomicBool>,
    stats: Arc<ClientStats>,
}

impl ClientHandle {
    /// Queue a frame for the next flush.
    ///
    /// If the queue is full, or the client has stopped, the frame is dropped
    /// without telling the caller.
    pub fn submit_frame(&self, pixels: PixelBuffer) {
        ClientStats::bump(&self.stats.frames_submitted);
        if self.is_stopped() {
            ClientStats::bump(&self.stats.frames_dropped);
            return;
        }
        match self.frames.try_send(pixels) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                ClientStats::bump(&self.stats.frames_dropped);
            }
        }
    }

    /// Map LED `index` to pixel `(x, y)`. Takes effect on the next event the
    /// run loop handles; layout changes are never dropped.
    pub fn register_led(&self, index: usize, x: usize, y: usize) {
        let _ = self.layout.send(LayoutCommand::Led { index, x, y });
    }

    /// Register a strip from another thread, see [`Layout::register_strip`]
    #[allow(clippy::too_many_arguments)]
    pub fn register_strip(
        &self,
        start_index: usize,
        count: usize,
        x: f64,
        y: f64,
        spacing: f64,
        angle: f64,
        reversed: bool,
    ) {
        let _ = self.layout.send(LayoutCommand::Strip {
            start_index,
            count,
            x,
            y,
            spacing,
            angle,
            reversed,
        });
    }

    /// Ask the run loop to exit. Safe to call more than once.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // A pending signal is as good as a new one
        let _ = self.stop.try_send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Frames waiting for the run loop
    pub fn queued_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared counters, for reporters that outlive a single snapshot
    pub fn stats_counter(&self) -> Arc<ClientStats> {
        Arc::clone(&self.stats)
    }
}

/// Open Pixel Control client.
///
/// Holds the LED layout and streams the most recent frame to the server once
/// per flush interval, reconnecting lazily whenever the connection is lost.
/// `run` blocks and owns all network I/O; other threads talk to it through a
/// [`ClientHandle`].
pub struct OpcClient<C: Connector = TcpConnector> {
    config: ClientConfig,
    layout: Layout,
    connector: C,
    packet: Packet,
    handle: ClientHandle,
    frames: Receiver<PixelBuffer>,
    layout_changes: Receiver<LayoutCommand>,
    stop: Receiver<()>,
}

impl OpcClient<TcpConnector> {
    /// Create a client for the server at `address` (`host:port`).
    ///
    /// A zero `flush_interval` means the 500 ms default.
    pub fn new(address: &str, width: usize, height: usize, flush_interval: Duration) -> Self {
        let mut config = ClientConfig::new(address, width, height);
        config.set_flush_interval(flush_interval);
        let connector = tcp_connector(&config);
        Self::with_connector(config, connector)
    }

    /// Create a client from a validated configuration
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let connector = tcp_connector(&config);
        Ok(Self::with_connector(config, connector))
    }
}

fn tcp_connector(config: &ClientConfig) -> TcpConnector {
    TcpConnector::new(config.address.clone())
        .connect_timeout(Some(config.connect_timeout()))
        .write_timeout(config.write_timeout())
}

impl<C: Connector> OpcClient<C> {
    /// Create a client that opens its connections through `connector`
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        let (frames_tx, frames_rx) = bounded(config.queue_capacity());
        let (layout_tx, layout_rx) = unbounded();
        let (stop_tx, stop_rx) = bounded(1);

        OpcClient {
            layout: Layout::new(config.width),
            config,
            connector,
            packet: Packet::new(),
            handle: ClientHandle {
                frames: frames_tx,
                layout: layout_tx,
                stop: stop_tx,
                stopped: Arc::new(AtomicBool::new(false)),
                stats: Arc::new(ClientStats::default()),
            },
            frames: frames_rx,
            layout_changes: layout_rx,
            stop: stop_rx,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Handle for submitting frames and stopping from other threads
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.handle.stats()
    }

    /// Map LED `index` to framebuffer pixel `(x, y)`.
    ///
    /// While `run` is executing, use [`ClientHandle::register_led`] instead.
    pub fn register_led(&mut self, index: usize, x: usize, y: usize) {
        self.layout.register_led(index, x, y);
    }

    /// Register a straight strip of LEDs, see [`Layout::register_strip`]
    #[allow(clippy::too_many_arguments)]
    pub fn register_strip(
        &mut self,
        start_index: usize,
        count: usize,
        x: f64,
        y: f64,
        spacing: f64,
        angle: f64,
        reversed: bool,
    ) {
        self.layout
            .register_strip(start_index, count, x, y, spacing, angle, reversed);
    }

    pub fn submit_frame(&self, pixels: PixelBuffer) {
        self.handle.submit_frame(pixels);
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Run the flush loop until [`stop`](Self::stop) is called.
    ///
    /// Connection and write failures are logged and retried on the next
    /// tick; nothing here ends the loop except a stop request.
    pub fn run(&mut self) {
        let interval = self.config.flush_interval();
        let ticker = tick(interval);
        let mut conn: Option<C::Stream> = None;
        let mut pixels: Option<PixelBuffer> = None;
        let frames = self.frames.clone();
        let layout_changes = self.layout_changes.clone();
        let stop = self.stop.clone();

        info!(
            addr = %self.connector.target(),
            leds = self.layout.len(),
            interval_ms = interval.as_millis() as u64,
            "OPC client started"
        );

        while !self.handle.is_stopped() {
            select! {
                recv(stop) -> _ => break,
                recv(frames) -> frame => {
                    if let Ok(frame) = frame {
                        pixels = Some(frame);
                    }
                }
                recv(layout_changes) -> command => {
                    if let Ok(command) = command {
                        command.apply(&mut self.layout);
                    }
                }
                recv(ticker) -> _ => self.flush(&mut conn, pixels.as_deref()),
            }
        }

        if conn.take().is_some() {
            info!(addr = %self.connector.target(), "Disconnecting from OPC server");
        }
        info!("OPC client stopped");
    }

    /// One tick: make sure we are connected, then send the current frame
    fn flush(&mut self, conn: &mut Option<C::Stream>, pixels: Option<&[Color]>) {
        let stats = &self.handle.stats;

        if conn.is_none() {
            ClientStats::bump(&stats.connect_attempts);
            match self.connector.connect() {
                Ok(stream) => {
                    info!(addr = %self.connector.target(), "Connected to OPC server");
                    *conn = Some(stream);
                }
                Err(e) => {
                    ClientStats::bump(&stats.connect_failures);
                    warn!(addr = %self.connector.target(), error = %e, "Failed to connect to OPC server");
                    return;
                }
            }
        }

        let Some(pixels) = pixels else {
            return;
        };
        if self.layout.is_empty() {
            debug!("No LEDs registered, nothing to send");
            return;
        }

        if let Err(e) = self.packet.encode_from(pixels, &self.layout) {
            ClientStats::bump(&stats.encode_failures);
            error!(error = %e, "Failed to encode frame");
            return;
        }

        // Last chance to honor a stop that raced with this tick
        if self.handle.is_stopped() {
            return;
        }

        let result = match conn.as_mut() {
            Some(stream) => stream
                .write_all(self.packet.as_bytes())
                .and_then(|()| stream.flush()),
            None => return,
        };

        match result {
            Ok(()) => {
                ClientStats::bump(&stats.packets_sent);
                trace!(
                    leds = self.packet.led_count(),
                    bytes = self.packet.as_bytes().len(),
                    "Sent frame"
                );
            }
            Err(e) => {
                ClientStats::bump(&stats.write_failures);
                warn!(addr = %self.connector.target(), error = %e, "Write to OPC server failed, dropping connection");
                *conn = None;
            }
        }
    }
}
