//! Open Pixel Control client.
//!
//! Maps logical LEDs onto a 2D framebuffer, encodes frames as OPC
//! "set pixel colors" packets and streams them to an OPC server over TCP at
//! a fixed flush interval, reconnecting whenever the connection drops.

pub mod config;
pub mod connection;
pub mod error;
pub mod layout;
pub mod opc_client;
pub mod pixel;
pub mod protocol;

pub use config::{ClientConfig, LayoutConfig};
pub use connection::{Connector, TcpConnector};
pub use error::{ConfigError, EncodeError};
pub use layout::Layout;
pub use opc_client::{ClientHandle, ClientStats, OpcClient, StatsSnapshot};
pub use pixel::{Color, PixelBuffer};
