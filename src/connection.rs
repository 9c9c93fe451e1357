use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Opens the connection the scheduler writes packets to.
///
/// The scheduler calls `connect` at most once per flush interval and drops
/// the returned stream on the first write error.
pub trait Connector {
    type Stream: Write;

    fn connect(&mut self) -> io::Result<Self::Stream>;

    /// Human readable target, used in log lines
    fn target(&self) -> &str;
}

/// TCP connection to an OPC server
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connect_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        TcpConnector {
            address: address.into(),
            connect_timeout: None,
            write_timeout: None,
        }
    }

    /// Bound the time spent establishing a connection
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound the time a single packet write may block
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn open(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self) -> io::Result<TcpStream> {
        // Resolve on every attempt so a host that changes address is picked up
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match self.open(&addr) {
                Ok(stream) => {
                    stream.set_write_timeout(self.write_timeout)?;
                    // Frames are written whole; don't let Nagle hold them back
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve to any address", self.address),
            )
        }))
    }

    fn target(&self) -> &str {
        &self.address
    }
}
