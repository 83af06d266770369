//! Sending one DNS question to a list of candidate addresses.
//!
//! UDP is tried first, `retries` passes over the address list. A timeout
//! moves on to the next address; any other network error ends the UDP path
//! at once. Datagrams that don't decode or carry a foreign id are skipped
//! until the attempt's deadline. A truncated UDP answer is re-asked over TCP with the very same
//! message bytes. With `tcp` set, UDP is skipped entirely.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use checksoa_core::TransportError;
use hickory_proto::op::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::QueryOptions;

/// Largest datagram we are prepared to receive
const MAX_UDP_MESSAGE_SIZE: usize = 65_535;

/// Something that can exchange a DNS message with one of several servers.
///
/// Implementations hold no per-call mutable state and may be used
/// concurrently.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Send `query` to the first responsive address and return its answer
    async fn exchange(&self, query: &Message, addrs: &[IpAddr]) -> Result<Message, TransportError>;
}

/// UDP/TCP DNS transport
#[derive(Debug, Clone, Copy)]
pub struct QueryTransport {
    timeout: Duration,
    retries: u32,
    force_tcp: bool,
    port: u16,
}

impl Default for QueryTransport {
    fn default() -> Self {
        Self::new(&QueryOptions::default())
    }
}

impl QueryTransport {
    /// Create a transport using the timing and protocol settings of `opts`
    #[must_use]
    pub const fn new(opts: &QueryOptions) -> Self {
        Self {
            timeout: opts.timeout,
            retries: opts.retries,
            force_tcp: opts.tcp,
            port: opts.port,
        }
    }

    /// Send a query, falling back to TCP on truncation
    pub async fn send(&self, query: &Message, addrs: &[IpAddr]) -> Result<Message, TransportError> {
        if addrs.is_empty() {
            return Err(TransportError::NoAddresses);
        }

        let wire = query
            .to_vec()
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        if self.force_tcp {
            return self.send_tcp(&wire, query.id(), addrs).await;
        }

        let response = self.send_udp(&wire, query.id(), addrs).await?;
        if response.truncated() {
            debug!(id = query.id(), "truncated UDP response, retrying over TCP");
            return self.send_tcp(&wire, query.id(), addrs).await;
        }
        Ok(response)
    }

    /// UDP with retries over the whole address list
    async fn send_udp(&self, wire: &[u8], id: u16, addrs: &[IpAddr]) -> Result<Message, TransportError> {
        let mut last_error = TransportError::Timeout;

        for attempt in 1..=self.retries.max(1) {
            for ip in addrs {
                let server = SocketAddr::new(*ip, self.port);
                match self.udp_exchange(wire, id, server).await {
                    Ok(response) => return Ok(response),
                    Err(err) if err.is_timeout() => {
                        debug!(%server, attempt, "UDP query timed out");
                        last_error = err;
                    }
                    Err(err) => {
                        debug!(%server, attempt, error = %err, "UDP query failed");
                        return Err(err);
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn udp_exchange(&self, wire: &[u8], id: u16, server: SocketAddr) -> Result<Message, TransportError> {
        let local: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(server).await?;

        let deadline = Instant::now() + self.timeout;
        timeout_at(deadline, socket.send(wire))
            .await
            .map_err(|_| TransportError::Timeout)??;

        let mut buf = vec![0u8; MAX_UDP_MESSAGE_SIZE];
        loop {
            let len = timeout_at(deadline, socket.recv(&mut buf))
                .await
                .map_err(|_| TransportError::Timeout)??;

            let response = match Message::from_vec(&buf[..len]) {
                Ok(response) => response,
                Err(err) => {
                    warn!(%server, len, error = %err, "dropping undecodable datagram");
                    continue;
                }
            };
            if response.id() == id {
                return Ok(response);
            }
            warn!(%server, expected = id, got = response.id(), "dropping response with mismatched id");
        }
    }

    /// TCP, each address once in order
    async fn send_tcp(&self, wire: &[u8], id: u16, addrs: &[IpAddr]) -> Result<Message, TransportError> {
        let mut last_error = TransportError::NoAddresses;

        for ip in addrs {
            let server = SocketAddr::new(*ip, self.port);
            match timeout(self.timeout, tcp_exchange(wire, server)).await {
                Ok(Ok(response)) if response.id() == id => return Ok(response),
                Ok(Ok(response)) => {
                    warn!(%server, expected = id, got = response.id(), "TCP response with mismatched id");
                    last_error = TransportError::Malformed(format!(
                        "id mismatch: expected {id}, got {}",
                        response.id()
                    ));
                }
                Ok(Err(err)) => {
                    debug!(%server, error = %err, "TCP query failed");
                    last_error = err;
                }
                Err(_) => {
                    debug!(%server, "TCP query timed out");
                    last_error = TransportError::Timeout;
                }
            }
        }

        Err(last_error)
    }
}

async fn tcp_exchange(wire: &[u8], server: SocketAddr) -> Result<Message, TransportError> {
    let len = u16::try_from(wire.len())
        .map_err(|_| TransportError::Encode(format!("message too large: {} bytes", wire.len())))?;

    let mut stream = TcpStream::connect(server).await?;
    let mut framed = Vec::with_capacity(wire.len() + 2);
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(wire);
    stream.write_all(&framed).await?;

    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let mut buf = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
    stream.read_exact(&mut buf).await?;

    Message::from_vec(&buf).map_err(|e| TransportError::Malformed(e.to_string()))
}

#[async_trait]
impl Exchange for QueryTransport {
    async fn exchange(&self, query: &Message, addrs: &[IpAddr]) -> Result<Message, TransportError> {
        self.send(query, addrs).await
    }
}
