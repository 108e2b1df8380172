//! UDP endpoints for DGR.
//!
//! The master owns an unconnected socket aimed at one resolved destination;
//! a slave owns a socket bound to a wildcard address. Both walk the resolved
//! candidates in order and settle on the first one that works, which keeps
//! IPv4-only, IPv6-only and dual-stack hosts happy.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::{TransportError, TransportResult};
use crate::core::constants::{DEFAULT_RECV_BUFFER_SIZE, MAX_DATAGRAM_SIZE};

/// Sending side of a master session.
#[derive(Debug)]
pub struct MasterEndpoint {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl MasterEndpoint {
    /// Resolve `host:port` and open a socket able to send there.
    pub async fn open(host: &str, port: u16) -> TransportResult<Self> {
        let target = format!("{host}:{port}");
        let candidates: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|source| TransportError::Resolve {
                target: target.clone(),
                source,
            })?
            .collect();

        Self::open_candidates(&target, candidates).await
    }

    /// Open a socket for the first destination in `candidates` that works.
    pub async fn open_candidates(
        target: &str,
        candidates: impl IntoIterator<Item = SocketAddr>,
    ) -> TransportResult<Self> {
        let mut last_error = None;
        for dest in candidates {
            match UdpSocket::bind(unspecified_for(dest)).await {
                Ok(socket) => {
                    info!(%dest, "master sending datagrams");
                    return Ok(Self { socket, dest });
                }
                Err(err) => {
                    warn!(%dest, error = %err, "cannot open socket for candidate, trying next");
                    last_error = Some(err);
                }
            }
        }

        Err(TransportError::NoUsableAddress {
            target: target.to_owned(),
            source: last_error,
        })
    }

    /// Resolved destination.
    pub fn destination(&self) -> SocketAddr {
        self.dest
    }

    /// Local address of the sending socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send `datagram` as exactly one UDP datagram.
    pub async fn send(&self, datagram: &[u8]) -> TransportResult<()> {
        if datagram.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::Oversized {
                size: datagram.len(),
                limit: MAX_DATAGRAM_SIZE,
            });
        }

        let sent = self
            .socket
            .send_to(datagram, self.dest)
            .await
            .map_err(|source| TransportError::Send {
                dest: self.dest,
                source,
            })?;

        if sent != datagram.len() {
            return Err(TransportError::ShortSend {
                sent,
                expected: datagram.len(),
            });
        }
        Ok(())
    }
}

/// Outcome of draining the receive queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained<'a> {
    /// Datagrams read off the socket, including superseded ones.
    pub datagrams: usize,
    /// Contents of the newest datagram.
    pub data: &'a [u8],
}

/// Receiving side of a slave session.
#[derive(Debug)]
pub struct SlaveEndpoint {
    socket: UdpSocket,
    recv_buffer: Vec<u8>,
}

impl SlaveEndpoint {
    /// Bind the wildcard address on `port`.
    pub async fn bind(port: u16) -> TransportResult<Self> {
        Self::bind_candidates(passive_candidates(port), DEFAULT_RECV_BUFFER_SIZE).await
    }

    /// Bind the first address in `candidates` that accepts a socket.
    pub async fn bind_candidates(
        candidates: impl IntoIterator<Item = SocketAddr>,
        recv_buffer_size: usize,
    ) -> TransportResult<Self> {
        let mut last_error = None;
        let mut tried = Vec::new();
        for addr in candidates {
            match UdpSocket::bind(addr).await {
                Ok(socket) => {
                    let local = socket.local_addr().unwrap_or(addr);
                    info!(%local, "slave listening for datagrams");
                    return Ok(Self {
                        socket,
                        recv_buffer: vec![0u8; recv_buffer_size],
                    });
                }
                Err(err) => {
                    warn!(%addr, error = %err, "cannot bind candidate, trying next");
                    tried.push(addr.to_string());
                    last_error = Some(err);
                }
            }
        }

        Err(TransportError::NoUsableAddress {
            target: tried.join(", "),
            source: last_error,
        })
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Wait up to `timeout` for the newest datagram.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    pub async fn recv_latest(&mut self, timeout: Duration) -> TransportResult<Option<Drained<'_>>> {
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.socket.readable()).await {
                Err(_) => return Ok(None),
                Ok(result) => result.map_err(TransportError::Receive)?,
            }
            // Readiness can be spurious; keep waiting until the deadline
            if let Some((datagrams, len)) = self.drain()? {
                return Ok(Some(Drained {
                    datagrams,
                    data: &self.recv_buffer[..len],
                }));
            }
        }
    }

    /// Take the newest datagram without waiting.
    ///
    /// Yields to the runtime once first so readiness events that arrived since
    /// the last cycle are registered.
    pub async fn poll_latest(&mut self) -> TransportResult<Option<Drained<'_>>> {
        tokio::task::yield_now().await;
        Ok(self.drain()?.map(|(datagrams, len)| Drained {
            datagrams,
            data: &self.recv_buffer[..len],
        }))
    }

    /// Read until the queue is empty, keeping only the last datagram.
    ///
    /// Returns the number of datagrams read and the length of the last one.
    /// A kept datagram that fills the buffer is rejected, since UDP drops
    /// the excess silently.
    fn drain(&mut self) -> TransportResult<Option<(usize, usize)>> {
        let mut datagrams = 0;
        let mut last_len = 0;
        loop {
            match self.socket.try_recv_from(&mut self.recv_buffer) {
                Ok((len, from)) => {
                    datagrams += 1;
                    last_len = len;
                    debug!(%from, len, "datagram received");
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(TransportError::Receive(e)),
            }
        }

        if datagrams > 0 && last_len >= self.recv_buffer.len() {
            return Err(TransportError::Truncated {
                capacity: self.recv_buffer.len(),
            });
        }
        Ok((datagrams > 0).then_some((datagrams, last_len)))
    }
}

/// Socket address to send from when targeting `dest`.
fn unspecified_for(dest: SocketAddr) -> SocketAddr {
    match dest {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

/// Wildcard bind addresses for `port`, IPv4 first.
pub fn passive_candidates(port: u16) -> [SocketAddr; 2] {
    [
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
    ]
}
