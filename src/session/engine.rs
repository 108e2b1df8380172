//! Replication engine
//!
//! Runs one replication cycle per call to [`ReplicationEngine::update`]:
//! a master encodes its whole store and sends it, a slave drains its socket
//! and merges the newest datagram into its store.
//!
//! State machine:
//!
//! ```text
//!  Disabled            (no-op forever)
//!  MasterReady ──────▶ MasterReady          send one datagram per cycle
//!  SlaveAwaitingFirst ─▶ SlaveSteady        on first datagram (bounded wait)
//!  SlaveSteady ───────▶ SlaveSteady         zero-wait poll, liveness check
//! ```
//!
//! Every error returned by `update` is fatal.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::sync::{LivenessClock, RecordStore, codec};
use crate::transport::{Drained, MasterEndpoint, SlaveEndpoint};

use super::error::DgrResult;

/// Liveness violations on the slave side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// No datagram arrived before the first-receive timeout.
    #[error("no datagram received within {:.1}s; did the master start?", .timeout.as_secs_f64())]
    FirstReceiveTimeout {
        /// Configured first-receive timeout.
        timeout: Duration,
    },

    /// The master went silent for longer than the liveness window.
    #[error(
        "no datagram received for {:.1}s (limit {}s); did the master or relay die?",
        .elapsed.as_secs_f64(),
        .window.as_secs()
    )]
    MasterSilent {
        /// Configured liveness window.
        window: Duration,
        /// Silence observed.
        elapsed: Duration,
    },
}

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Replication is off; `update` does nothing.
    Disabled,
    /// Master with an open socket.
    MasterReady,
    /// Slave that has not received anything yet.
    SlaveAwaitingFirst,
    /// Slave that has received at least one datagram.
    SlaveSteady,
}

/// What a cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Session is disabled.
    Idle,
    /// Master had nothing to send.
    Skipped,
    /// Master sent one datagram.
    Sent {
        /// Datagram size.
        bytes: usize,
    },
    /// Slave had nothing pending; last known values stand.
    Unchanged,
    /// Slave merged the newest datagram.
    Applied {
        /// Datagrams drained, including superseded ones.
        datagrams: usize,
        /// Size of the applied datagram.
        bytes: usize,
        /// Records in the applied datagram.
        records: usize,
    },
}

#[derive(Debug)]
enum Endpoint {
    None,
    Master(MasterEndpoint),
    Slave(SlaveEndpoint),
}

/// Replication engine
///
/// Owns the record store, the socket and the liveness clock of one session.
#[derive(Debug)]
pub struct ReplicationEngine {
    state: EngineState,
    endpoint: Endpoint,
    store: RecordStore,
    liveness: LivenessClock,
    first_receive_timeout: Duration,
    liveness_window: Duration,
}

impl ReplicationEngine {
    /// Create an engine that never touches the network.
    pub fn disabled(store: RecordStore) -> Self {
        Self {
            state: EngineState::Disabled,
            endpoint: Endpoint::None,
            store,
            liveness: LivenessClock::new(),
            first_receive_timeout: Duration::ZERO,
            liveness_window: Duration::ZERO,
        }
    }

    /// Create a master engine sending through `endpoint`.
    pub fn master(endpoint: MasterEndpoint, store: RecordStore) -> Self {
        Self {
            state: EngineState::MasterReady,
            endpoint: Endpoint::Master(endpoint),
            ..Self::disabled(store)
        }
    }

    /// Create a slave engine receiving on `endpoint`.
    pub fn slave(
        endpoint: SlaveEndpoint,
        store: RecordStore,
        first_receive_timeout: Duration,
        liveness_window: Duration,
    ) -> Self {
        Self {
            state: EngineState::SlaveAwaitingFirst,
            endpoint: Endpoint::Slave(endpoint),
            store,
            liveness: LivenessClock::new(),
            first_receive_timeout,
            liveness_window,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The record store, mutably.
    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    /// The liveness clock.
    pub fn liveness(&self) -> &LivenessClock {
        &self.liveness
    }

    /// Local address of the socket, if one is open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.endpoint {
            Endpoint::None => None,
            Endpoint::Master(endpoint) => endpoint.local_addr().ok(),
            Endpoint::Slave(endpoint) => endpoint.local_addr().ok(),
        }
    }

    /// Run one replication cycle.
    pub async fn update(&mut self) -> DgrResult<CycleOutcome> {
        match self.state {
            EngineState::Disabled => Ok(CycleOutcome::Idle),
            EngineState::MasterReady => self.send().await,
            EngineState::SlaveAwaitingFirst => self.receive_first().await,
            EngineState::SlaveSteady => self.receive().await,
        }
    }

    async fn send(&mut self) -> DgrResult<CycleOutcome> {
        let Endpoint::Master(endpoint) = &self.endpoint else {
            return Ok(CycleOutcome::Idle);
        };
        if self.store.is_empty() {
            return Ok(CycleOutcome::Skipped);
        }

        let datagram = codec::encode(&self.store);
        if datagram.is_empty() {
            return Ok(CycleOutcome::Skipped);
        }
        endpoint.send(&datagram).await?;

        trace!(bytes = datagram.len(), records = self.store.len(), "datagram sent");
        Ok(CycleOutcome::Sent {
            bytes: datagram.len(),
        })
    }

    async fn receive_first(&mut self) -> DgrResult<CycleOutcome> {
        let Endpoint::Slave(endpoint) = &mut self.endpoint else {
            return Ok(CycleOutcome::Idle);
        };

        let timeout = self.first_receive_timeout;
        let Some(drained) = endpoint.recv_latest(timeout).await? else {
            return Err(ReplicationError::FirstReceiveTimeout { timeout }.into());
        };

        let outcome = apply(&mut self.store, &mut self.liveness, drained)?;
        self.state = EngineState::SlaveSteady;
        info!(records = self.store.len(), "first datagram received");
        Ok(outcome)
    }

    async fn receive(&mut self) -> DgrResult<CycleOutcome> {
        let Endpoint::Slave(endpoint) = &mut self.endpoint else {
            return Ok(CycleOutcome::Idle);
        };

        match endpoint.poll_latest().await? {
            Some(drained) => apply(&mut self.store, &mut self.liveness, drained),
            None => {
                let now = Instant::now();
                if self.liveness.is_stale(now, self.liveness_window) {
                    return Err(ReplicationError::MasterSilent {
                        window: self.liveness_window,
                        elapsed: self.liveness.elapsed(now).unwrap_or_default(),
                    }
                    .into());
                }
                Ok(CycleOutcome::Unchanged)
            }
        }
    }
}

/// Merge the newest datagram and refresh the liveness clock.
fn apply(
    store: &mut RecordStore,
    liveness: &mut LivenessClock,
    drained: Drained<'_>,
) -> DgrResult<CycleOutcome> {
    let records = codec::merge(store, drained.data)?;
    liveness.mark_received(Instant::now());

    if drained.datagrams > 1 {
        debug!(skipped = drained.datagrams - 1, "superseded datagrams dropped");
    }
    Ok(CycleOutcome::Applied {
        datagrams: drained.datagrams,
        bytes: drained.data.len(),
        records,
    })
}
