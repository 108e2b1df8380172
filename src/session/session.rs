//! Session façade.
//!
//! The application owns one [`Session`], calls [`Session::set_or_get`] once
//! per shared variable per frame, and [`Session::update`] once per frame.

use std::net::SocketAddr;

use tracing::{info, warn};

use super::config::{ConfigError, Mode, SessionConfig};
use super::engine::{CycleOutcome, EngineState, ReplicationEngine};
use super::error::DgrResult;
use crate::core::constants::{
    DISABLED_DEST_ADDR, ENV_MASTER_DEST_IP, ENV_MASTER_DEST_PORT, ENV_MODE, ENV_SLAVE_LISTEN_PORT,
};
use crate::core::StoreError;
use crate::sync::RecordStore;
use crate::transport::{MasterEndpoint, SlaveEndpoint, passive_candidates};

/// A DGR session.
///
/// # Example
///
/// ```no_run
/// use dgr::prelude::*;
///
/// # async fn run() -> Result<(), DgrError> {
/// let mut session = Session::from_env().await?;
/// let mut frame = 0u64.to_ne_bytes();
/// loop {
///     if session.is_master() {
///         let next = u64::from_ne_bytes(frame) + 1;
///         frame = next.to_ne_bytes();
///     }
///     session.set_or_get("frame", &mut frame)?;
///     session.update().await?;
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    mode: Mode,
    engine: ReplicationEngine,
}

impl Session {
    /// Initialize a session from the `DGR_*` environment variables.
    pub async fn from_env() -> DgrResult<Self> {
        Self::new(SessionConfig::from_env()?).await
    }

    /// Initialize a session.
    ///
    /// A master whose destination is unset or `0.0.0.0` comes up disabled.
    /// A missing port for the selected mode is an error.
    pub async fn new(config: SessionConfig) -> DgrResult<Self> {
        let store = RecordStore::with_capacity(config.max_records);

        let engine = match config.mode {
            Mode::Master => {
                let port = config.master_port.ok_or(ConfigError::MissingVariable {
                    var: ENV_MASTER_DEST_PORT,
                })?;
                match config.master_dest.as_deref() {
                    None | Some(DISABLED_DEST_ADDR) => {
                        info!(
                            "master will not transmit: {ENV_MASTER_DEST_IP} is unset or {DISABLED_DEST_ADDR}"
                        );
                        ReplicationEngine::disabled(store)
                    }
                    Some(host) => {
                        info!(host, port, "master preparing to send");
                        let endpoint = MasterEndpoint::open(host, port).await?;
                        ReplicationEngine::master(endpoint, store)
                    }
                }
            }
            Mode::Slave => {
                let port = config.slave_port.ok_or(ConfigError::MissingVariable {
                    var: ENV_SLAVE_LISTEN_PORT,
                })?;
                info!(port, "slave preparing to receive");
                let endpoint =
                    SlaveEndpoint::bind_candidates(passive_candidates(port), config.recv_buffer_size)
                        .await?;
                ReplicationEngine::slave(
                    endpoint,
                    store,
                    config.first_receive_timeout,
                    config.liveness_window,
                )
            }
            Mode::Disabled => {
                warn!("DGR is disabled; {ENV_MODE} is neither 'master' nor 'slave'");
                ReplicationEngine::disabled(store)
            }
        };

        Ok(Self {
            mode: config.mode,
            engine,
        })
    }

    /// Tear the session down and initialize it again from `config`.
    ///
    /// All records are released and the old socket is closed before the new
    /// one is opened. On error the session is left disabled.
    pub async fn reinit(&mut self, config: SessionConfig) -> DgrResult<()> {
        self.mode = Mode::Disabled;
        self.engine = ReplicationEngine::disabled(RecordStore::new());
        *self = Self::new(config).await?;
        Ok(())
    }

    /// Check if this process was configured as the master.
    ///
    /// Stays `true` for a master that was disabled by its destination.
    pub fn is_master(&self) -> bool {
        self.mode == Mode::Master
    }

    /// Check if replication is active.
    pub fn is_enabled(&self) -> bool {
        self.engine.state() != EngineState::Disabled
    }

    /// Configured mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Engine state.
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Local record store.
    pub fn store(&self) -> &RecordStore {
        self.engine.store()
    }

    /// Local address of the session socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.engine.local_addr()
    }

    /// Stage `bytes` under `name` for the next broadcast.
    ///
    /// Does nothing unless this is an active master.
    pub fn set(&mut self, name: &str, bytes: &[u8]) -> DgrResult<()> {
        if self.engine.state() == EngineState::MasterReady {
            self.engine.store_mut().write(name, bytes)?;
        }
        Ok(())
    }

    /// Copy the record called `name` into `buffer`.
    ///
    /// The record must be exactly `buffer.len()` bytes; on any error the
    /// buffer is left untouched.
    pub fn get(&self, name: &str, buffer: &mut [u8]) -> Result<usize, StoreError> {
        let store = self.engine.store();
        let size = store
            .get(name)
            .map(<[u8]>::len)
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_owned(),
            })?;

        if size < buffer.len() {
            return Err(StoreError::SizeMismatch {
                name: name.to_owned(),
                expected: buffer.len(),
                actual: size,
            });
        }
        store.read(name, buffer)
    }

    /// Publish `buffer` as a master, or refresh it from the store as a slave.
    ///
    /// A slave that cannot fill `buffer` (unknown name, wrong size) logs a
    /// warning and leaves it untouched. Only fatal errors are returned.
    pub fn set_or_get(&mut self, name: &str, buffer: &mut [u8]) -> DgrResult<()> {
        match self.engine.state() {
            EngineState::Disabled => Ok(()),
            EngineState::MasterReady => self.set(name, buffer),
            EngineState::SlaveAwaitingFirst | EngineState::SlaveSteady => {
                match self.get(name, buffer) {
                    Ok(_) => Ok(()),
                    Err(err) if !err.is_fatal() => {
                        warn!(name, error = %err, "record not retrieved, buffer left unchanged");
                        Ok(())
                    }
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Run one replication cycle: send as master, receive as slave.
    pub async fn update(&mut self) -> DgrResult<CycleOutcome> {
        self.engine.update().await
    }

    /// Log every record the session knows about.
    pub fn log_records(&self) {
        if !self.is_enabled() {
            info!("DGR is disabled or not initialized correctly");
            return;
        }
        info!(records = self.store().len(), "current record list\n{}", self.store());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::{DgrError, ReplicationError};
    use crate::transport::TransportError;

    async fn pair() -> (Session, Session) {
        let slave = Session::new(SessionConfig::builder().slave(0).build())
            .await
            .unwrap();
        let port = slave.local_addr().unwrap().port();
        let master = Session::new(SessionConfig::builder().master("127.0.0.1", port).build())
            .await
            .unwrap();
        (master, slave)
    }

    #[tokio::test]
    async fn test_disabled_session() {
        let mut session = Session::new(SessionConfig::default()).await.unwrap();

        assert!(!session.is_master());
        assert!(!session.is_enabled());
        assert_eq!(session.local_addr(), None);

        let mut buffer = [7u8; 4];
        session.set_or_get("x", &mut buffer).unwrap();
        assert_eq!(buffer, [7; 4]);
        assert!(session.store().is_empty());
        assert_eq!(session.update().await.unwrap(), CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn test_master_disabled_by_sentinel() {
        let mut session = Session::new(SessionConfig::builder().master("0.0.0.0", 5700).build())
            .await
            .unwrap();

        assert!(session.is_master());
        assert!(!session.is_enabled());
        assert_eq!(session.local_addr(), None);

        session.set_or_get("x", &mut [1, 2]).unwrap();
        assert!(session.store().is_empty());
        assert_eq!(session.update().await.unwrap(), CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn test_master_without_destination_is_disabled() {
        let config = SessionConfig {
            mode: Mode::Master,
            master_port: Some(5700),
            ..SessionConfig::default()
        };
        let session = Session::new(config).await.unwrap();
        assert!(session.is_master());
        assert!(!session.is_enabled());
    }

    #[tokio::test]
    async fn test_master_requires_port() {
        let config = SessionConfig {
            mode: Mode::Master,
            master_dest: Some(DISABLED_DEST_ADDR.into()),
            ..SessionConfig::default()
        };
        let err = Session::new(config).await.unwrap_err();
        assert!(matches!(
            err,
            DgrError::Config(ConfigError::MissingVariable { var: ENV_MASTER_DEST_PORT })
        ));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_slave_requires_port() {
        let config = SessionConfig {
            mode: Mode::Slave,
            ..SessionConfig::default()
        };
        let err = Session::new(config).await.unwrap_err();
        assert!(matches!(
            err,
            DgrError::Config(ConfigError::MissingVariable { var: ENV_SLAVE_LISTEN_PORT })
        ));
    }

    #[tokio::test]
    async fn test_slave_bind_conflict_is_fatal() {
        let first = Session::new(SessionConfig::builder().slave(0).build())
            .await
            .unwrap();
        let port = first.local_addr().unwrap().port();

        let err = Session::new(SessionConfig::builder().slave(port).build())
            .await
            .unwrap_err();
        assert!(matches!(err, DgrError::Transport(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_master_to_slave() {
        let (mut master, mut slave) = pair().await;
        assert!(master.is_master() && master.is_enabled());
        assert!(!slave.is_master() && slave.is_enabled());

        let mut position = [1.0f32, 2.0, 3.0].map(f32::to_ne_bytes).concat();
        let mut frame = 42u64.to_ne_bytes();
        master.set_or_get("position", &mut position).unwrap();
        master.set_or_get("frame", &mut frame).unwrap();
        assert!(matches!(master.update().await.unwrap(), CycleOutcome::Sent { .. }));

        assert!(matches!(
            slave.update().await.unwrap(),
            CycleOutcome::Applied { records: 2, .. }
        ));
        assert_eq!(slave.state(), EngineState::SlaveSteady);

        let mut received_frame = [0u8; 8];
        let mut received_position = vec![0u8; 12];
        slave.set_or_get("frame", &mut received_frame).unwrap();
        slave.set_or_get("position", &mut received_position).unwrap();
        assert_eq!(u64::from_ne_bytes(received_frame), 42);
        assert_eq!(received_position, position);
    }

    #[tokio::test]
    async fn test_slave_drains_to_latest_counter() {
        let (mut master, mut slave) = pair().await;

        for counter in 1u32..=3 {
            master.set("counter", &counter.to_ne_bytes()).unwrap();
            master.update().await.unwrap();
        }

        let outcome = slave.update().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Applied { datagrams: 3, .. }));

        let mut counter = [0u8; 4];
        slave.set_or_get("counter", &mut counter).unwrap();
        assert_eq!(u32::from_ne_bytes(counter), 3);
    }

    #[tokio::test]
    async fn test_steady_slave_drains_to_latest_counter() {
        let (mut master, mut slave) = pair().await;

        master.set("counter", &0u32.to_ne_bytes()).unwrap();
        master.update().await.unwrap();
        slave.update().await.unwrap();
        assert_eq!(slave.state(), EngineState::SlaveSteady);
        assert_eq!(slave.update().await.unwrap(), CycleOutcome::Unchanged);

        for counter in 1u32..=3 {
            master.set("counter", &counter.to_ne_bytes()).unwrap();
            master.update().await.unwrap();
        }

        let outcome = slave.update().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Applied { datagrams: 3, .. }));

        let mut counter = [0u8; 4];
        slave.set_or_get("counter", &mut counter).unwrap();
        assert_eq!(u32::from_ne_bytes(counter), 3);
    }

    #[tokio::test]
    async fn test_undersized_receive_buffer_is_fatal() {
        let slave_config = SessionConfig::builder().slave(0).recv_buffer_size(7).build();
        let mut slave = Session::new(slave_config).await.unwrap();
        let port = slave.local_addr().unwrap().port();
        let mut master = Session::new(SessionConfig::builder().master("127.0.0.1", port).build())
            .await
            .unwrap();

        master.set("a", &[1]).unwrap();
        master.set("b", &[2]).unwrap();
        assert_eq!(
            master.update().await.unwrap(),
            CycleOutcome::Sent { bytes: 14 }
        );

        let err = slave.update().await.unwrap_err();
        assert!(matches!(
            err,
            DgrError::Transport(TransportError::Truncated { capacity: 7 })
        ));
        assert!(err.is_fatal());
        assert!(slave.store().is_empty());
        assert_eq!(slave.state(), EngineState::SlaveAwaitingFirst);
    }

    #[tokio::test]
    async fn test_slave_failed_reads_leave_buffer() {
        let (mut master, mut slave) = pair().await;
        master.set("x", &[1; 8]).unwrap();
        master.update().await.unwrap();
        slave.update().await.unwrap();

        let mut small = [0xAAu8; 4];
        slave.set_or_get("x", &mut small).unwrap();
        assert_eq!(small, [0xAA; 4]);
        assert!(matches!(
            slave.get("x", &mut small),
            Err(StoreError::BufferTooSmall { required: 8, available: 4, .. })
        ));

        let mut large = [0xBBu8; 16];
        slave.set_or_get("x", &mut large).unwrap();
        assert_eq!(large, [0xBB; 16]);
        assert!(matches!(
            slave.get("x", &mut large),
            Err(StoreError::SizeMismatch { expected: 16, actual: 8, .. })
        ));

        let mut missing = [0xCCu8; 8];
        slave.set_or_get("y", &mut missing).unwrap();
        assert_eq!(missing, [0xCC; 8]);
        assert!(matches!(
            slave.get("y", &mut missing),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_slave_does_not_stage_values() {
        let (mut master, mut slave) = pair().await;
        master.set("x", &[1]).unwrap();
        master.update().await.unwrap();
        slave.update().await.unwrap();

        slave.set("x", &[9]).unwrap();
        assert_eq!(slave.store().get("x"), Some(&[1u8][..]));
    }

    #[tokio::test]
    async fn test_master_capacity_is_fatal() {
        let slave = Session::new(SessionConfig::builder().slave(0).build())
            .await
            .unwrap();
        let port = slave.local_addr().unwrap().port();
        let mut master = Session::new(
            SessionConfig::builder()
                .master("127.0.0.1", port)
                .max_records(1)
                .build(),
        )
        .await
        .unwrap();

        master.set_or_get("a", &mut [1]).unwrap();
        let err = master.set_or_get("b", &mut [2]).unwrap_err();
        assert!(matches!(
            err,
            DgrError::Store(StoreError::CapacityExceeded { capacity: 1 })
        ));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_slave_liveness_timeout() {
        let slave_config = SessionConfig::builder()
            .slave(0)
            .liveness_window(Duration::from_millis(100))
            .build();
        let mut slave = Session::new(slave_config).await.unwrap();
        let port = slave.local_addr().unwrap().port();
        let mut master = Session::new(SessionConfig::builder().master("127.0.0.1", port).build())
            .await
            .unwrap();

        master.set("x", &[1]).unwrap();
        master.update().await.unwrap();
        slave.update().await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        let err = slave.update().await.unwrap_err();
        assert!(matches!(
            err,
            DgrError::Replication(ReplicationError::MasterSilent { .. })
        ));
    }

    #[tokio::test]
    async fn test_reinit_releases_records() {
        let (mut master, slave) = pair().await;
        let port = slave.local_addr().unwrap().port();
        master.set("x", &[1]).unwrap();
        assert_eq!(master.store().len(), 1);

        master
            .reinit(SessionConfig::builder().master("127.0.0.1", port).build())
            .await
            .unwrap();
        assert!(master.store().is_empty());
        assert!(master.is_enabled());

        master.reinit(SessionConfig::default()).await.unwrap();
        assert!(!master.is_enabled());
        assert!(!master.is_master());
    }
}
