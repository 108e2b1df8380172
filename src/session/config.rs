//! Session configuration.
//!
//! A session is configured once, normally from the `DGR_*` environment
//! variables, and the resulting role never changes.

use std::time::Duration;

use thiserror::Error;

use crate::core::constants::{
    DEFAULT_RECV_BUFFER_SIZE, ENV_MASTER_DEST_IP, ENV_MASTER_DEST_PORT, ENV_MODE,
    ENV_SLAVE_LISTEN_PORT, FIRST_RECEIVE_TIMEOUT, LIVENESS_WINDOW, MAX_RECORDS,
};

/// Errors in session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable required by the selected mode is not set.
    #[error("{var} is not set")]
    MissingVariable {
        /// Variable name.
        var: &'static str,
    },

    /// A port variable does not hold a valid port number.
    #[error("{var}={value:?} is not a valid port")]
    InvalidPort {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Role requested by the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Compute state and broadcast it.
    Master,
    /// Receive state and consume it.
    Slave,
    /// Replication is off.
    #[default]
    Disabled,
}

impl Mode {
    /// Parse a `DGR_MODE` value. Anything other than `master`/`slave` disables.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("master") => Mode::Master,
            Some("slave") => Mode::Slave,
            _ => Mode::Disabled,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Requested role.
    pub mode: Mode,

    /// Host the master sends to. `None` or `0.0.0.0` means "do not transmit".
    pub master_dest: Option<String>,

    /// Port the master sends to.
    pub master_port: Option<u16>,

    /// Port a slave listens on.
    pub slave_port: Option<u16>,

    /// How long a slave waits for its first datagram.
    pub first_receive_timeout: Duration,

    /// Maximum silence after the first datagram.
    pub liveness_window: Duration,

    /// Hard cap on the number of records.
    pub max_records: usize,

    /// Slave receive buffer size. Must exceed the largest datagram the
    /// master sends; a datagram that fills it is rejected as truncated.
    pub recv_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Disabled,
            master_dest: None,
            master_port: None,
            slave_port: None,
            first_receive_timeout: FIRST_RECEIVE_TIMEOUT,
            liveness_window: LIVENESS_WINDOW,
            max_records: MAX_RECORDS,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl SessionConfig {
    /// Create a builder.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            mode: Mode::parse(lookup(ENV_MODE).as_deref()),
            master_dest: lookup(ENV_MASTER_DEST_IP),
            master_port: parse_port(ENV_MASTER_DEST_PORT, lookup(ENV_MASTER_DEST_PORT))?,
            slave_port: parse_port(ENV_SLAVE_LISTEN_PORT, lookup(ENV_SLAVE_LISTEN_PORT))?,
            ..Self::default()
        })
    }
}

fn parse_port(var: &'static str, value: Option<String>) -> Result<Option<u16>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort { var, value })
        })
        .transpose()
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a builder with default settings (disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Act as master, sending to `host:port`.
    pub fn master(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.mode = Mode::Master;
        self.config.master_dest = Some(host.into());
        self.config.master_port = Some(port);
        self
    }

    /// Act as slave, listening on `port`.
    pub fn slave(mut self, port: u16) -> Self {
        self.config.mode = Mode::Slave;
        self.config.slave_port = Some(port);
        self
    }

    /// Set the first-receive timeout.
    pub fn first_receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.first_receive_timeout = timeout;
        self
    }

    /// Set the liveness window.
    pub fn liveness_window(mut self, window: Duration) -> Self {
        self.config.liveness_window = window;
        self
    }

    /// Set the record cap.
    pub fn max_records(mut self, max_records: usize) -> Self {
        self.config.max_records = max_records;
        self
    }

    /// Set the receive buffer size.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Finish building.
    pub fn build(self) -> SessionConfig {
        self.config
    }
}
