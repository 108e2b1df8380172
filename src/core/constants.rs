//! Protocol constants for DGR.
//!
//! Wire-format values are fixed by the protocol and MUST NOT be changed;
//! the timing values are defaults that [`SessionConfig`] may override.
//!
//! [`SessionConfig`]: crate::session::SessionConfig

use std::time::Duration;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Selects the session role: `master` or `slave`. Anything else disables DGR.
pub const ENV_MODE: &str = "DGR_MODE";

/// Destination address the master sends to.
pub const ENV_MASTER_DEST_IP: &str = "DGR_MASTER_DEST_IP";

/// Destination port the master sends to.
pub const ENV_MASTER_DEST_PORT: &str = "DGR_MASTER_DEST_PORT";

/// Port a slave listens on.
pub const ENV_SLAVE_LISTEN_PORT: &str = "DGR_SLAVE_LISTEN_PORT";

/// Destination address that tells a master not to transmit at all.
pub const DISABLED_DEST_ADDR: &str = "0.0.0.0";

// =============================================================================
// RECORD STORE
// =============================================================================

/// Longest record name in bytes (excluding the NUL terminator on the wire).
pub const MAX_NAME_LEN: usize = 1023;

/// Default hard cap on the number of records in a store.
pub const MAX_RECORDS: usize = 1024;

/// Largest payload representable by the wire size field.
pub const MAX_PAYLOAD_SIZE: usize = i32::MAX as usize;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Name terminator.
pub const NAME_TERMINATOR: u8 = 0x00;

/// Width of the size field (`i32`, native endianness).
pub const SIZE_FIELD_LEN: usize = 4;

/// Largest UDP payload over IPv4 (65535 - 8 byte UDP header - 20 byte IP header).
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Default receive buffer size.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65_535;

// =============================================================================
// TIMING
// =============================================================================

/// How long a slave waits for its very first packet before giving up.
pub const FIRST_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum silence after the first packet before a slave declares the master dead.
pub const LIVENESS_WINDOW: Duration = Duration::from_secs(15);
