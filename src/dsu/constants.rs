//! DSU protocol constants
//!
//! Wire-format and sizing constants for the cemuhook DSU scheme:
//! - packet magic and framing sizes
//! - protocol version ceiling
//! - slot count and default port
//! - send-pool and timing tunables

use std::time::Duration;

// ============================================================================
// Wire format
// ============================================================================

/// Magic prefix on server-origin packets
pub const SERVER_MAGIC: [u8; 4] = *b"DSUS";

/// Magic prefix on client-origin packets
pub const CLIENT_MAGIC: [u8; 4] = *b"DSUC";

/// Highest protocol version this server speaks; higher client versions are
/// rejected
pub const MAX_PROTOCOL_VERSION: u16 = 1001;

/// Fixed header: magic(4) + version(2) + length(2) + crc32(4) + server id(4)
pub const HEADER_LEN: usize = 16;

/// Total size of a PadDataRsp packet, header included
pub const PAD_DATA_RSP_LEN: usize = 100;

// ============================================================================
// Server shape
// ============================================================================

/// Virtual pad slots the server reports
pub const NUM_SLOTS: usize = 4;

/// Port DSU clients connect to by default
pub const DSU_PORT: u16 = 26760;

/// Inbound datagram buffer size
pub const RECV_BUFFER_LEN: usize = 1024;

// ============================================================================
// Tunables (empirically chosen, not load-bearing)
// ============================================================================

/// Simultaneously in-flight sends admitted by the pool
pub const SEND_POOL_LEN: usize = 80;

/// Size of each pre-allocated send buffer
pub const SEND_BUFFER_LEN: usize = 128;

/// A subscription scope stays live this long after its last request
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Battery tag refresh cadence
pub const BATTERY_REFRESH: Duration = Duration::from_secs(1);
