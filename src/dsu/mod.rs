//! cemuhook DSU protocol support
//!
//! Everything a DSU consumer (an emulator or motion-aware application) needs
//! from this process:
//! - wire framing with CRC32 integrity
//! - pad slot metadata and client subscription bookkeeping
//! - the UDP server with tick-driven broadcast

pub mod constants;
pub mod packet;
pub mod server;
pub mod types;

// Re-export commonly used items
pub use server::{DsuServer, DsuServerError, MotionFrame};
pub use types::{DsBattery, DsConnection, DsModel, DsState, DualShockPadMeta, MacAddress};
