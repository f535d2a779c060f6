//! Shared vocabulary for the clock manager: arena ids, the static topology
//! descriptor, the collaborator traits the engine consumes, and PLL math.

pub mod error;
pub use error::*;
pub mod ids;
pub use ids::*;
pub mod monitor;
pub use monitor::*;
pub mod platform;
pub use platform::*;
pub mod pll;
pub mod topology;
pub use topology::*;

/// Target of a multiplexer switch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MuxSelect {
    Clock(ClockId),
    /// Encoded selector, only meaningful on value-indexed muxes.
    Value(u32),
}

impl From<ClockId> for MuxSelect {
    fn from(id: ClockId) -> Self { MuxSelect::Clock(id) }
}
