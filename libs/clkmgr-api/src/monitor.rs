/// Calling order of resource monitors around an arbiter power transition.
/// Monitors run from `Early` to `Late`; equal levels run in registration order.
#[derive(num_derive::FromPrimitive, num_derive::ToPrimitive, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MonitorLevel {
    Early,
    Normal,
    Late,
}
impl MonitorLevel {
    pub fn next(&self) -> MonitorLevel {
        match self {
            MonitorLevel::Early => MonitorLevel::Normal,
            MonitorLevel::Normal => MonitorLevel::Late,
            MonitorLevel::Late => MonitorLevel::Late,
        }
    }
}

/// Client state living in a shared memory arbiter that does not survive a power cycle.
///
/// Callbacks run with the clock lock held and must not call back into the clock manager.
pub trait ResourceMonitor: Send + Sync {
    fn level(&self) -> MonitorLevel { MonitorLevel::Normal }

    /// Save shadow registers of `arbiter` before its domain loses power.
    fn backup(&self, _arbiter: usize) {}

    /// Restore shadow registers of `arbiter` after its domain regains power.
    fn restore(&self, _arbiter: usize) {}
}
