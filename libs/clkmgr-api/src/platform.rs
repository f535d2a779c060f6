use crate::{Address, DomainId, Error};

/// Atomic, ordered access to the SoC register space.
///
/// Implementations must not have side effects beyond the addressed register.
pub trait RegisterPort: Send {
    fn read(&self, addr: Address) -> u32;

    fn write(&self, addr: Address, value: u32);

    fn set_bits(&self, addr: Address, mask: u32) {
        let v = self.read(addr);
        self.write(addr, v | mask);
    }

    fn clear_bits(&self, addr: Address, mask: u32) {
        let v = self.read(addr);
        self.write(addr, v & !mask);
    }

    /// Busy-waits; must not yield, since the caller holds the clock lock.
    fn delay_us(&self, us: u32);
}

/// Hands power-island transitions to firmware or the PMIC.
pub trait PowerSequencer: Send {
    fn power_on(&mut self, domain: DomainId) -> Result<(), Error>;

    fn power_off(&mut self, domain: DomainId) -> Result<(), Error>;

    /// Whether a modem island has reached its sleep state and may be cut.
    fn modem_asleep(&mut self, _domain: DomainId) -> bool { true }
}

/// Spread-spectrum frequency hopping engine.
pub trait FreqHopping: Send {
    fn configure(&mut self, hop_id: u32, vco_khz: u32, enable: bool) -> Result<(), Error>;
}

/// Everything the engine consumes from its environment.
pub struct Platform {
    pub port: Box<dyn RegisterPort>,
    pub sequencer: Box<dyn PowerSequencer>,
    pub hopping: Option<Box<dyn FreqHopping>>,
}

impl Platform {
    pub fn new(port: Box<dyn RegisterPort>, sequencer: Box<dyn PowerSequencer>) -> Self {
        Platform { port, sequencer, hopping: None }
    }

    pub fn with_hopping(mut self, hopping: Box<dyn FreqHopping>) -> Self {
        self.hopping = Some(hopping);
        self
    }
}

/// Runtime tunables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// Settle time after asserting PLL power.
    pub pll_power_on_us: u32,
    /// Settle time after releasing PLL isolation.
    pub pll_isolation_us: u32,
    /// Lock time after asserting the PLL enable bits.
    pub pll_enable_us: u32,
    /// Settle time after a frequency change on a running PLL.
    pub pll_freq_change_us: u32,
    /// How often a modem is polled for sleep before it is cut.
    pub modem_poll_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pll_power_on_us: 1,
            pll_isolation_us: 1,
            pll_enable_us: 20,
            pll_freq_change_us: 20,
            modem_poll_ms: 100,
        }
    }
}
