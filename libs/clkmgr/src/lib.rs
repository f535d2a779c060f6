//! Refcounted clock graph for a SoC: gates, PLLs, source multiplexers and the power
//! islands that feed them.
//!
//! All state lives in one [`ClockManager`] behind a single lock. Public calls take the
//! lock once and hold it across the whole dependency walk, including PLL settle delays.

mod clock;
mod context;
mod domain;
mod idle;
mod init;
#[cfg(feature = "mmio")]
pub mod mmio;
mod monitor;
mod mux;
mod pll;
#[cfg(test)]
mod test;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub use clkmgr_api::*;
pub use idle::SleepReport;

use crate::context::Inner;
use crate::monitor::MonitorList;

pub struct ClockManager {
    inner: Mutex<Inner>,
    monitors: Arc<MonitorList>,
}

impl ClockManager {
    /// Builds the graph from `topology`. Nothing touches hardware until [`ClockManager::init`].
    pub fn new(topology: Topology, config: Config, platform: Platform) -> Self {
        let monitors = Arc::new(MonitorList::new());
        ClockManager { inner: Mutex::new(Inner::new(topology, config, platform, monitors.clone())), monitors }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|_| panic!("clock lock poisoned by a panicking caller"))
    }

    fn lock_initialized(&self) -> MutexGuard<'_, Inner> {
        let inner = self.lock();
        inner.assert_initialized();
        inner
    }

    /// Reconciles the mirror with hardware. Must be called exactly once.
    pub fn init(&self) -> Result<(), Error> { self.lock().init() }

    pub fn is_initialized(&self) -> bool { self.lock().initialized }

    pub fn enable(&self, id: ClockId, tag: &str) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        inner.check_validity(id);
        log::trace!("{} enables {}", tag, inner.clock(id).desc.name);
        inner.enable_clock(id)
    }

    pub fn disable(&self, id: ClockId, tag: &str) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        inner.check_validity(id);
        log::trace!("{} disables {}", tag, inner.clock(id).desc.name);
        inner.disable_clock(id)
    }

    pub fn is_on(&self, id: ClockId) -> bool {
        let inner = self.lock();
        inner.check_validity(id);
        inner.clock_state(id)
    }

    pub fn set_force_on(&self, id: ClockId) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        inner.check_validity(id);
        inner.set_force_on(id)
    }

    pub fn clear_force_on(&self, id: ClockId) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        inner.check_validity(id);
        inner.clear_force_on(id)
    }

    pub fn is_force_on(&self, id: ClockId) -> bool { self.lock().clock(id).force_on }

    pub fn clock_mask(&self, id: ClockId) -> u32 { self.lock().clock(id).desc.mask }

    pub fn clock_name(&self, id: ClockId) -> &'static str { self.lock().clock(id).desc.name }

    pub fn clock_refcount(&self, id: ClockId) -> u32 { self.lock().clock(id).refcount }

    /// Upstream clock currently feeding `id`.
    pub fn clock_source(&self, id: ClockId) -> Option<ClockId> { self.lock().clock(id).source }

    /// Gate bits of `id` that are running; all clear while the owning domain is down.
    pub fn group_state(&self, id: GroupId) -> u32 { self.lock().group_effective_state(id) }

    pub fn clock_by_name(&self, name: &str) -> Option<ClockId> { self.lock().clock_by_name(name) }

    pub fn pll_by_name(&self, name: &str) -> Option<PllId> { self.lock().pll_by_name(name) }

    pub fn domain_by_name(&self, name: &str) -> Option<DomainId> { self.lock().domain_by_name(name) }

    pub fn mux_by_name(&self, name: &str) -> Option<MuxId> { self.lock().mux_by_name(name) }

    /// Re-points a mux. Selecting the current input is a no-op.
    pub fn mux_select(&self, id: MuxId, target: impl Into<MuxSelect>, tag: &str) -> Result<(), Error> {
        let target = target.into();
        let mut inner = self.lock_initialized();
        if let MuxSelect::Clock(c) = target {
            inner.check_validity(c);
        }
        log::trace!("{} selects {:?} on {}", tag, target, inner.mux(id).name);
        inner.select_mux(id, target)
    }

    pub fn mux_get(&self, id: MuxId) -> ClockId { self.lock().mux_get(id) }

    /// Encoded selector of the current input, relative to the mux's field offset.
    pub fn mux_get_value(&self, id: MuxId) -> u32 { self.lock().mux_get_value(id) }

    /// Enables the mux's drain gate.
    pub fn enable_mux(&self, id: MuxId, tag: &str) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        log::trace!("{} enables mux {}", tag, inner.mux(id).name);
        inner.enable_mux(id)
    }

    pub fn disable_mux(&self, id: MuxId, tag: &str) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        log::trace!("{} disables mux {}", tag, inner.mux(id).name);
        inner.disable_mux(id)
    }

    pub fn pll_enable(&self, id: PllId) {
        let mut inner = self.lock_initialized();
        inner.enable_pll(id);
    }

    pub fn pll_disable(&self, id: PllId) {
        let mut inner = self.lock_initialized();
        inner.disable_pll(id);
    }

    pub fn pll_is_on(&self, id: PllId) -> bool { self.lock().pll_state(id) }

    pub fn pll_refcount(&self, id: PllId) -> u32 { self.lock().pll(id).refcount }

    /// Writes a new divider/multiplier selection. Ignored by fixed-frequency PLLs.
    pub fn pll_set_frequency(&self, id: PllId, value: u32) -> Result<(), Error> {
        self.lock_initialized().set_pll_frequency(id, value)
    }

    pub fn pll_set_hopping(&self, id: PllId, enable: bool) -> Result<(), Error> {
        self.lock_initialized().set_pll_hopping(id, enable)
    }

    pub fn pll_vco_khz(&self, id: PllId) -> u32 { self.lock().pll_vco_khz(id) }

    pub fn pll_frequency_khz(&self, id: PllId) -> u32 { self.lock().pll_frequency_khz(id) }

    pub fn domain_enable(&self, id: DomainId) -> Result<(), Error> { self.lock_initialized().enable_domain(id) }

    /// Powers the domain down unless a gate in one of its groups is still on.
    pub fn domain_disable(&self, id: DomainId) -> Result<(), Error> {
        self.lock_initialized().disable_domain(id, false)
    }

    pub fn domain_disable_forced(&self, id: DomainId) -> Result<(), Error> {
        self.lock_initialized().disable_domain(id, true)
    }

    pub fn domain_is_on(&self, id: DomainId) -> bool { self.lock().domain_state(id) }

    pub fn register_resource_monitor(&self, monitor: Arc<dyn ResourceMonitor>) -> MonitorToken {
        self.monitors.register(monitor)
    }

    /// Returns false if `token` was not registered.
    pub fn unregister_resource_monitor(&self, token: MonitorToken) -> bool { self.monitors.unregister(token) }

    pub fn modem_power_on(&self, id: DomainId) -> Result<(), Error> {
        let mut inner = self.lock_initialized();
        assert_modem(&inner, id);
        inner.enable_domain(id)
    }

    /// Waits up to `timeout_ms` for the modem to report sleep, then cuts its power.
    /// Returns whether it went to sleep in time. The lock is released while polling.
    pub fn modem_power_off(&self, id: DomainId, timeout_ms: u32) -> Result<bool, Error> {
        let poll = {
            let inner = self.lock_initialized();
            assert_modem(&inner, id);
            Duration::from_millis(inner.config.modem_poll_ms as u64)
        };
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        let slept = loop {
            if self.lock().platform.sequencer.modem_asleep(id) {
                break true;
            }
            let now = Instant::now();
            if now >= deadline {
                log::warn!("modem {} did not sleep within {} ms", id, timeout_ms);
                break false;
            }
            std::thread::sleep(poll.min(deadline - now));
        };
        self.lock().disable_domain(id, true)?;
        Ok(slept)
    }

    /// ORs the running bits of each group under `condition[i]` into `block[i]`.
    /// Returns true if no group blocks idle entry.
    pub fn idle_can_enter(&self, condition: &[u32], block: &mut [u32]) -> bool {
        self.lock_initialized().idle_can_enter(condition, block)
    }

    pub fn sleep_check(&self) -> SleepReport { self.lock_initialized().sleep_check() }

    /// Forces every domain off regardless of running gates.
    pub fn force_off_all(&self) -> Result<(), Error> { self.lock_initialized().force_off_all() }

    #[cfg(test)]
    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&Inner) -> R) -> R { f(&self.lock()) }

    #[cfg(test)]
    pub(crate) fn with_inner_mut<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R { f(&mut self.lock()) }
}

fn assert_modem(inner: &Inner, id: DomainId) {
    let domain = &inner.domain(id).desc;
    assert!(domain.kind == DomainKind::Modem, "domain {} is not a modem", domain.name);
}
