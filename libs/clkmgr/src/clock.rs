//! Refcounted clock gate engine.
//!
//! Every helper here runs with the clock lock held and recurses through `&mut Inner`.
//! A gate that is on holds exactly one claim on its parent PLL, its source clock and
//! its group's power domain; those claims are taken when it turns on and dropped when
//! it turns off.

use clkmgr_api::*;

use crate::context::Inner;

impl Inner {
    pub(crate) fn enable_clock(&mut self, id: ClockId) -> Result<(), Error> {
        let node = self.clock_mut(id);
        node.refcount =
            node.refcount.checked_add(1).unwrap_or_else(|| panic!("clock {} refcount overflow", node.desc.name));
        if node.refcount > 1 {
            return Ok(());
        }
        let (parent, source, group, was_on) = (node.desc.parent, node.source, node.desc.group, node.on);

        #[cfg(feature = "state-check")]
        self.check_clock_state(id);

        if was_on {
            // still running from a force-on hold, so the upstream claims are already in place
            return self.power_prepare(group).map_err(|e| {
                self.clock_mut(id).refcount -= 1;
                e
            });
        }

        log::trace!("enable {}", self.clock(id).desc.name);
        if let Some(p) = parent {
            self.enable_pll(p);
        }
        if let Some(s) = source {
            if let Err(e) = self.enable_clock(s) {
                self.unwind_enable(id, None, parent);
                return Err(e);
            }
        }
        if let Err(e) = self.power_prepare(group) {
            self.unwind_enable(id, source, parent);
            return Err(e);
        }

        self.clock_hw_enable(id);
        let mask = self.clock(id).desc.mask;
        self.clock_mut(id).on = true;
        self.group_mut(group).state |= mask;
        Ok(())
    }

    /// Drops the claims taken by a first enable that could not complete.
    fn unwind_enable(&mut self, id: ClockId, source: Option<ClockId>, parent: Option<PllId>) {
        self.clock_mut(id).refcount -= 1;
        if let Some(s) = source {
            if let Err(e) = self.disable_clock(s) {
                log::warn!("unwinding {}: {}", self.clock(id).desc.name, e);
            }
        }
        if let Some(p) = parent {
            self.disable_pll(p);
        }
    }

    pub(crate) fn disable_clock(&mut self, id: ClockId) -> Result<(), Error> {
        let node = self.clock_mut(id);
        assert!(node.refcount > 0, "clock {} disabled more often than enabled", node.desc.name);
        node.refcount -= 1;
        if node.refcount > 0 {
            return Ok(());
        }

        #[cfg(feature = "state-check")]
        self.check_clock_state(id);

        let node = self.clock(id);
        if !node.on || node.force_on {
            return Ok(());
        }
        self.release_clock(id)
    }

    /// Turns a running clock off and drops its upstream claims: own bit first, then the
    /// domain, then the source, then the PLL. A domain that refuses to power down is
    /// reported after the rest of the teardown has completed.
    pub(crate) fn release_clock(&mut self, id: ClockId) -> Result<(), Error> {
        let node = self.clock(id);
        let (parent, source, group, mask) = (node.desc.parent, node.source, node.desc.group, node.desc.mask);
        log::trace!("disable {}", node.desc.name);

        self.clock_hw_disable(id);
        self.clock_mut(id).on = false;
        self.group_mut(group).state &= !mask;

        let mut result = self.power_finish(group);
        if let Some(s) = source {
            let r = self.disable_clock(s);
            result = result.and(r);
        }
        if let Some(p) = parent {
            self.disable_pll(p);
        }
        result
    }

    fn power_prepare(&mut self, group: GroupId) -> Result<(), Error> {
        match self.group(group).desc.domain {
            Some(d) => self.enable_domain(d),
            None => Ok(()),
        }
    }

    fn power_finish(&mut self, group: GroupId) -> Result<(), Error> {
        match self.group(group).desc.domain {
            Some(d) => self.disable_domain(d, false),
            None => Ok(()),
        }
    }

    /// Holds the clock on without a refcount. A clock that is off is brought up with its
    /// upstream claims first, exactly as a client enable would.
    pub(crate) fn set_force_on(&mut self, id: ClockId) -> Result<(), Error> {
        if !self.clock(id).on {
            self.enable_clock(id)?;
            self.clock_mut(id).refcount -= 1;
        }
        self.clock_mut(id).force_on = true;
        Ok(())
    }

    pub(crate) fn clear_force_on(&mut self, id: ClockId) -> Result<(), Error> {
        let node = self.clock_mut(id);
        node.force_on = false;
        if node.on && node.refcount == 0 {
            // the hold was the only thing keeping it running
            return self.release_clock(id);
        }
        Ok(())
    }

    /// Logical state; hardware before init, mirror after.
    pub(crate) fn clock_state(&self, id: ClockId) -> bool {
        if self.initialized { self.clock(id).on } else { self.hw_clock_on(id) }
    }

    pub(crate) fn hw_clock_on(&self, id: ClockId) -> bool {
        let clock = &self.clock(id).desc;
        let group = &self.group(clock.group).desc;
        if let Some(d) = group.domain {
            if !self.domain_state(d) {
                return false;
            }
        }
        match clock.kind {
            ClockKind::Gate | ClockKind::ReadModifyWrite => self.port().read(group.sta) & clock.mask == 0,
            ClockKind::Enable | ClockKind::ReadModifyWriteEnable => self.port().read(group.sta) & clock.mask != 0,
            ClockKind::AlwaysOn => true,
        }
    }

    /// Ungates the clock in hardware without touching refcounts or the mirror.
    pub(crate) fn clock_hw_enable(&self, id: ClockId) {
        let clock = &self.clock(id).desc;
        let group = &self.group(clock.group).desc;
        match clock.kind {
            ClockKind::Gate => self.port().write(group.clr, clock.mask),
            ClockKind::Enable => self.port().write(group.set, clock.mask),
            ClockKind::ReadModifyWrite => self.port().clear_bits(group.sta, clock.mask),
            ClockKind::ReadModifyWriteEnable => self.port().set_bits(group.sta, clock.mask),
            ClockKind::AlwaysOn => (),
        }
    }

    /// Gates the clock in hardware without touching refcounts or the mirror.
    pub(crate) fn clock_hw_disable(&self, id: ClockId) {
        let clock = &self.clock(id).desc;
        let group = &self.group(clock.group).desc;
        match clock.kind {
            ClockKind::Gate => self.port().write(group.set, clock.mask),
            ClockKind::Enable => self.port().write(group.clr, clock.mask),
            ClockKind::ReadModifyWrite => self.port().set_bits(group.sta, clock.mask),
            ClockKind::ReadModifyWriteEnable => self.port().clear_bits(group.sta, clock.mask),
            ClockKind::AlwaysOn => (),
        }
    }

    #[cfg(feature = "state-check")]
    fn check_clock_state(&self, id: ClockId) {
        let node = self.clock(id);
        if !self.initialized || node.desc.kind == ClockKind::AlwaysOn {
            return;
        }
        // a forced teardown leaves the mirror ahead of an unpowered island
        if let Some(d) = self.group(node.desc.group).desc.domain {
            if !self.domain_state(d) {
                return;
            }
        }
        let hw = self.hw_clock_on(id);
        assert_eq!(hw, node.on, "clock {} mirror disagrees with hardware", node.desc.name);
    }
}
