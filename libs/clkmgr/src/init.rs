//! Start-of-day reconcile of the mirror with whatever the boot firmware left running.

use clkmgr_api::*;

use crate::context::Inner;

impl Inner {
    pub(crate) fn init(&mut self) -> Result<(), Error> {
        assert!(!self.initialized, "clock manager initialized twice");
        let mut result = Ok(());

        // domains first, so everything below sees the final island state
        for i in 0..self.domains.len() {
            let id = DomainId::new(i);
            let on = self.hw_domain_on(id);
            self.domain_mut(id).on = on;
            let desc = &self.domain(id).desc;
            if on == desc.default_on {
                continue;
            }
            log::debug!("domain {} found {}, driving to default", desc.name, if on { "on" } else { "off" });
            let r = if on {
                self.platform.sequencer.power_off(id)
            } else {
                self.platform.sequencer.power_on(id)
            };
            match r {
                Ok(()) => self.domain_mut(id).on = !on,
                Err(e) => {
                    log::warn!("domain {} left {}: {}", self.domain(id).desc.name, if on { "on" } else { "off" }, e);
                    result = result.and(Err(e));
                }
            }
        }

        for i in 0..self.plls.len() {
            let id = PllId::new(i);
            let on = self.hw_pll_on(id);
            let node = self.pll_mut(id);
            node.on = on;
            node.refcount = node.desc.external_refs;
            if !on && node.refcount > 0 {
                log::debug!("pll {} owned by firmware but stopped, starting", node.desc.name);
                self.pll_hw_enable(id);
                self.pll_mut(id).on = true;
            }
        }

        // every gate found running starts with one boot claim
        let mut found_on = Vec::new();
        for i in 0..self.clocks.len() {
            let id = ClockId::new(i);
            self.check_validity(id);
            if !self.hw_clock_on(id) {
                continue;
            }
            let node = self.clock_mut(id);
            node.on = true;
            node.refcount = 1;
            let (group, mask) = (node.desc.group, node.desc.mask);
            self.group_mut(group).state |= mask;
            found_on.push(id);
        }
        log::debug!("{} of {} clocks running at boot", found_on.len(), self.clocks.len());

        for i in 0..self.muxes.len() {
            let id = MuxId::new(i);
            let selected = self.mux_current(id).clock;
            match self.mux(id).drain {
                Some(drain) => self.clock_mut(drain).source = Some(selected),
                None => {
                    let r = self.enable_clock(selected);
                    result = result.and(r);
                }
            }
        }

        for id in found_on.iter() {
            let node = self.clock(*id);
            let r = match (node.source, node.desc.parent) {
                (Some(s), _) => self.enable_clock(s),
                (None, Some(p)) => {
                    self.enable_pll(p);
                    Ok(())
                }
                (None, None) => Ok(()),
            };
            result = result.and(r);
        }

        for i in 0..self.domains.len() {
            let id = DomainId::new(i);
            if let (true, Some(c)) = (self.domain(id).on, self.domain(id).desc.companion) {
                let r = self.enable_clock(c);
                result = result.and(r);
            }
        }

        for i in 0..self.clocks.len() {
            let id = ClockId::new(i);
            if self.clock(id).desc.flags.contains(ClockFlags::FORCE_ON) {
                let r = self.set_force_on(id);
                result = result.and(r);
            }
        }

        for id in found_on.iter().rev() {
            if self.clock(*id).desc.flags.contains(ClockFlags::BOOT_CLAIM) {
                continue;
            }
            let r = self.disable_clock(*id);
            result = result.and(r);
        }

        for i in 0..self.plls.len() {
            let id = PllId::new(i);
            let node = self.pll(id);
            if node.on && node.refcount == 0 {
                log::debug!("pll {} running unclaimed, shutting down", node.desc.name);
                self.pll_hw_disable(id);
                self.pll_mut(id).on = false;
            }
        }

        self.initialized = true;
        for i in 0..self.plls.len() {
            let r = self.sync_hopping(PllId::new(i));
            result = result.and(r);
        }
        log::debug!("clock manager initialized");
        result
    }
}
