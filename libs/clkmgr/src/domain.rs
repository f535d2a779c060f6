//! Power island control.
//!
//! A domain is not refcounted. It stays up while any gate in a group it owns is set in
//! the mirror, and a plain disable against a busy domain quietly succeeds.

use clkmgr_api::*;

use crate::context::Inner;

impl Inner {
    pub(crate) fn enable_domain(&mut self, id: DomainId) -> Result<(), Error> {
        let domain = &self.domain(id).desc;
        if self.domain(id).on {
            return Ok(());
        }
        let (name, companion, arbiter) = (domain.name, domain.companion, domain.arbiter);

        #[cfg(feature = "state-check")]
        self.check_domain_state(id);

        if let Some(c) = companion {
            self.enable_clock(c)?;
        }
        log::trace!("domain {} power on", name);
        if let Err(e) = self.platform.sequencer.power_on(id) {
            log::warn!("domain {} did not power on: {}", name, e);
            if let Some(c) = companion {
                // already failing; the sequencer error is the one reported
                let _ = self.disable_clock(c);
            }
            return Err(e);
        }
        self.domain_mut(id).on = true;
        if let Some(arbiter) = arbiter {
            self.arbiter_pass(&arbiter, |m, index| m.restore(index));
        }
        Ok(())
    }

    pub(crate) fn disable_domain(&mut self, id: DomainId, force: bool) -> Result<(), Error> {
        if !force {
            if let Some(g) = self.domain(id).groups.iter().find(|g| self.group(**g).state != 0) {
                log::trace!("domain {} held up by group {}", self.domain(id).desc.name, self.group(*g).desc.name);
                return Ok(());
            }
        }
        if !self.domain(id).on {
            return Ok(());
        }

        #[cfg(feature = "state-check")]
        self.check_domain_state(id);

        let domain = &self.domain(id).desc;
        let (name, companion, arbiter) = (domain.name, domain.companion, domain.arbiter);

        if let Some(arbiter) = arbiter {
            self.arbiter_pass(&arbiter, |m, index| m.backup(index));
        }
        log::trace!("domain {} power off{}", name, if force { " (forced)" } else { "" });
        if let Err(e) = self.platform.sequencer.power_off(id) {
            log::warn!("domain {} did not power off: {}", name, e);
            return Err(e);
        }
        self.domain_mut(id).on = false;
        if let Some(c) = companion {
            self.disable_clock(c)?;
        }
        Ok(())
    }

    /// Makes the arbiter's shadow registers reachable, runs `f` on every monitor in
    /// calling order, then puts the arbiter gate back the way it was. Only the hardware
    /// bit moves; the gate's refcount and mirror are untouched.
    fn arbiter_pass<F>(&self, arbiter: &ArbiterDesc, f: F)
    where
        F: Fn(&dyn ResourceMonitor, usize),
    {
        let monitors = self.monitors.snapshot();
        let was_running = self.hw_clock_on(arbiter.clock);
        if !was_running {
            self.clock_hw_enable(arbiter.clock);
        }
        for monitor in monitors.iter() {
            f(monitor.as_ref(), arbiter.index);
        }
        if !was_running {
            self.clock_hw_disable(arbiter.clock);
        }
    }

    /// Forces every domain off, last first.
    pub(crate) fn force_off_all(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for i in (0..self.domains.len()).rev() {
            let r = self.disable_domain(DomainId::new(i), true);
            result = result.and(r);
        }
        result
    }

    #[cfg(feature = "state-check")]
    fn check_domain_state(&self, id: DomainId) {
        if !self.initialized {
            return;
        }
        let node = self.domain(id);
        assert_eq!(self.hw_domain_on(id), node.on, "domain {} mirror disagrees with hardware", node.desc.name);
    }
}
