use clkmgr_api::pll::*;
use clkmgr_api::*;

use crate::context::Inner;

impl Inner {
    pub(crate) fn enable_pll(&mut self, id: PllId) {
        let node = self.pll_mut(id);
        node.refcount =
            node.refcount.checked_add(1).unwrap_or_else(|| panic!("pll {} refcount overflow", node.desc.name));
        if node.refcount > 1 || node.on {
            return;
        }
        self.pll_hw_enable(id);
        self.pll_mut(id).on = true;
        if let Err(e) = self.sync_hopping(id) {
            log::warn!("pll {}: {}", self.pll(id).desc.name, e);
        }
    }

    pub(crate) fn disable_pll(&mut self, id: PllId) {
        let node = self.pll_mut(id);
        assert!(node.refcount > 0, "pll {} disabled more often than enabled", node.desc.name);
        node.refcount -= 1;
        if node.refcount > 0 || !node.on {
            return;
        }
        // hopping must be off before the loop stops
        self.pll_mut(id).on = false;
        if let Err(e) = self.sync_hopping(id) {
            log::warn!("pll {}: {}", self.pll(id).desc.name, e);
        }
        self.pll_hw_disable(id);
    }

    /// Power up, release isolation, run, then release reset. Each step settles before the next.
    pub(crate) fn pll_hw_enable(&self, id: PllId) {
        let pll = &self.pll(id).desc;
        let port = self.port();
        log::trace!("pll {} on", pll.name);
        port.set_bits(pll.pwr, PLL_PWR_ON);
        port.delay_us(self.config.pll_power_on_us);
        port.clear_bits(pll.pwr, PLL_ISO_EN);
        port.delay_us(self.config.pll_isolation_us);
        port.set_bits(pll.con0, pll.en_mask);
        port.delay_us(self.config.pll_enable_us);
        if pll.features.contains(PllFeatures::RESET_BAR) {
            port.set_bits(pll.con0, PLL_RST_BAR);
        }
    }

    pub(crate) fn pll_hw_disable(&self, id: PllId) {
        let pll = &self.pll(id).desc;
        let port = self.port();
        log::trace!("pll {} off", pll.name);
        if pll.features.contains(PllFeatures::RESET_BAR) {
            port.clear_bits(pll.con0, PLL_RST_BAR);
        }
        port.clear_bits(pll.con0, pll.en_mask);
        port.set_bits(pll.pwr, PLL_ISO_EN);
        port.clear_bits(pll.pwr, PLL_PWR_ON);
    }

    pub(crate) fn hw_pll_on(&self, id: PllId) -> bool { self.port().read(self.pll(id).desc.con0) & PLL_EN != 0 }

    pub(crate) fn pll_state(&self, id: PllId) -> bool {
        if self.initialized { self.pll(id).on } else { self.hw_pll_on(id) }
    }

    pub(crate) fn set_pll_frequency(&mut self, id: PllId, value: u32) -> Result<(), Error> {
        let pll = &self.pll(id).desc;
        if pll.features.contains(PllFeatures::FIXED_FREQ) {
            log::debug!("pll {} has a fixed frequency, ignoring select {:#x}", pll.name, value);
            return Ok(());
        }
        let port = self.port();
        let running = port.read(pll.con0) & PLL_EN != 0;
        let con1 = select_frequency(pll.kind, port.read(pll.con1), value, running);
        log::trace!("pll {} con1 <- {:#x}", pll.name, con1);
        port.write(pll.con1, con1);
        if running {
            port.delay_us(self.config.pll_freq_change_us);
        }
        if self.pll(id).hop_engaged {
            // re-arm with the new vco
            self.pll_mut(id).hop_engaged = false;
            return self.sync_hopping(id);
        }
        Ok(())
    }

    pub(crate) fn pll_vco_khz(&self, id: PllId) -> u32 {
        let pll = &self.pll(id).desc;
        vco_khz(pll.kind, self.port().read(pll.con1))
    }

    pub(crate) fn pll_frequency_khz(&self, id: PllId) -> u32 {
        let pll = &self.pll(id).desc;
        output_khz(pll.kind, self.port().read(pll.con1))
    }

    pub(crate) fn set_pll_hopping(&mut self, id: PllId, enable: bool) -> Result<(), Error> {
        self.pll_mut(id).hop_switch = enable;
        self.sync_hopping(id)
    }

    /// Brings the hopping engine in line with `on && hop_switch` for PLLs that own a channel.
    pub(crate) fn sync_hopping(&mut self, id: PllId) -> Result<(), Error> {
        let node = self.pll(id);
        if !self.initialized {
            // armed once the boot reconcile is done
            return Ok(());
        }
        let want = node.desc.features.contains(PllFeatures::HOPPING) && node.on && node.hop_switch;
        if want == node.hop_engaged {
            return Ok(());
        }
        let (hop_id, vco) = (node.desc.hop_id, self.pll_vco_khz(id));
        let hopping = match self.platform.hopping.as_mut() {
            Some(h) => h,
            None => return Ok(()),
        };
        log::trace!("hopping {} on channel {} at {} kHz", if want { "on" } else { "off" }, hop_id, vco);
        hopping.configure(hop_id, vco, want)?;
        self.pll_mut(id).hop_engaged = want;
        Ok(())
    }
}
