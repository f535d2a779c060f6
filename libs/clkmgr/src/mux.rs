//! Clock source multiplexers.
//!
//! A running drain gate holds one claim on its current source, and a mux without a drain
//! holds that claim itself. Every protocol keeps the claim count stable across a switch:
//! the new input is claimed before the selector moves and the old one released after.

use clkmgr_api::*;

use crate::context::Inner;

impl Inner {
    /// Table entry currently selected in hardware.
    pub(crate) fn mux_current(&self, id: MuxId) -> MuxEntry {
        let mux = self.mux(id);
        let reg = self.port().read(mux.reg);
        match mux.entries.iter().find(|e| e.matches(reg)) {
            Some(e) => *e,
            None => panic!("mux {} selector {:#x} matches no table entry", mux.name, reg),
        }
    }

    fn mux_entry(&self, id: MuxId, target: ClockId) -> MuxEntry {
        let mux = self.mux(id);
        match mux.entries.iter().find(|e| e.clock == target) {
            Some(e) => *e,
            None => panic!("mux {} cannot select {}", mux.name, self.clock(target).desc.name),
        }
    }

    fn mux_write(&self, id: MuxId, entry: &MuxEntry) {
        let mux = self.mux(id);
        let port = self.port();
        let reg = (port.read(mux.reg) & !entry.mask) | entry.value;
        log::trace!("mux {} <- {}", mux.name, self.clock(entry.clock).desc.name);
        port.write(mux.reg, reg);
    }

    fn mux_drain(&self, id: MuxId) -> ClockId {
        let mux = self.mux(id);
        match mux.drain {
            Some(d) => d,
            None => panic!("mux {} has no drain clock", mux.name),
        }
    }

    pub(crate) fn select_mux(&mut self, id: MuxId, select: MuxSelect) -> Result<(), Error> {
        let protocol = self.mux(id).protocol;
        let target = match select {
            MuxSelect::Clock(c) => c,
            MuxSelect::Value(v) => {
                let mux = self.mux(id);
                assert!(
                    protocol == MuxProtocol::ValueIndexed,
                    "mux {} does not take encoded selectors",
                    mux.name
                );
                match mux.entries.iter().find(|e| e.value >> mux.offset == v) {
                    Some(e) => e.clock,
                    None => panic!("mux {} has no entry encoded {}", mux.name, v),
                }
            }
        };
        match protocol {
            MuxProtocol::NonGlitchFree | MuxProtocol::ValueIndexed => self.switch_gated(id, target),
            MuxProtocol::GlitchFree => self.switch_glitch_free(id, target),
            MuxProtocol::GlitchFreeNoDrain => self.switch_undrained(id, target),
            MuxProtocol::Graphics { share, high_freq, safe } => {
                if self.clock(self.mux_drain(id)).source == Some(target) {
                    return Ok(());
                }
                let step = if target == high_freq { high_freq } else { safe };
                self.switch_undrained(share, step)?;
                self.switch_glitch_free(id, target)
            }
        }
    }

    /// Gates the drain off around the selector write.
    fn switch_gated(&mut self, id: MuxId, target: ClockId) -> Result<(), Error> {
        let drain = self.mux_drain(id);
        let entry = self.mux_entry(id, target);
        let old = self.clock(drain).source;
        if old == Some(target) {
            return Ok(());
        }
        if !self.clock(drain).on {
            self.mux_write(id, &entry);
            self.clock_mut(drain).source = Some(target);
            return Ok(());
        }

        self.clock_hw_disable(drain);
        if let Err(e) = self.enable_clock(target) {
            self.clock_hw_enable(drain);
            return Err(e);
        }
        self.mux_write(id, &entry);
        let result = match old {
            Some(o) => self.disable_clock(o),
            None => Ok(()),
        };
        self.clock_mut(drain).source = Some(target);
        self.clock_hw_enable(drain);
        result
    }

    /// Keeps both inputs live while the selector moves.
    fn switch_glitch_free(&mut self, id: MuxId, target: ClockId) -> Result<(), Error> {
        let drain = self.mux_drain(id);
        let entry = self.mux_entry(id, target);
        let old = self.clock(drain).source;
        if old == Some(target) {
            return Ok(());
        }

        let result = if self.clock(drain).on {
            self.enable_clock(target)?;
            self.mux_write(id, &entry);
            match old {
                Some(o) => self.disable_clock(o),
                None => Ok(()),
            }
        } else {
            // nothing holds either input, so bring both up just for the switch
            let current = self.mux_current(id).clock;
            self.enable_clock(target)?;
            if let Err(e) = self.enable_clock(current) {
                let _ = self.disable_clock(target);
                return Err(e);
            }
            self.mux_write(id, &entry);
            let r = self.disable_clock(target);
            r.and(self.disable_clock(current))
        };
        self.clock_mut(drain).source = Some(target);
        result
    }

    /// No drain to shield the output: the mux itself owns the claim on its input.
    fn switch_undrained(&mut self, id: MuxId, target: ClockId) -> Result<(), Error> {
        let entry = self.mux_entry(id, target);
        let current = self.mux_current(id).clock;
        if current == target {
            return Ok(());
        }
        self.enable_clock(target)?;
        self.mux_write(id, &entry);
        self.disable_clock(current)
    }

    pub(crate) fn mux_get(&self, id: MuxId) -> ClockId { self.mux_current(id).clock }

    pub(crate) fn mux_get_value(&self, id: MuxId) -> u32 { self.mux_current(id).value >> self.mux(id).offset }

    pub(crate) fn enable_mux(&mut self, id: MuxId) -> Result<(), Error> {
        let drain = self.mux_drain(id);
        self.enable_clock(drain)
    }

    pub(crate) fn disable_mux(&mut self, id: MuxId) -> Result<(), Error> {
        let drain = self.mux_drain(id);
        self.disable_clock(drain)
    }
}
