//! Static description of a chip's clock tree.
//!
//! A [`Topology`] is built once at start of day and handed to the engine, which never
//! adds or removes entities afterwards. All cross references are arena indices.

use bitflags::bitflags;

use crate::{ClockId, DomainId, GroupId, MuxId, PllId};

/// Absolute register location as seen by the [`crate::RegisterPort`].
pub type Address = usize;

/// Hardware access pattern of a clock gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockKind {
    /// Bit set means gated. Enable writes the clear register, disable the set register.
    Gate,
    /// Bit set means running. Enable writes the set register, disable the clear register.
    Enable,
    /// Gate bit in a single read/write register without set/clear aliases.
    ReadModifyWrite,
    /// Enable bit in a single read/write register without set/clear aliases.
    ReadModifyWriteEnable,
    /// No controllable hardware; always reads as running.
    AlwaysOn,
}

bitflags! {
    /// Boot-time policy for a clock gate.
    pub struct ClockFlags: u32 {
        /// A clock found running at boot keeps its boot claim until a client releases it.
        const BOOT_CLAIM = 1 << 0;
        /// `force_on` is set during init.
        const FORCE_ON = 1 << 1;
    }
}

bitflags! {
    pub struct PllFeatures: u32 {
        /// Has a reset-bar bit that must be released after the enable bits.
        const RESET_BAR = 1 << 0;
        /// Owns a frequency-hopping channel.
        const HOPPING = 1 << 1;
        /// Output frequency is fixed; frequency select is ignored.
        const FIXED_FREQ = 1 << 2;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PllKind {
    /// Sigma-delta PLL programmed through an integer/fractional multiplier and post divider.
    Sdm,
    /// Integer feedback-divider PLL.
    Universal,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DomainKind {
    Modem,
    Media,
    Other,
}

/// Switching protocol used when a multiplexer is re-pointed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MuxProtocol {
    /// Gate the drain off around the selector write.
    NonGlitchFree,
    /// Keep old and new source live across the selector write.
    GlitchFree,
    /// No drain gate; the mux itself holds a claim on its current source.
    GlitchFreeNoDrain,
    /// Step the shared graphics mux to a safe input first, then switch glitch-free.
    Graphics {
        /// The share mux stepped first. Must be a [`MuxProtocol::GlitchFreeNoDrain`] mux.
        share: MuxId,
        /// Destination that the share mux may feed directly.
        high_freq: ClockId,
        /// Share mux input used for every other destination.
        safe: ClockId,
    },
    /// Selections are requested by encoded value rather than by clock.
    ValueIndexed,
}

#[derive(Debug, Clone)]
pub struct ClockDesc {
    pub name: &'static str,
    pub group: GroupId,
    pub mask: u32,
    pub kind: ClockKind,
    /// Upstream clock kept running while this one runs. Mux drains get theirs at init.
    pub source: Option<ClockId>,
    /// PLL feeding this gate directly.
    pub parent: Option<PllId>,
    pub flags: ClockFlags,
}

impl ClockDesc {
    pub fn new(name: &'static str, group: GroupId, mask: u32, kind: ClockKind) -> Self {
        ClockDesc { name, group, mask, kind, source: None, parent: None, flags: ClockFlags::empty() }
    }

    pub fn with_source(mut self, source: ClockId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_parent(mut self, parent: PllId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_flags(mut self, flags: ClockFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GroupDesc {
    pub name: &'static str,
    pub set: Address,
    pub clr: Address,
    pub sta: Address,
    /// Power island that must be up for any member to run.
    pub domain: Option<DomainId>,
}

impl GroupDesc {
    pub fn new(name: &'static str, set: Address, clr: Address, sta: Address) -> Self {
        GroupDesc { name, set, clr, sta, domain: None }
    }

    /// A group with a single read/write control register.
    pub fn single(name: &'static str, reg: Address) -> Self { Self::new(name, reg, reg, reg) }

    pub fn in_domain(mut self, domain: DomainId) -> Self {
        self.domain = Some(domain);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PllDesc {
    pub name: &'static str,
    pub kind: PllKind,
    pub features: PllFeatures,
    /// Bits asserted in CON0 to run the PLL.
    pub en_mask: u32,
    pub con0: Address,
    pub con1: Address,
    pub pwr: Address,
    /// Channel handed to the frequency-hopping engine.
    pub hop_id: u32,
    /// Claims held by consumers outside the graph, such as the CPU or DRAM.
    pub external_refs: u32,
}

/// Shared memory arbiter whose shadow registers are saved across a domain power cycle.
#[derive(Debug, Copy, Clone)]
pub struct ArbiterDesc {
    pub index: usize,
    /// Gate inside the domain that must run for the shadow registers to be reachable.
    pub clock: ClockId,
}

impl ArbiterDesc {
    pub const fn new(index: usize, clock: ClockId) -> Self { ArbiterDesc { index, clock } }
}

#[derive(Debug, Clone)]
pub struct DomainDesc {
    pub name: &'static str,
    pub kind: DomainKind,
    pub default_on: bool,
    /// Bit in both power status registers that reports this island powered.
    pub status_mask: u32,
    /// Clock outside this domain held for as long as the domain is powered.
    pub companion: Option<ClockId>,
    pub arbiter: Option<ArbiterDesc>,
}

impl DomainDesc {
    pub fn new(name: &'static str, kind: DomainKind, default_on: bool, status_mask: u32) -> Self {
        DomainDesc { name, kind, default_on, status_mask, companion: None, arbiter: None }
    }

    pub fn with_companion(mut self, clock: ClockId) -> Self {
        self.companion = Some(clock);
        self
    }

    pub fn with_arbiter(mut self, arbiter: ArbiterDesc) -> Self {
        self.arbiter = Some(arbiter);
        self
    }
}

/// One selectable input of a multiplexer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MuxEntry {
    pub value: u32,
    pub mask: u32,
    pub clock: ClockId,
}

impl MuxEntry {
    pub const fn new(value: u32, mask: u32, clock: ClockId) -> Self { MuxEntry { value, mask, clock } }

    /// True if `reg` currently selects this entry.
    pub fn matches(&self, reg: u32) -> bool { (self.value & self.mask) == (reg & self.mask) }
}

#[derive(Debug, Clone)]
pub struct MuxDesc {
    pub name: &'static str,
    pub reg: Address,
    /// Bit position of the selector field; value-indexed muxes decode relative to it.
    pub offset: u32,
    pub entries: Vec<MuxEntry>,
    pub drain: Option<ClockId>,
    pub protocol: MuxProtocol,
}

#[derive(Debug, Clone)]
pub struct Topology {
    pub clocks: Vec<ClockDesc>,
    pub groups: Vec<GroupDesc>,
    pub plls: Vec<PllDesc>,
    pub domains: Vec<DomainDesc>,
    pub muxes: Vec<MuxDesc>,
    /// Primary and secondary power status registers; a domain is up only if both agree.
    pub power_status: Address,
    pub power_status_2nd: Address,
}

impl Topology {
    pub fn new(power_status: Address, power_status_2nd: Address) -> Self {
        Topology {
            clocks: Vec::new(),
            groups: Vec::new(),
            plls: Vec::new(),
            domains: Vec::new(),
            muxes: Vec::new(),
            power_status,
            power_status_2nd,
        }
    }

    pub fn add_group(&mut self, group: GroupDesc) -> GroupId {
        self.groups.push(group);
        GroupId::new(self.groups.len() - 1)
    }

    pub fn add_clock(&mut self, clock: ClockDesc) -> ClockId {
        self.clocks.push(clock);
        ClockId::new(self.clocks.len() - 1)
    }

    pub fn add_pll(&mut self, pll: PllDesc) -> PllId {
        self.plls.push(pll);
        PllId::new(self.plls.len() - 1)
    }

    pub fn add_domain(&mut self, domain: DomainDesc) -> DomainId {
        self.domains.push(domain);
        DomainId::new(self.domains.len() - 1)
    }

    pub fn add_mux(&mut self, mux: MuxDesc) -> MuxId {
        self.muxes.push(mux);
        MuxId::new(self.muxes.len() - 1)
    }

    /// Union of member masks for every group, indexed by group.
    pub fn group_masks(&self) -> Vec<u32> {
        let mut masks = vec![0u32; self.groups.len()];
        for clock in self.clocks.iter() {
            if let Some(m) = masks.get_mut(clock.group.index()) {
                *m |= clock.mask;
            }
        }
        masks
    }

    /// Groups owned by each domain, in group order.
    pub fn domain_groups(&self) -> Vec<Vec<GroupId>> {
        let mut owned = vec![Vec::new(); self.domains.len()];
        for (i, group) in self.groups.iter().enumerate() {
            if let Some(d) = group.domain {
                if let Some(list) = owned.get_mut(d.index()) {
                    list.push(GroupId::new(i));
                }
            }
        }
        owned
    }

    /// Checks referential integrity of the tables. Any violation is a build-time
    /// topology error and panics.
    pub fn validate(&self) {
        let nclk = self.clocks.len();
        for group in self.groups.iter() {
            if let Some(d) = group.domain {
                assert!(d.index() < self.domains.len(), "group {} names missing domain {}", group.name, d);
            }
        }
        for clock in self.clocks.iter() {
            assert!(clock.group.index() < self.groups.len(), "clock {} names missing group", clock.name);
            if clock.kind != ClockKind::AlwaysOn {
                assert!(clock.mask != 0, "clock {} has an empty mask", clock.name);
            }
            if let Some(s) = clock.source {
                assert!(s.index() < nclk, "clock {} names missing source {}", clock.name, s);
                assert!(clock.parent.is_none(), "clock {} has both a source and a parent", clock.name);
            }
            if let Some(p) = clock.parent {
                assert!(p.index() < self.plls.len(), "clock {} names missing pll {}", clock.name, p);
            }
        }
        // static source chains must terminate
        for (i, clock) in self.clocks.iter().enumerate() {
            let mut hops = 0;
            let mut cursor = clock.source;
            while let Some(s) = cursor {
                hops += 1;
                assert!(hops <= nclk, "clock {} (#{}) has a cyclic source chain", clock.name, i);
                cursor = self.clocks[s.index()].source;
            }
        }
        let owned = self.domain_groups();
        for (i, domain) in self.domains.iter().enumerate() {
            if let Some(c) = domain.companion {
                assert!(c.index() < nclk, "domain {} names missing companion {}", domain.name, c);
                let home = self.groups[self.clocks[c.index()].group.index()].domain;
                assert!(
                    home != Some(DomainId::new(i)),
                    "domain {} companion clock lives inside the domain it powers",
                    domain.name
                );
            }
            if let Some(arbiter) = domain.arbiter {
                assert!(arbiter.clock.index() < nclk, "domain {} arbiter names missing clock", domain.name);
                let home = self.clocks[arbiter.clock.index()].group;
                assert!(owned[i].contains(&home), "domain {} arbiter clock lives outside the domain", domain.name);
            }
            log::trace!("domain {} owns {} groups", domain.name, owned[i].len());
        }
        for (i, mux) in self.muxes.iter().enumerate() {
            assert!(!mux.entries.is_empty(), "mux {} has an empty table", mux.name);
            for entry in mux.entries.iter() {
                assert!(entry.clock.index() < nclk, "mux {} entry names missing clock", mux.name);
            }
            if let Some(d) = mux.drain {
                assert!(d.index() < nclk, "mux {} names missing drain {}", mux.name, d);
                assert!(self.clocks[d.index()].parent.is_none(), "mux {} drain is fed by a pll", mux.name);
                // the drain would end up claiming itself through its new source
                for entry in mux.entries.iter() {
                    let mut cursor = Some(entry.clock);
                    while let Some(c) = cursor {
                        assert!(c != d, "mux {} can feed drain {} from itself", mux.name, self.clocks[d.index()].name);
                        cursor = self.clocks[c.index()].source;
                    }
                }
            }
            match mux.protocol {
                MuxProtocol::NonGlitchFree | MuxProtocol::GlitchFree | MuxProtocol::ValueIndexed => {
                    assert!(mux.drain.is_some(), "mux {} protocol requires a drain clock", mux.name)
                }
                MuxProtocol::GlitchFreeNoDrain => {
                    assert!(mux.drain.is_none(), "mux {} has a drain but no drain protocol", mux.name)
                }
                MuxProtocol::Graphics { share, high_freq, safe } => {
                    assert!(mux.drain.is_some(), "mux {} protocol requires a drain clock", mux.name);
                    assert!(share.index() < self.muxes.len() && share.index() != i, "mux {} bad share", mux.name);
                    let share_mux = &self.muxes[share.index()];
                    assert!(
                        share_mux.protocol == MuxProtocol::GlitchFreeNoDrain,
                        "mux {} share mux {} must switch without a drain",
                        mux.name,
                        share_mux.name
                    );
                    for c in [high_freq, safe] {
                        assert!(
                            share_mux.entries.iter().any(|e| e.clock == c),
                            "mux {} share input {} is not selectable",
                            mux.name,
                            c
                        );
                    }
                }
            }
        }
    }
}
