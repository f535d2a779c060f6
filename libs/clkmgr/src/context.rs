use std::sync::Arc;

use clkmgr_api::*;

use crate::monitor::MonitorList;

pub(crate) struct ClockNode {
    pub desc: ClockDesc,
    pub refcount: u32,
    pub on: bool,
    pub force_on: bool,
    /// Live upstream clock. Starts as the static source; mux drains are re-pointed at runtime.
    pub source: Option<ClockId>,
}

pub(crate) struct GroupNode {
    pub desc: GroupDesc,
    /// Union of member masks.
    pub mask: u32,
    /// Mirror of member bits whose clock is logically on.
    pub state: u32,
}

pub(crate) struct PllNode {
    pub desc: PllDesc,
    pub refcount: u32,
    pub on: bool,
    /// Client request to run frequency hopping.
    pub hop_switch: bool,
    /// Hopping is currently configured in the engine.
    pub hop_engaged: bool,
}

pub(crate) struct DomainNode {
    pub desc: DomainDesc,
    pub on: bool,
    pub groups: Vec<GroupId>,
}

/// Everything guarded by the clock lock.
pub(crate) struct Inner {
    pub clocks: Vec<ClockNode>,
    pub groups: Vec<GroupNode>,
    pub plls: Vec<PllNode>,
    pub domains: Vec<DomainNode>,
    pub muxes: Vec<MuxDesc>,
    pub power_status: Address,
    pub power_status_2nd: Address,
    pub config: Config,
    pub platform: Platform,
    pub monitors: Arc<MonitorList>,
    pub initialized: bool,
}

impl Inner {
    pub fn new(topology: Topology, config: Config, platform: Platform, monitors: Arc<MonitorList>) -> Self {
        topology.validate();
        let masks = topology.group_masks();
        let owned = topology.domain_groups();
        let Topology { clocks, groups, plls, domains, muxes, power_status, power_status_2nd } = topology;

        Inner {
            clocks: clocks
                .into_iter()
                .map(|desc| ClockNode { source: desc.source, desc, refcount: 0, on: false, force_on: false })
                .collect(),
            groups: groups
                .into_iter()
                .zip(masks)
                .map(|(desc, mask)| GroupNode { desc, mask, state: 0 })
                .collect(),
            plls: plls
                .into_iter()
                .map(|desc| {
                    let hop_switch = desc.features.contains(PllFeatures::HOPPING);
                    PllNode { desc, refcount: 0, on: false, hop_switch, hop_engaged: false }
                })
                .collect(),
            domains: domains
                .into_iter()
                .zip(owned)
                .map(|(desc, groups)| DomainNode { desc, on: false, groups })
                .collect(),
            muxes,
            power_status,
            power_status_2nd,
            config,
            platform,
            monitors,
            initialized: false,
        }
    }

    pub fn port(&self) -> &dyn RegisterPort { self.platform.port.as_ref() }

    pub fn clock(&self, id: ClockId) -> &ClockNode {
        self.clocks.get(id.index()).unwrap_or_else(|| panic!("no such clock {}", id))
    }

    pub fn clock_mut(&mut self, id: ClockId) -> &mut ClockNode {
        self.clocks.get_mut(id.index()).unwrap_or_else(|| panic!("no such clock {}", id))
    }

    pub fn group(&self, id: GroupId) -> &GroupNode {
        self.groups.get(id.index()).unwrap_or_else(|| panic!("no such group {}", id))
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut GroupNode {
        self.groups.get_mut(id.index()).unwrap_or_else(|| panic!("no such group {}", id))
    }

    pub fn pll(&self, id: PllId) -> &PllNode {
        self.plls.get(id.index()).unwrap_or_else(|| panic!("no such pll {}", id))
    }

    pub fn pll_mut(&mut self, id: PllId) -> &mut PllNode {
        self.plls.get_mut(id.index()).unwrap_or_else(|| panic!("no such pll {}", id))
    }

    pub fn domain(&self, id: DomainId) -> &DomainNode {
        self.domains.get(id.index()).unwrap_or_else(|| panic!("no such domain {}", id))
    }

    pub fn domain_mut(&mut self, id: DomainId) -> &mut DomainNode {
        self.domains.get_mut(id.index()).unwrap_or_else(|| panic!("no such domain {}", id))
    }

    pub fn mux(&self, id: MuxId) -> &MuxDesc {
        self.muxes.get(id.index()).unwrap_or_else(|| panic!("no such mux {}", id))
    }

    /// Asserts the clock's mask is non-empty and contained in its group's mask.
    pub fn check_validity(&self, id: ClockId) {
        let clock = self.clock(id);
        if clock.desc.kind == ClockKind::AlwaysOn {
            return;
        }
        let group = self.group(clock.desc.group);
        assert!(
            clock.desc.mask != 0 && clock.desc.mask & group.mask == clock.desc.mask,
            "clock {} mask {:#x} is not within group {} mask {:#x}",
            clock.desc.name,
            clock.desc.mask,
            group.desc.name,
            group.mask
        );
    }

    pub fn assert_initialized(&self) {
        assert!(self.initialized, "clock manager used before init");
    }

    /// Domain power as reported by the power status registers.
    pub fn hw_domain_on(&self, id: DomainId) -> bool {
        let mask = self.domain(id).desc.status_mask;
        let sta = self.port().read(self.power_status);
        let sta_2nd = self.port().read(self.power_status_2nd);
        (sta & mask != 0) && (sta_2nd & mask != 0)
    }

    pub fn domain_state(&self, id: DomainId) -> bool {
        if self.initialized { self.domain(id).on } else { self.hw_domain_on(id) }
    }

    /// Group bits that are effectively running; an unpowered domain gates all of them.
    pub fn group_effective_state(&self, id: GroupId) -> u32 {
        let group = self.group(id);
        match group.desc.domain {
            Some(d) if !self.domain_state(d) => 0,
            _ => group.state,
        }
    }

    pub fn clock_by_name(&self, name: &str) -> Option<ClockId> {
        self.clocks.iter().position(|c| c.desc.name == name).map(ClockId::new)
    }

    pub fn pll_by_name(&self, name: &str) -> Option<PllId> {
        self.plls.iter().position(|p| p.desc.name == name).map(PllId::new)
    }

    pub fn domain_by_name(&self, name: &str) -> Option<DomainId> {
        self.domains.iter().position(|d| d.desc.name == name).map(DomainId::new)
    }

    pub fn mux_by_name(&self, name: &str) -> Option<MuxId> {
        self.muxes.iter().position(|m| m.name == name).map(MuxId::new)
    }
}
