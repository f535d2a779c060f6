use clkmgr_api::*;

use crate::context::Inner;

/// What is still running when the system asks to suspend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SleepReport {
    /// PLLs running with no external owner.
    pub plls: Vec<PllId>,
    /// Non-modem domains still powered.
    pub domains: Vec<DomainId>,
}

impl SleepReport {
    pub fn clean(&self) -> bool { self.plls.is_empty() && self.domains.is_empty() }
}

impl Inner {
    pub(crate) fn idle_can_enter(&self, condition: &[u32], block: &mut [u32]) -> bool {
        let mut can = true;
        for (i, (cond, blk)) in condition.iter().zip(block.iter_mut()).enumerate().take(self.groups.len()) {
            let busy = self.group_effective_state(GroupId::new(i)) & cond;
            if busy != 0 {
                *blk |= busy;
                can = false;
            }
        }
        can
    }

    pub(crate) fn sleep_check(&self) -> SleepReport {
        let mut report = SleepReport::default();
        for (i, pll) in self.plls.iter().enumerate() {
            if pll.on && pll.desc.external_refs == 0 {
                log::warn!("pll {} still on, refcount {}", pll.desc.name, pll.refcount);
                report.plls.push(PllId::new(i));
            }
        }
        for (i, domain) in self.domains.iter().enumerate() {
            if domain.on && domain.desc.kind != DomainKind::Modem {
                log::warn!("domain {} still powered", domain.desc.name);
                report.domains.push(DomainId::new(i));
            }
        }
        report
    }
}
