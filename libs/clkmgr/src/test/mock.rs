use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clkmgr_api::*;

/// One observable side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Write(Address, u32),
    Set(Address, u32),
    Clear(Address, u32),
    Delay(u32),
    PowerOn(DomainId),
    PowerOff(DomainId),
    Hop { hop_id: u32, vco_khz: u32, enable: bool },
    Backup(&'static str, usize),
    Restore(&'static str, usize),
}

pub type Log = Arc<Mutex<Vec<Access>>>;

pub fn take(log: &Log) -> Vec<Access> { std::mem::take(&mut *log.lock().unwrap()) }

pub fn position(log: &[Access], access: &Access) -> usize {
    log.iter().position(|a| a == access).unwrap_or_else(|| panic!("{:?} not in {:#x?}", access, log))
}

#[derive(Default)]
struct RegisterFile {
    regs: HashMap<Address, u32>,
    /// set/clear alias -> (status register, true for set)
    aliases: HashMap<Address, (Address, bool)>,
}

/// A register file with write-1-to-set and write-1-to-clear aliases.
#[derive(Clone)]
pub struct MockPort {
    file: Arc<Mutex<RegisterFile>>,
    log: Log,
}

impl MockPort {
    pub fn new(log: Log) -> Self { MockPort { file: Arc::new(Mutex::new(RegisterFile::default())), log } }

    /// Wires the set/clear registers of every group with distinct addresses to its status register.
    pub fn alias_groups(&self, topology: &Topology) {
        let mut file = self.file.lock().unwrap();
        for g in topology.groups.iter() {
            if g.set != g.sta {
                file.aliases.insert(g.set, (g.sta, true));
            }
            if g.clr != g.sta {
                file.aliases.insert(g.clr, (g.sta, false));
            }
        }
    }

    pub fn poke(&self, addr: Address, value: u32) { self.file.lock().unwrap().regs.insert(addr, value); }

    pub fn peek(&self, addr: Address) -> u32 { self.file.lock().unwrap().regs.get(&addr).copied().unwrap_or(0) }

    fn store(&self, addr: Address, value: u32) {
        let mut file = self.file.lock().unwrap();
        match file.aliases.get(&addr).copied() {
            Some((sta, true)) => *file.regs.entry(sta).or_insert(0) |= value,
            Some((sta, false)) => *file.regs.entry(sta).or_insert(0) &= !value,
            None => {
                file.regs.insert(addr, value);
            }
        }
    }
}

impl RegisterPort for MockPort {
    fn read(&self, addr: Address) -> u32 { self.peek(addr) }

    fn write(&self, addr: Address, value: u32) {
        self.log.lock().unwrap().push(Access::Write(addr, value));
        self.store(addr, value);
    }

    fn set_bits(&self, addr: Address, mask: u32) {
        self.log.lock().unwrap().push(Access::Set(addr, mask));
        let v = self.peek(addr);
        self.store(addr, v | mask);
    }

    fn clear_bits(&self, addr: Address, mask: u32) {
        self.log.lock().unwrap().push(Access::Clear(addr, mask));
        let v = self.peek(addr);
        self.store(addr, v & !mask);
    }

    fn delay_us(&self, us: u32) { self.log.lock().unwrap().push(Access::Delay(us)); }
}

/// Flips domain status bits in both power status registers on request.
pub struct MockSequencer {
    port: MockPort,
    log: Log,
    status: (Address, Address),
    masks: Vec<u32>,
    pub fail: Arc<Mutex<Option<DomainId>>>,
    pub modem_awake_polls: Arc<Mutex<u32>>,
}

impl MockSequencer {
    pub fn new(port: MockPort, log: Log, topology: &Topology) -> Self {
        MockSequencer {
            port,
            log,
            status: (topology.power_status, topology.power_status_2nd),
            masks: topology.domains.iter().map(|d| d.status_mask).collect(),
            fail: Arc::new(Mutex::new(None)),
            modem_awake_polls: Arc::new(Mutex::new(0)),
        }
    }

    fn flip(&self, id: DomainId, on: bool) -> Result<(), Error> {
        if *self.fail.lock().unwrap() == Some(id) {
            return Err(Error::SequencerFailed);
        }
        let mask = self.masks[id.index()];
        for addr in [self.status.0, self.status.1] {
            let v = self.port.peek(addr);
            self.port.poke(addr, if on { v | mask } else { v & !mask });
        }
        Ok(())
    }
}

impl PowerSequencer for MockSequencer {
    fn power_on(&mut self, domain: DomainId) -> Result<(), Error> {
        self.log.lock().unwrap().push(Access::PowerOn(domain));
        self.flip(domain, true)
    }

    fn power_off(&mut self, domain: DomainId) -> Result<(), Error> {
        self.log.lock().unwrap().push(Access::PowerOff(domain));
        self.flip(domain, false)
    }

    fn modem_asleep(&mut self, _domain: DomainId) -> bool {
        let mut polls = self.modem_awake_polls.lock().unwrap();
        if *polls == 0 {
            true
        } else {
            *polls -= 1;
            false
        }
    }
}

pub struct MockHopping {
    log: Log,
    pub fail: Arc<Mutex<bool>>,
}

impl MockHopping {
    pub fn new(log: Log) -> Self { MockHopping { log, fail: Arc::new(Mutex::new(false)) } }
}

impl FreqHopping for MockHopping {
    fn configure(&mut self, hop_id: u32, vco_khz: u32, enable: bool) -> Result<(), Error> {
        if *self.fail.lock().unwrap() {
            return Err(Error::HoppingFailed);
        }
        self.log.lock().unwrap().push(Access::Hop { hop_id, vco_khz, enable });
        Ok(())
    }
}

/// Records backup/restore calls under its own name.
pub struct MockMonitor {
    pub name: &'static str,
    pub level: MonitorLevel,
    pub log: Log,
}

impl ResourceMonitor for MockMonitor {
    fn level(&self) -> MonitorLevel { self.level }

    fn backup(&self, arbiter: usize) { self.log.lock().unwrap().push(Access::Backup(self.name, arbiter)); }

    fn restore(&self, arbiter: usize) { self.log.lock().unwrap().push(Access::Restore(self.name, arbiter)); }
}
