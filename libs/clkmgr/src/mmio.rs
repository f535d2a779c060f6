use clkmgr_api::{Address, RegisterPort};

/// Register port over a mapped window of the SoC register space.
///
/// `phys_base` is the absolute address the window starts at; every access is translated
/// to an offset into the mapping and performed as a volatile 32-bit access.
pub struct MmioPort {
    base: *mut u32,
    phys_base: Address,
    len: usize,
    delay: Box<dyn Fn(u32) + Send>,
}

// The window is only reached through the clock lock.
unsafe impl Send for MmioPort {}

impl MmioPort {
    /// # Safety
    ///
    /// `base` must point at a live mapping of `len` bytes of device registers that stays
    /// mapped for the lifetime of the port, and nothing else may write to it.
    pub unsafe fn new(base: *mut u32, phys_base: Address, len: usize, delay: Box<dyn Fn(u32) + Send>) -> Self {
        MmioPort { base, phys_base, len, delay }
    }

    fn reg(&self, addr: Address) -> *mut u32 {
        let offset = addr.wrapping_sub(self.phys_base);
        assert!(
            offset < self.len && offset % core::mem::size_of::<u32>() == 0,
            "register {:#x} outside window {:#x}+{:#x}",
            addr,
            self.phys_base,
            self.len
        );
        unsafe { self.base.add(offset / core::mem::size_of::<u32>()) }
    }
}

impl RegisterPort for MmioPort {
    fn read(&self, addr: Address) -> u32 { unsafe { self.reg(addr).read_volatile() } }

    fn write(&self, addr: Address, value: u32) { unsafe { self.reg(addr).write_volatile(value) } }

    fn delay_us(&self, us: u32) { (self.delay)(us) }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn accesses_land_at_window_offsets() {
        let mut regs = [0u32; 8];
        let waited = Arc::new(AtomicU32::new(0));
        let w = waited.clone();
        let port = unsafe {
            MmioPort::new(
                regs.as_mut_ptr(),
                0x1000_0000,
                regs.len() * 4,
                Box::new(move |us| {
                    w.fetch_add(us, Ordering::SeqCst);
                }),
            )
        };
        port.write(0x1000_0008, 0xa5);
        port.set_bits(0x1000_0008, 0x100);
        port.clear_bits(0x1000_0008, 0x1);
        port.delay_us(20);
        assert_eq!(port.read(0x1000_0008), 0x1a4);
        assert_eq!(waited.load(Ordering::SeqCst), 20);
        drop(port);
        assert_eq!(regs[2], 0x1a4);
    }

    #[test]
    #[should_panic(expected = "outside window")]
    fn out_of_window_access_is_fatal() {
        let mut regs = [0u32; 2];
        let port = unsafe { MmioPort::new(regs.as_mut_ptr(), 0x2000, 8, Box::new(|_| ())) };
        port.read(0x2008);
    }
}
