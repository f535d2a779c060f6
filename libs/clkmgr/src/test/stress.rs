use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use clkmgr_api::*;

use super::topology::*;

/// Gates a client may claim freely on the reference board.
const CLIENT_CLOCKS: [ClockId; 9] = [SPI, AUD, DISP_COMMON, DISP_OVL, MFG_BG3D, IMG_LARB1, IMG_CAM, UPLL_D3, MPLL_D3];

#[test]
fn random_claims_keep_the_mirror_consistent() {
    let b = board();
    let baseline: Vec<u32> = CLIENT_CLOCKS.iter().map(|c| b.cm.clock_refcount(*c)).collect();
    let mut held = vec![0u32; CLIENT_CLOCKS.len()];
    let mut rng = StdRng::seed_from_u64(0x6580);

    for step in 0..2_000 {
        let i = rng.gen_range(0..CLIENT_CLOCKS.len());
        let clock = CLIENT_CLOCKS[i];
        match rng.gen_range(0..10) {
            0..=4 => {
                b.cm.enable(clock, "fuzz").unwrap();
                held[i] += 1;
            }
            5..=8 if held[i] > 0 => {
                b.cm.disable(clock, "fuzz").unwrap();
                held[i] -= 1;
            }
            9 => {
                let target = [MPLL_D3, MPLL_D5, MPLL_D7, UPLL_D3][rng.gen_range(0..4)];
                b.cm.mux_select(MUX_GFX, target, "fuzz").unwrap();
                let target = [SYS_26M, MPLL_D7][rng.gen_range(0..2)];
                b.cm.mux_select(MUX_SPI, target, "fuzz").unwrap();
            }
            _ => (),
        }
        if step % 50 == 0 {
            b.check_invariants();
        }
    }

    for (i, clock) in CLIENT_CLOCKS.iter().enumerate() {
        for _ in 0..held[i] {
            b.cm.disable(*clock, "fuzz").unwrap();
        }
    }
    b.check_invariants();
    // park the muxes where boot left them so their claims match the baseline
    b.cm.mux_select(MUX_GFX, MPLL_D3, "fuzz").unwrap();
    b.cm.mux_select(MUX_SPI, SYS_26M, "fuzz").unwrap();
    let after: Vec<u32> = CLIENT_CLOCKS.iter().map(|c| b.cm.clock_refcount(*c)).collect();
    assert_eq!(after, baseline);
    assert!(!b.cm.domain_is_on(MFG));
    assert!(!b.cm.domain_is_on(IMG));
    assert!(!b.cm.pll_is_on(UNIVPLL));
    assert_eq!(b.cm.pll_refcount(MAINPLL), 2);
}

#[test]
fn concurrent_clients_serialize_on_the_lock() {
    let b = Arc::new(board());
    let mut workers = Vec::new();
    for t in 0..4u64 {
        let b = b.clone();
        workers.push(std::thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(t);
            for _ in 0..250 {
                let clock = CLIENT_CLOCKS[rng.gen_range(0..CLIENT_CLOCKS.len())];
                b.cm.enable(clock, "worker").unwrap();
                if rng.gen_bool(0.5) {
                    std::thread::yield_now();
                }
                b.cm.disable(clock, "worker").unwrap();
            }
        }));
    }
    for w in workers {
        w.join().unwrap();
    }
    b.check_invariants();
    for c in CLIENT_CLOCKS {
        assert_eq!(b.cm.clock_refcount(c), 0, "{}", b.cm.clock_name(c));
    }
    assert!(!b.cm.domain_is_on(MFG));
}
