//! PLL control register layouts and fixed-point frequency math.
//!
//! All PLLs are fed from a 26 MHz reference. Frequencies are reported in kHz.

use arbitrary_int::{u14, u3, u7};
use bitbybit::bitfield;

use crate::PllKind;

pub const FREQ_REF_MHZ: u32 = 26;

/// CON0: run bit.
pub const PLL_EN: u32 = 1 << 0;
/// CON0: fractional modulator enable, asserted together with `PLL_EN` on SDM PLLs.
pub const PLL_SDM_FRA_EN: u32 = 1 << 4;
/// CON0: active-low reset, released last on enable.
pub const PLL_RST_BAR: u32 = 1 << 27;
/// PWR: analog power.
pub const PLL_PWR_ON: u32 = 1 << 0;
/// PWR: output isolation.
pub const PLL_ISO_EN: u32 = 1 << 1;

/// CON1 fields rewritten by a frequency select on an SDM PLL.
pub const SDM_SELECT_MASK: u32 = 0x001f_ffff | (0x7 << 24);
/// CON1 field rewritten by a frequency select on a universal PLL.
pub const UNIV_SELECT_MASK: u32 = 0x7f;

#[bitfield(u32)]
#[derive(PartialEq, Eq, Debug)]
pub struct SdmCon1 {
    /// Latches a new multiplier into a running PLL.
    #[bit(31, rw)]
    pub pcw_change: bool,
    #[bits(24..=26, rw)]
    pub posdiv: u3,
    #[bits(14..=20, rw)]
    pub n_int: u7,
    #[bits(0..=13, rw)]
    pub n_frac: u14,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq, Debug)]
pub struct UnivCon1 {
    #[bit(31, rw)]
    pub pcw_change: bool,
    #[bits(24..=26, rw)]
    pub posdiv: u3,
    #[bits(0..=6, rw)]
    pub fbkdiv: u7,
}

const POSDIV_MAP: [u32; 8] = [1, 2, 4, 8, 16, 16, 16, 16];

/// Contribution of each fractional multiplier bit, MSB first, in Hz.
const N_FRAC_HZ: [u32; 14] = [
    13_000_000, 6_500_000, 3_250_000, 1_625_000, 812_500, 406_250, 203_125, 101_563, 50_782, 25_391, 12_696,
    6_348, 3_174, 1_587,
];

/// VCO of an SDM PLL.
///
/// vco = 26 MHz × (n_int + n_frac / 2^14), with the fractional part summed from a
/// per-bit table and rounded to the nearest MHz.
pub fn sdm_vco_khz(con1: u32) -> u32 {
    let con1 = SdmCon1::new_with_raw_value(con1);
    let n_frac = con1.n_frac().value() as u32;
    let vco_i = FREQ_REF_MHZ * con1.n_int().value() as u32;

    let mut vco_f: u32 = 0;
    for (i, hz) in N_FRAC_HZ.iter().enumerate() {
        let mask = 1u32 << (13 - i);
        if n_frac & mask != 0 {
            vco_f += hz;
            if n_frac & (mask - 1) == 0 {
                break;
            }
        }
    }
    let vco_f = (vco_f + 1_000_000 / 2) / 1_000_000;

    (vco_i + vco_f) * 1_000
}

/// VCO of a universal PLL: vco = 26 MHz × fbkdiv
pub fn univ_vco_khz(con1: u32) -> u32 {
    FREQ_REF_MHZ * 1_000 * UnivCon1::new_with_raw_value(con1).fbkdiv().value() as u32
}

pub fn vco_khz(kind: PllKind, con1: u32) -> u32 {
    match kind {
        PllKind::Sdm => sdm_vco_khz(con1),
        PllKind::Universal => univ_vco_khz(con1),
    }
}

pub fn post_divider(con1: u32) -> u32 {
    POSDIV_MAP[SdmCon1::new_with_raw_value(con1).posdiv().value() as usize]
}

/// Output frequency: vco / posdiv
pub fn output_khz(kind: PllKind, con1: u32) -> u32 { vco_khz(kind, con1) / post_divider(con1) }

/// Merges a frequency-select `value` into the current CON1 contents. A running PLL
/// also gets the change-pending bit so the new multiplier is latched.
pub fn select_frequency(kind: PllKind, con1: u32, value: u32, running: bool) -> u32 {
    let mask = match kind {
        PllKind::Sdm => SDM_SELECT_MASK,
        PllKind::Universal => UNIV_SELECT_MASK,
    };
    let merged = (con1 & !mask) | (value & mask);
    if running { SdmCon1::new_with_raw_value(merged).with_pcw_change(true).raw_value() } else { merged }
}
