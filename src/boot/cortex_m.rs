use crate::boot::{Boot, Direct};

/// Handoff for Cortex-M: flush outstanding memory accesses and the pipeline, then call the
/// entry in Thumb state.
pub struct SimpleCortexM;

impl Boot for SimpleCortexM {
    unsafe fn boot(entry: u32, argument: Option<u32>) -> ! {
        cortex_m::asm::dsb();
        cortex_m::asm::isb();

        unsafe { Direct::boot(entry | 1, argument) }
    }
}
