//! Handoff: the irreversible jump out of the bootloader.

#[cfg(feature = "cortex_m")]
pub mod cortex_m;

/// Mechanism transferring control to an address that never returns.
pub trait Boot {
    /// Call `entry`, passing `argument` as the only parameter if there is one.
    ///
    /// # Safety
    ///
    /// `entry` must be the address of code that follows the C calling convention and takes
    /// no parameter, or a single `u32` when `argument` is given. Nothing returns from here.
    unsafe fn boot(entry: u32, argument: Option<u32>) -> !;
}

/// Plain function call into the target, for any architecture with a C ABI.
pub struct Direct;

impl Boot for Direct {
    unsafe fn boot(entry: u32, argument: Option<u32>) -> ! {
        let entry = entry as usize as *const ();
        unsafe {
            match argument {
                Some(argument) => {
                    let entry: extern "C" fn(u32) -> ! = core::mem::transmute(entry);
                    entry(argument)
                }
                None => {
                    let entry: extern "C" fn() -> ! = core::mem::transmute(entry);
                    entry()
                }
            }
        }
    }
}
