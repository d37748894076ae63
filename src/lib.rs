//! Boot selection and image loading core for a two-stage, multi-image flash bootloader.
//!
//! On every reset the first stage reads the persisted boot configuration, validates the
//! selected image and falls back to the other configured images when it is not runnable.
//! The second stage copies the chosen image into memory and jumps to its entry point.
#![no_std]

use embedded_storage::nor_flash::ReadNorFlash;

pub mod boot;
pub mod layout;
pub mod loader;
pub mod pipeline;
pub mod select;
pub mod state;
pub mod validate;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("features `defmt` and `log` are mutually exclusive");

#[cfg(feature = "defmt")]
pub(crate) use defmt as log;

#[cfg(feature = "log")]
pub(crate) use logger_crate as log;

#[cfg(not(any(feature = "log", feature = "defmt")))]
pub(crate) mod log {
    macro_rules! info {
        ( $( $x:expr ),* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use info;
    macro_rules! debug {
        ( $( $x:expr ),* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use debug;
    macro_rules! warner {
        ( $( $x:expr ),* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use warner as warn;
    macro_rules! error {
        ( $( $x:expr ),* $(,)? ) => {{ $( let _ = &$x; )* }};
    }
    pub(crate) use error;
}

pub use boot::Boot;
pub use layout::config::BootConfigRecord;
pub use loader::Memory;
pub use select::Selection;
pub use validate::ValidatedImage;

/// Failure of the underlying flash device.
///
/// The flash driver's own error is not kept: every caller collapses it to
/// "this structure is unreadable" anyway.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Read,
    Erase,
    Write,
    /// The flash device's write granularity does not fit the record being written.
    Misaligned,
}

/// Read exactly `bytes.len()` bytes at `offset`.
pub(crate) fn read<F: ReadNorFlash>(
    flash: &mut F,
    offset: u32,
    bytes: &mut [u8],
) -> Result<(), Error> {
    flash.read(offset, bytes).map_err(|_| Error::Read)
}
