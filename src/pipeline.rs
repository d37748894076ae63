//! Entry points of both bootloader stages.
//!
//! The first stage picks and validates an image, then relocates the second stage loader into
//! memory and jumps to it with the image's flash offset. The second stage copies the image
//! into memory and jumps to the image.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use crate::{
    Boot, log,
    layout::{
        image::{FlashSize, ImageHeader},
        read_record,
    },
    loader::{self, Memory},
    select, state,
};

/// Second stage loader as linked into the first stage, to be moved to where it executes.
#[derive(Clone, Copy, Debug)]
pub struct Stage2 {
    /// Code and initialized data of the loader.
    pub text: &'static [u8],
    /// Where `text` has to be copied to.
    pub text_address: u32,
    pub bss_address: u32,
    pub bss_len: usize,
    /// Loader entry, taking the flash offset of the image header.
    pub entry: u32,
}

/// Decode flash size and speed from the header at the start of flash, and report them.
pub fn flash_size<F: ReadNorFlash>(flash: &mut F) -> FlashSize {
    let header = read_record::<ImageHeader, _>(flash, 0);
    let (size, speed) = match header {
        Ok(header) => (header.flash_size(), header.flash_speed().label()),
        Err(_) => (FlashSize::Unknown(0xFF), "unknown"),
    };

    log::info!("Device flash size:   {}", size.label());
    log::info!("Device flash speed:  {}", speed);

    size
}

/// Select the image to boot and record the choice.
///
/// Returns the flash offset of the image header, or `None` if no configured image is valid.
#[inline(never)]
pub fn find_image_address<F: NorFlash>(flash: &mut F) -> Option<u32> {
    let capacity = flash_size(flash).capacity();
    let mut record = state::load_or_init(flash, capacity);

    let selection = select::select_boot_image(flash, &record)?;
    if selection.changed {
        record.current = selection.index;
        if let Err(e) = state::persist(flash, &record) {
            log::warn!("Could not update boot configuration: {:?}", e);
        }
    }

    log::info!("Trying to boot ROM {}.", selection.index);
    Some(selection.address)
}

/// Run the first stage. Only returns when there is no image to boot.
///
/// # Safety
///
/// `stage2` must describe a loader built for `B`, its target ranges must be unused by the
/// running code, and `memory` must give access to them.
pub unsafe fn stage1<B: Boot, F: NorFlash, M: Memory>(
    flash: &mut F,
    memory: &mut M,
    stage2: &Stage2,
) {
    let Some(address) = find_image_address(flash) else {
        return;
    };

    memory.copy(stage2.text_address, stage2.text);
    memory.fill(stage2.bss_address, stage2.bss_len, 0);

    unsafe { B::boot(stage2.entry, Some(address)) }
}

/// Run the second stage for the image header at `address`. Only returns when it cannot be read.
///
/// # Safety
///
/// The image at `address` must have been validated, and its sections must target memory that
/// `memory` may overwrite without disturbing the running loader.
pub unsafe fn stage2<B: Boot, F: ReadNorFlash, M: Memory>(
    flash: &mut F,
    memory: &mut M,
    address: u32,
) {
    match loader::load_image(flash, memory, address) {
        Ok(entry) => unsafe { B::boot(entry.0, None) },
        Err(e) => log::error!("Could not load image at {:#x}: {:?}", address, e),
    }
}
