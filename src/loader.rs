//! Second stage: copying a validated image from flash into memory.

use embedded_storage::nor_flash::ReadNorFlash;

use crate::{
    Error,
    layout::{
        Layout, advance,
        image::{ImageHeader, SectionHeader},
        read_record,
    },
};

/// Largest single flash read when copying a section.
pub const READ_SIZE: usize = 0x1000;

/// Address of the first instruction of a loaded image.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EntryPoint(pub u32);

/// Raw access to the memory images are loaded into.
///
/// Implementations neither allocate nor fail: every address handed to them is in bounds by
/// construction of the image.
pub trait Memory {
    /// The `len` bytes of memory starting at `address`.
    fn window(&mut self, address: u32, len: usize) -> &mut [u8];

    fn copy(&mut self, address: u32, bytes: &[u8]) {
        self.window(address, bytes.len()).copy_from_slice(bytes);
    }

    fn fill(&mut self, address: u32, len: usize, value: u8) {
        self.window(address, len).fill(value);
    }
}

/// The memory of the running CPU, addressed one to one.
pub struct PhysicalMemory(());

impl PhysicalMemory {
    /// # Safety
    ///
    /// Every range later passed to [`Memory::window`] must be writable memory that nothing else
    /// uses, in particular not the stack or code of the running bootloader.
    pub unsafe fn new() -> Self {
        PhysicalMemory(())
    }
}

impl Memory for PhysicalMemory {
    fn window(&mut self, address: u32, len: usize) -> &mut [u8] {
        // SAFETY: exclusive access to this range is promised to `PhysicalMemory::new`.
        unsafe { core::slice::from_raw_parts_mut(address as usize as *mut u8, len) }
    }
}

/// Copy every section of the image whose header is at `address` to its target location.
///
/// The image is not validated here; that has to have happened before. Sections are read
/// straight into their destination, at most [`READ_SIZE`] bytes per read.
pub fn load_image<F: ReadNorFlash, M: Memory>(
    flash: &mut F,
    memory: &mut M,
    address: u32,
) -> Result<EntryPoint, Error> {
    let header: ImageHeader = read_record(flash, address)?;
    let mut cursor = advance(address, ImageHeader::SIZE)?;

    for _ in 0..header.section_count {
        let section: SectionHeader = read_record(flash, cursor)?;
        cursor = advance(cursor, SectionHeader::SIZE)?;

        let mut target = section.address;
        let mut remaining = section.length as usize;
        while remaining > 0 {
            let len = remaining.min(READ_SIZE);
            crate::read(flash, cursor, memory.window(target, len))?;

            cursor = advance(cursor, len)?;
            target = advance(target, len)?;
            remaining -= len;
        }
    }

    Ok(EntryPoint(header.entry))
}
