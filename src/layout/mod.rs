//! Byte-exact decoding of the on-flash records.
//!
//! Records are never overlaid onto memory: every field is extracted from its fixed byte
//! offset, so a record may start at any flash offset, aligned or not.
//! All multi-byte fields are little-endian.

use embedded_storage::nor_flash::ReadNorFlash;

use crate::Error;

pub mod config;
pub mod image;

/// Size of a flash sector, the unit of erasure.
pub const SECTOR_SIZE: u32 = 0x1000;

/// Sector holding the [`BootConfigRecord`](config::BootConfigRecord).
pub const BOOT_CONFIG_SECTOR: u32 = 1;

/// Maximum number of image slots in the boot configuration.
pub const MAX_ROMS: usize = 4;

/// Scratch space large enough for any record in this module.
const RECORD_BUFFER_SIZE: usize = 20;

/// A fixed-layout record as stored on flash.
pub trait Layout: Sized {
    /// Exact on-flash size in bytes.
    const SIZE: usize;

    /// Decode from the first [`Self::SIZE`] bytes of `bytes`.
    fn decode(bytes: &[u8]) -> Self;

    /// Encode into the first [`Self::SIZE`] bytes of `bytes`.
    fn encode(&self, bytes: &mut [u8]);
}

/// Read a record at `offset`. No part of the record is decoded unless the whole read succeeded.
pub fn read_record<T: Layout, F: ReadNorFlash>(flash: &mut F, offset: u32) -> Result<T, Error> {
    const { assert!(T::SIZE <= RECORD_BUFFER_SIZE) };

    let mut buffer = [0u8; RECORD_BUFFER_SIZE];
    let bytes = &mut buffer[..T::SIZE];
    crate::read(flash, offset, bytes)?;

    Ok(T::decode(bytes))
}

/// Move a flash or memory cursor forward; running off the address space is a read failure.
pub(crate) fn advance(cursor: u32, by: usize) -> Result<u32, Error> {
    u32::try_from(by)
        .ok()
        .and_then(|by| cursor.checked_add(by))
        .ok_or(Error::Read)
}

pub(crate) fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub(crate) fn put_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
