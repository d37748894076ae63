//! Structural and checksum validation of an image, in a single forward pass over flash.

use embedded_storage::nor_flash::ReadNorFlash;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    layout::{
        Layout, advance,
        image::{ExtensionHeader, ImageHeader, SectionHeader},
        read_record,
    },
};

/// Seed of the XOR checksum over all section payloads.
pub const CHECKSUM_SEED: u8 = 0xEF;

/// Payload is streamed through a buffer of this size, whatever the image size.
pub const CHUNK_SIZE: usize = 0x100;

/// Outcome of validating the image at a flash offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidatedImage {
    Invalid,
    /// Flash offset of the image header, past any extension header and its blob.
    Valid(u32),
}

impl ValidatedImage {
    pub fn address(self) -> Option<u32> {
        match self {
            ValidatedImage::Valid(address) => Some(address),
            ValidatedImage::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, ValidatedImage::Valid(_))
    }
}

/// Validate the image whose extension header sits at `offset`.
///
/// Unreadable flash and structural errors are indistinguishable: both make the image invalid.
/// Nothing is retried.
pub fn validate_image<F: ReadNorFlash>(flash: &mut F, offset: u32) -> ValidatedImage {
    if offset == 0 || offset == u32::MAX {
        return ValidatedImage::Invalid;
    }

    match checked_image_address(flash, offset) {
        Ok(Some(address)) => ValidatedImage::Valid(address),
        Ok(None) | Err(_) => ValidatedImage::Invalid,
    }
}

fn checked_image_address<F: ReadNorFlash>(
    flash: &mut F,
    offset: u32,
) -> Result<Option<u32>, Error> {
    let extension: ExtensionHeader = read_record(flash, offset)?;
    if !extension.is_recognized() {
        return Ok(None);
    }

    let Some(image_address) = offset
        .checked_add(extension.length)
        .and_then(|address| advance(address, ExtensionHeader::SIZE).ok())
    else {
        return Ok(None);
    };

    let header: ImageHeader = read_record(flash, image_address)?;
    let mut cursor = advance(image_address, ImageHeader::SIZE)?;

    let mut checksum = CHECKSUM_SEED;
    let mut chunk = [0u8; CHUNK_SIZE];

    for _ in 0..header.section_count {
        let section: SectionHeader = read_record(flash, cursor)?;
        cursor = advance(cursor, SectionHeader::SIZE)?;

        let mut remaining = section.length as usize;
        while remaining > 0 {
            let len = remaining.min(CHUNK_SIZE);
            let bytes = &mut chunk[..len];
            crate::read(flash, cursor, bytes)?;

            checksum = bytes.iter().fold(checksum, |acc, byte| acc ^ byte);
            cursor = advance(cursor, len)?;
            remaining -= len;
        }
    }

    // The checksum byte is the last byte of the 16 byte block the payload ends in.
    let mut stored = [0u8; 1];
    crate::read(flash, cursor | 0x0F, &mut stored)?;

    Ok((stored[0] == checksum).then_some(image_address))
}
