//! Choice of the image to boot, falling back over the configured slots.

use embedded_storage::nor_flash::ReadNorFlash;
use serde::{Deserialize, Serialize};

use crate::{
    log,
    layout::config::BootConfigRecord,
    validate::{ValidatedImage, validate_image},
};

/// A slot whose image passed validation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Selection {
    /// Flash offset of the validated image header.
    pub address: u32,
    /// Slot index the image was found in.
    pub index: u8,
    /// Whether `index` differs from what the configuration selected, and has to be persisted.
    pub changed: bool,
}

/// Find a bootable image, starting at the configured slot.
///
/// Returns `None` when no configured slot holds a valid image.
pub fn select_boot_image<F: ReadNorFlash>(
    flash: &mut F,
    record: &BootConfigRecord,
) -> Option<Selection> {
    select_with(record, |offset| validate_image(flash, offset))
}

/// Like [`select_boot_image`], with the validation of each slot offset left to `validate`.
///
/// Slots are tried in descending order from the configured one, wrapping from `0` to the
/// last slot, so each slot is validated at most once.
pub fn select_with(
    record: &BootConfigRecord,
    mut validate: impl FnMut(u32) -> ValidatedImage,
) -> Option<Selection> {
    let slots = record.slots();
    if slots.is_empty() {
        log::error!("No good rom available.");
        return None;
    }

    let mut changed = false;
    let mut index = usize::from(record.current);
    if index >= slots.len() {
        log::warn!("Invalid rom selected. Set to default ROM 0.");
        index = 0;
        changed = true;
    }

    let first = index;
    loop {
        if let ValidatedImage::Valid(address) = validate(slots[index]) {
            return Some(Selection {
                address,
                index: index as u8,
                changed,
            });
        }

        log::warn!("Rom {} is invalid.", index);
        changed = true;
        index = index.checked_sub(1).unwrap_or(slots.len() - 1);

        if index == first {
            log::error!("No good rom available.");
            return None;
        }
    }
}
