//! Persistence of the [`BootConfigRecord`] in its own flash sector.
//!
//! The sector is rewritten with an erase followed by a write. Losing power in between leaves
//! an erased sector, which the next boot treats like any other corrupt sector.

use embedded_storage::nor_flash::NorFlash;

use crate::{
    Error, log,
    layout::{BOOT_CONFIG_SECTOR, Layout, SECTOR_SIZE, config::BootConfigRecord, read_record},
};

/// Flash offset of the boot configuration.
pub const BOOT_CONFIG_OFFSET: u32 = BOOT_CONFIG_SECTOR * SECTOR_SIZE;

/// Largest write granularity supported when persisting the record.
const WRITE_BUFFER_SIZE: usize = 32;

/// Read the boot configuration, replacing a missing or corrupt one with the default layout.
///
/// `capacity` is the usable flash size, which determines where the default second image lives.
/// Never fails: at worst the synthesized default could not be persisted and is returned anyway.
pub fn load_or_init<F: NorFlash>(flash: &mut F, capacity: u32) -> BootConfigRecord {
    match read_record::<BootConfigRecord, _>(flash, BOOT_CONFIG_OFFSET) {
        Ok(record) if record.is_initialized() => record,
        _ => {
            log::info!("Writing default bootloader configuration.");

            let record = BootConfigRecord::default_for(capacity);
            if let Err(e) = persist(flash, &record) {
                log::warn!("Could not write boot configuration: {:?}", e);
            }
            record
        }
    }
}

/// Erase the config sector and write `record` to its start. The rest of the sector stays erased.
pub fn persist<F: NorFlash>(flash: &mut F, record: &BootConfigRecord) -> Result<(), Error> {
    let len = BootConfigRecord::SIZE.next_multiple_of(F::WRITE_SIZE);
    if len > WRITE_BUFFER_SIZE {
        return Err(Error::Misaligned);
    }

    let mut buffer = [0xFF; WRITE_BUFFER_SIZE];
    record.encode(&mut buffer);

    flash
        .erase(BOOT_CONFIG_OFFSET, BOOT_CONFIG_OFFSET + SECTOR_SIZE)
        .map_err(|_| Error::Erase)?;
    flash
        .write(BOOT_CONFIG_OFFSET, &buffer[..len])
        .map_err(|_| Error::Write)?;

    log::debug!("Boot configuration written, current rom {}", record.current);
    Ok(())
}
