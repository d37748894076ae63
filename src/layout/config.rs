//! The persisted boot selection.

use serde::{Deserialize, Serialize};

use super::{BOOT_CONFIG_SECTOR, Layout, MAX_ROMS, SECTOR_SIZE, put_u32, u32_at};

pub const BOOT_CONFIG_MAGIC: u8 = 0xE1;
pub const BOOT_CONFIG_VERSION: u8 = 0x01;

/// Boot configuration as stored at the start of the boot config sector.
///
/// Slots beyond `count` are ignored. A slot holding `0` or `0xFFFF_FFFF` is unused.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootConfigRecord {
    pub magic: u8,
    pub version: u8,
    /// Number of configured slots in `roms`.
    pub count: u8,
    /// Slot booted last time.
    pub current: u8,
    /// Flash offset of each image's extension header.
    pub roms: [u32; MAX_ROMS],
}

impl BootConfigRecord {
    /// Standard two image layout: one image right after the config sector,
    /// one at the same distance past the middle of the flash.
    pub const fn default_for(capacity: u32) -> Self {
        let first = SECTOR_SIZE * (BOOT_CONFIG_SECTOR + 1);

        let mut roms = [0; MAX_ROMS];
        roms[0] = first;
        roms[1] = capacity / 2 + first;

        Self {
            magic: BOOT_CONFIG_MAGIC,
            version: BOOT_CONFIG_VERSION,
            count: 2,
            current: 0,
            roms,
        }
    }

    /// Whether this record was written by this bootloader and is internally consistent.
    pub fn is_initialized(&self) -> bool {
        self.magic == BOOT_CONFIG_MAGIC
            && self.version == BOOT_CONFIG_VERSION
            && usize::from(self.count) <= MAX_ROMS
    }

    /// The configured slots, in index order.
    pub fn slots(&self) -> &[u32] {
        &self.roms[..usize::from(self.count).min(MAX_ROMS)]
    }
}

impl Layout for BootConfigRecord {
    const SIZE: usize = 4 + 4 * MAX_ROMS;

    fn decode(bytes: &[u8]) -> Self {
        let mut roms = [0; MAX_ROMS];
        for (i, rom) in roms.iter_mut().enumerate() {
            *rom = u32_at(bytes, 4 + 4 * i);
        }

        Self {
            magic: bytes[0],
            version: bytes[1],
            count: bytes[2],
            current: bytes[3],
            roms,
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[0] = self.magic;
        bytes[1] = self.version;
        bytes[2] = self.count;
        bytes[3] = self.current;
        for (i, rom) in self.roms.iter().enumerate() {
            put_u32(bytes, 4 + 4 * i, *rom);
        }
    }
}
