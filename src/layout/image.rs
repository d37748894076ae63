//! Image headers and the flash geometry codes they carry.

use super::{Layout, put_u32, u32_at};

/// Magic number of a plain image header.
pub const IMAGE_MAGIC: u8 = 0xE9;

/// Magic number of the extension header preceding a bootable image.
pub const EXTENSION_MAGIC: u8 = 0xEA;

/// Value of the extension header's `count` field; any other value means "not an image".
pub const EXTENSION_MAGIC_COUNT: u8 = 0x04;

/// Header of one firmware image, directly followed by its section table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageHeader {
    pub magic: u8,
    pub section_count: u8,
    pub flash_mode: u8,
    /// Flash size code in the high nibble, SPI speed code in the low nibble.
    pub flash_size_speed: u8,
    /// Address of the first instruction once the image is resident in memory.
    pub entry: u32,
}

impl ImageHeader {
    pub fn flash_size(&self) -> FlashSize {
        FlashSize::from_code(self.flash_size_speed >> 4)
    }

    pub fn flash_speed(&self) -> FlashSpeed {
        FlashSpeed::from_code(self.flash_size_speed & 0x0F)
    }
}

impl Layout for ImageHeader {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            magic: bytes[0],
            section_count: bytes[1],
            flash_mode: bytes[2],
            flash_size_speed: bytes[3],
            entry: u32_at(bytes, 4),
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[0] = self.magic;
        bytes[1] = self.section_count;
        bytes[2] = self.flash_mode;
        bytes[3] = self.flash_size_speed;
        put_u32(bytes, 4, self.entry);
    }
}

/// Prefix header bridging to the real [`ImageHeader`].
///
/// The image header is found `length` bytes after the end of this header.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtensionHeader {
    pub magic: u8,
    pub count: u8,
    pub flash_mode: u8,
    pub flash_size_speed: u8,
    pub entry: u32,
    pub address: u32,
    /// Length of the auxiliary blob between this header and the image header.
    pub length: u32,
}

impl ExtensionHeader {
    /// Both sentinels have to match before anything else in the header means something.
    pub fn is_recognized(&self) -> bool {
        self.magic == EXTENSION_MAGIC && self.count == EXTENSION_MAGIC_COUNT
    }
}

impl Layout for ExtensionHeader {
    const SIZE: usize = 16;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            magic: bytes[0],
            count: bytes[1],
            flash_mode: bytes[2],
            flash_size_speed: bytes[3],
            entry: u32_at(bytes, 4),
            address: u32_at(bytes, 8),
            length: u32_at(bytes, 12),
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[0] = self.magic;
        bytes[1] = self.count;
        bytes[2] = self.flash_mode;
        bytes[3] = self.flash_size_speed;
        put_u32(bytes, 4, self.entry);
        put_u32(bytes, 8, self.address);
        put_u32(bytes, 12, self.length);
    }
}

/// One contiguous code or data region, directly followed by `length` payload bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SectionHeader {
    /// Destination address in memory.
    pub address: u32,
    pub length: u32,
}

impl Layout for SectionHeader {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            address: u32_at(bytes, 0),
            length: u32_at(bytes, 4),
        }
    }

    fn encode(&self, bytes: &mut [u8]) {
        put_u32(bytes, 0, self.address);
        put_u32(bytes, 4, self.length);
    }
}

/// Flash chip size, from the high nibble of [`ImageHeader::flash_size_speed`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashSize {
    Mbit4,
    Mbit2,
    Mbit8,
    Mbit16,
    Mbit32,
    Unknown(u8),
}

impl FlashSize {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => FlashSize::Mbit4,
            1 => FlashSize::Mbit2,
            2 => FlashSize::Mbit8,
            3 => FlashSize::Mbit16,
            4 => FlashSize::Mbit32,
            other => FlashSize::Unknown(other),
        }
    }

    /// Usable capacity in bytes.
    ///
    /// Images can only be mapped from the first megabyte, so larger chips are capped there.
    /// Unknown chips are assumed to hold 4 Mbit.
    pub const fn capacity(&self) -> u32 {
        match self {
            FlashSize::Mbit2 => 0x40000,
            FlashSize::Mbit4 | FlashSize::Unknown(_) => 0x80000,
            FlashSize::Mbit8 | FlashSize::Mbit16 | FlashSize::Mbit32 => 0x100000,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            FlashSize::Mbit4 => "4 MBit",
            FlashSize::Mbit2 => "2 MBit",
            FlashSize::Mbit8 => "8 MBit",
            FlashSize::Mbit16 => "16 MBit",
            FlashSize::Mbit32 => "32 MBit",
            FlashSize::Unknown(_) => "Unknown flash memory size",
        }
    }
}

/// SPI clock, from the low nibble of [`ImageHeader::flash_size_speed`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashSpeed {
    Mhz40,
    Mhz26,
    Mhz20,
    Mhz80,
    Unknown(u8),
}

impl FlashSpeed {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x0 => FlashSpeed::Mhz40,
            0x1 => FlashSpeed::Mhz26,
            0x2 => FlashSpeed::Mhz20,
            0xF => FlashSpeed::Mhz80,
            other => FlashSpeed::Unknown(other),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            FlashSpeed::Mhz40 => "40 MHz",
            FlashSpeed::Mhz26 => "26.7 MHz",
            FlashSpeed::Mhz20 => "20 MHz",
            FlashSpeed::Mhz80 => "80 MHz",
            FlashSpeed::Unknown(_) => "unknown",
        }
    }
}
