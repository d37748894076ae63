pub mod image;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::vec;
use std::vec::Vec;

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};

use crate::boot::Boot;
use crate::layout::SECTOR_SIZE;
use crate::loader::Memory;

pub use image::ImageBuilder;

/// Erase count per flash sector.
#[derive(Debug, Default)]
pub struct WearTracker(BTreeMap<u32, usize>);

impl WearTracker {
    pub const fn new() -> Self {
        WearTracker(BTreeMap::new())
    }

    pub fn increase(&mut self, sector: u32) {
        *self.0.entry(sector).or_default() += 1;
    }

    pub fn erases(&self, sector: u32) -> usize {
        self.0.get(&sector).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

/// NOR flash in memory: erased bytes are `0xFF`, writes can only clear bits.
pub struct MockFlash {
    pub data: Vec<u8>,
    pub wear: WearTracker,
    pub writes: usize,
    failing: Option<Range<u32>>,
    largest_read: usize,
}

impl MockFlash {
    pub fn new(capacity: u32) -> Self {
        MockFlash {
            data: vec![0xFF; capacity as usize],
            wear: WearTracker::new(),
            writes: 0,
            failing: None,
            largest_read: 0,
        }
    }

    /// Put `bytes` at `offset` directly, as if flashed by a programmer.
    pub fn place(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Make every read touching `range` fail.
    pub fn fail_reads(&mut self, range: Range<u32>) {
        self.failing = Some(range);
    }

    pub fn largest_read(&self) -> usize {
        self.largest_read
    }

    fn span(&self, offset: u32, len: usize) -> Result<Range<usize>, NorFlashErrorKind> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(NorFlashErrorKind::OutOfBounds)?;
        if end > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl ErrorType for MockFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let span = self.span(offset, bytes.len())?;
        if let Some(failing) = &self.failing {
            if (span.start as u32) < failing.end && failing.start < span.end as u32 {
                return Err(NorFlashErrorKind::Other);
            }
        }

        self.largest_read = self.largest_read.max(bytes.len());
        bytes.copy_from_slice(&self.data[span]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from % SECTOR_SIZE != 0 || to % SECTOR_SIZE != 0 || from > to {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let span = self.span(from, (to - from) as usize)?;
        self.data[span].fill(0xFF);

        for sector in from / SECTOR_SIZE..to / SECTOR_SIZE {
            self.wear.increase(sector);
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset as usize % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let span = self.span(offset, bytes.len())?;
        for (cell, byte) in self.data[span].iter_mut().zip(bytes) {
            *cell &= byte;
        }

        self.writes += 1;
        Ok(())
    }
}

/// A window of RAM starting at `base`.
pub struct MockRam {
    pub base: u32,
    pub bytes: Vec<u8>,
}

impl MockRam {
    pub fn new(base: u32, len: usize) -> Self {
        MockRam {
            base,
            bytes: vec![0; len],
        }
    }

    pub fn at(&self, address: u32, len: usize) -> &[u8] {
        let start = (address - self.base) as usize;
        &self.bytes[start..start + len]
    }
}

impl Memory for MockRam {
    fn window(&mut self, address: u32, len: usize) -> &mut [u8] {
        let start = (address - self.base) as usize;
        &mut self.bytes[start..start + len]
    }
}

std::thread_local! {
    static BOOTED: Cell<Option<(u32, Option<u32>)>> = const { Cell::new(None) };
}

/// Handoff that records its target and unwinds instead of jumping.
pub struct RecordingBoot;

impl Boot for RecordingBoot {
    unsafe fn boot(entry: u32, argument: Option<u32>) -> ! {
        BOOTED.set(Some((entry, argument)));
        panic!("boot into {entry:#x}");
    }
}

/// Run `f`, returning the handoff target if it tried to boot through [`RecordingBoot`].
pub fn booted(f: impl FnOnce()) -> Option<(u32, Option<u32>)> {
    BOOTED.set(None);
    let _ = panic::catch_unwind(AssertUnwindSafe(f));
    BOOTED.take()
}
