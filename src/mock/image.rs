use std::vec::Vec;

use crate::layout::{
    Layout,
    image::{
        EXTENSION_MAGIC, EXTENSION_MAGIC_COUNT, ExtensionHeader, IMAGE_MAGIC, ImageHeader,
        SectionHeader,
    },
};
use crate::validate::CHECKSUM_SEED;

/// Produces a complete image, extension header through checksum byte.
#[derive(Clone)]
pub struct ImageBuilder {
    entry: u32,
    blob: Vec<u8>,
    sections: Vec<(u32, Vec<u8>)>,
}

impl ImageBuilder {
    pub fn new(entry: u32) -> Self {
        ImageBuilder {
            entry,
            blob: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Auxiliary bytes between the extension header and the image header.
    pub fn blob(mut self, blob: &[u8]) -> Self {
        self.blob = blob.to_vec();
        self
    }

    pub fn section(mut self, address: u32, payload: &[u8]) -> Self {
        self.sections.push((address, payload.to_vec()));
        self
    }

    /// Image for a 16 byte aligned flash offset.
    pub fn build(&self) -> Vec<u8> {
        self.build_at(0)
    }

    /// Image for flash offset `base`; the checksum position depends on it.
    pub fn build_at(&self, base: u32) -> Vec<u8> {
        let mut out = Vec::new();

        let extension = ExtensionHeader {
            magic: EXTENSION_MAGIC,
            count: EXTENSION_MAGIC_COUNT,
            flash_mode: 0,
            flash_size_speed: 0,
            entry: self.entry,
            address: 0,
            length: self.blob.len() as u32,
        };
        push(&mut out, &extension);
        out.extend_from_slice(&self.blob);

        let header = ImageHeader {
            magic: IMAGE_MAGIC,
            section_count: self.sections.len() as u8,
            flash_mode: 0,
            flash_size_speed: 0,
            entry: self.entry,
        };
        push(&mut out, &header);

        let mut checksum = CHECKSUM_SEED;
        for (address, payload) in &self.sections {
            let section = SectionHeader {
                address: *address,
                length: payload.len() as u32,
            };
            push(&mut out, &section);
            out.extend_from_slice(payload);
            checksum = payload.iter().fold(checksum, |acc, byte| acc ^ byte);
        }

        let checksum_at = (base + out.len() as u32) | 0x0F;
        out.resize((checksum_at - base) as usize, 0);
        out.push(checksum);
        out
    }

    /// Offset of the image header within the built image.
    pub fn header_offset(&self) -> usize {
        ExtensionHeader::SIZE + self.blob.len()
    }

    /// Offsets of all payload bytes within the built image.
    pub fn payload_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::new();
        let mut at = self.header_offset() + ImageHeader::SIZE;
        for (_, payload) in &self.sections {
            at += SectionHeader::SIZE;
            offsets.extend(at..at + payload.len());
            at += payload.len();
        }
        offsets
    }

    /// Offset just past the last payload byte.
    pub fn payload_end(&self) -> usize {
        self.header_offset()
            + ImageHeader::SIZE
            + self
                .sections
                .iter()
                .map(|(_, payload)| SectionHeader::SIZE + payload.len())
                .sum::<usize>()
    }
}

fn push<T: Layout>(out: &mut Vec<u8>, record: &T) {
    let start = out.len();
    out.resize(start + T::SIZE, 0);
    record.encode(&mut out[start..]);
}
