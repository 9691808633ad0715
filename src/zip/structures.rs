use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::io::Write;

use anyhow::Result;

/// DEFLATE compression method id
pub const METHOD_DEFLATE: u16 = 8;

/// Version needed to extract: 2.0 (deflate, data descriptors)
pub const VERSION_NEEDED: u16 = 20;

/// Version needed to extract: 4.5 (ZIP64 extensions)
pub const VERSION_NEEDED_ZIP64: u16 = 45;

/// Version made by: MS-DOS host, APPNOTE 4.5
pub const VERSION_MADE_BY: u16 = 45;

/// General purpose flag: sizes and CRC follow the data in a descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// General purpose flag: file name is UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// Header id of the ZIP64 extended information extra field
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Stored in a 32-bit field when the real value lives in a ZIP64 record
const U32_MARKER: u32 = 0xFFFF_FFFF;

/// Stored in a 16-bit count when the real value lives in a ZIP64 record
const U16_MARKER: u16 = 0xFFFF;

fn overflows_u32(value: u64) -> bool {
    value >= U32_MARKER as u64
}

fn clamp_u32(value: u64) -> u32 {
    if overflows_u32(value) {
        U32_MARKER
    } else {
        value as u32
    }
}

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Data descriptor, signed; 32-bit or 64-bit sizes
pub const DATA_DESCRIPTOR_SIGNATURE: &[u8] = b"PK\x07\x08";

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";

/// MS-DOS packed date and time, as stored in local and central headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// Earliest representable instant, 1980-01-01 00:00:00.
    pub const EPOCH: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        if dt.year() < 1980 {
            return Self::EPOCH;
        }
        let year = (dt.year() - 1980).min(0x7F) as u16;
        let date = (year << 9) | ((dt.month() as u16) << 5) | dt.day() as u16;
        let time = ((dt.hour() as u16) << 11)
            | ((dt.minute() as u16) << 5)
            | (dt.second() as u16 / 2);
        Self { time, date }
    }

    /// Current local wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().naive_local())
    }
}

/// Everything the central directory needs to know about one written entry.
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub lfh_offset: u64,
}

impl ZipFileEntry {
    pub fn flags(&self) -> u16 {
        if self.file_name.is_ascii() {
            FLAG_DATA_DESCRIPTOR
        } else {
            FLAG_DATA_DESCRIPTOR | FLAG_UTF8
        }
    }

    /// Whether the sizes no longer fit the 32-bit data descriptor.
    pub fn has_large_sizes(&self) -> bool {
        overflows_u32(self.compressed_size) || overflows_u32(self.uncompressed_size)
    }

    /// ZIP64 extra field for the central header, empty when every value fits.
    ///
    /// Only the overflowing values are present, in the order the format
    /// requires: uncompressed size, compressed size, local header offset.
    pub fn zip64_extra(&self) -> Result<Vec<u8>> {
        let mut values = Vec::new();
        for value in [self.uncompressed_size, self.compressed_size, self.lfh_offset] {
            if overflows_u32(value) {
                values.write_u64::<LittleEndian>(value)?;
            }
        }
        if values.is_empty() {
            return Ok(values);
        }
        let mut extra = Vec::with_capacity(4 + values.len());
        extra.write_u16::<LittleEndian>(ZIP64_EXTRA_ID)?;
        extra.write_u16::<LittleEndian>(values.len() as u16)?;
        extra.extend_from_slice(&values);
        Ok(extra)
    }

    /// Write the local file header. CRC and sizes are zero here; they
    /// follow the entry data in the descriptor.
    pub fn write_local_header<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(LFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        w.write_u16::<LittleEndian>(self.flags())?;
        w.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(self.file_name.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_all(self.file_name.as_bytes())?;
        Ok(())
    }

    /// Sizes are written as 64-bit values once either exceeds 32 bits.
    pub fn write_data_descriptor<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(DATA_DESCRIPTOR_SIGNATURE)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        if self.has_large_sizes() {
            w.write_u64::<LittleEndian>(self.compressed_size)?;
            w.write_u64::<LittleEndian>(self.uncompressed_size)?;
        } else {
            w.write_u32::<LittleEndian>(self.compressed_size as u32)?;
            w.write_u32::<LittleEndian>(self.uncompressed_size as u32)?;
        }
        Ok(())
    }

    pub fn write_central_header<W: Write>(&self, w: &mut W) -> Result<()> {
        let extra = self.zip64_extra()?;
        let version_needed = if extra.is_empty() {
            VERSION_NEEDED
        } else {
            VERSION_NEEDED_ZIP64
        };

        w.write_all(CDFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        w.write_u16::<LittleEndian>(version_needed)?;
        w.write_u16::<LittleEndian>(self.flags())?;
        w.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(clamp_u32(self.compressed_size))?;
        w.write_u32::<LittleEndian>(clamp_u32(self.uncompressed_size))?;
        w.write_u16::<LittleEndian>(self.file_name.len() as u16)?;
        w.write_u16::<LittleEndian>(extra.len() as u16)?;
        // comment, disk number start, internal attributes
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(0)?;
        // external attributes
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(clamp_u32(self.lfh_offset))?;
        w.write_all(self.file_name.as_bytes())?;
        w.write_all(&extra)?;
        Ok(())
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
///
/// Holds the true values; fields that do not fit are written as markers and
/// the real values go into [`Zip64EOCD`].
pub struct EndOfCentralDirectory {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn is_zip64(&self) -> bool {
        self.total_entries >= U16_MARKER as u64
            || overflows_u32(self.cd_size)
            || overflows_u32(self.cd_offset)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let entries = self.total_entries.min(U16_MARKER as u64) as u16;
        w.write_all(Self::SIGNATURE)?;
        // single disk archive
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u16::<LittleEndian>(entries)?;
        w.write_u16::<LittleEndian>(entries)?;
        w.write_u32::<LittleEndian>(clamp_u32(self.cd_size))?;
        w.write_u32::<LittleEndian>(clamp_u32(self.cd_offset))?;
        w.write_u16::<LittleEndian>(0)?;
        Ok(())
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u64::<LittleEndian>(self.eocd64_offset)?;
        w.write_u32::<LittleEndian>(1)?;
        Ok(())
    }
}

/// ZIP64 End of Central Directory - 56 bytes
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const SIZE: usize = 56;

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(Self::SIGNATURE)?;
        // size of the remaining record
        w.write_u64::<LittleEndian>(Self::SIZE as u64 - 12)?;
        w.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        w.write_u16::<LittleEndian>(VERSION_NEEDED_ZIP64)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u64::<LittleEndian>(self.total_entries)?;
        w.write_u64::<LittleEndian>(self.total_entries)?;
        w.write_u64::<LittleEndian>(self.cd_size)?;
        w.write_u64::<LittleEndian>(self.cd_offset)?;
        Ok(())
    }
}
