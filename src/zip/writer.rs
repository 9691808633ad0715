//! Streaming ZIP archive writer.
//!
//! Entries are written front to back without seeking: each local header
//! carries zeroed CRC and sizes, and the real values follow the entry data
//! in a data descriptor. The central directory is accumulated in memory and
//! written by [`ZipWriter::finish`], switching to ZIP64 records for counts,
//! sizes or offsets that outgrow the classic fields.

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use std::collections::HashSet;
use std::io::{self, Write};
use tracing::{debug, trace};

use anyhow::{Result, bail};

use super::structures::*;

/// Writer wrapper that tracks how many bytes went through it.
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// The entry currently receiving data.
struct OpenEntry {
    record: ZipFileEntry,
    crc: Crc,
    data_start: u64,
}

/// ZIP archive writer over any byte sink.
///
/// Use [`start_entry`](Self::start_entry), write the entry contents through
/// the [`Write`] impl, then [`finish_entry`](Self::finish_entry). Dropping a
/// writer that was never finished still closes the archive, ignoring errors.
pub struct ZipWriter<W: Write> {
    out: CountingWriter<W>,
    /// Shared by all entries, reset between them.
    encoder: DeflateEncoder<Vec<u8>>,
    entries: Vec<ZipFileEntry>,
    names: HashSet<String>,
    current: Option<OpenEntry>,
    finished: bool,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: CountingWriter { inner, written: 0 },
            encoder: DeflateEncoder::new(Vec::new(), Compression::default()),
            entries: Vec::new(),
            names: HashSet::new(),
            current: None,
            finished: false,
        }
    }

    /// Begin a new entry, closing the previous one if still open.
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        if self.finished {
            bail!("archive already finished");
        }
        self.finish_entry()?;

        if name.len() > u16::MAX as usize {
            bail!("entry name too long: {name}");
        }
        if self.names.contains(name) {
            bail!("duplicate entry: {name}");
        }

        let record = ZipFileEntry {
            file_name: name.to_string(),
            modified: DosDateTime::now(),
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            lfh_offset: self.out.written,
        };
        record.write_local_header(&mut self.out)?;
        trace!(entry = name, offset = record.lfh_offset, "local header written");

        self.names.insert(record.file_name.clone());
        self.current = Some(OpenEntry {
            record,
            crc: Crc::new(),
            data_start: self.out.written,
        });
        Ok(())
    }

    /// Close the open entry, if any, and write its data descriptor.
    pub fn finish_entry(&mut self) -> Result<()> {
        let Some(mut entry) = self.current.take() else {
            return Ok(());
        };

        let tail = self.encoder.reset(Vec::new())?;
        self.out.write_all(&tail)?;

        entry.record.crc32 = entry.crc.sum();
        entry.record.compressed_size = self.out.written - entry.data_start;
        entry.record.write_data_descriptor(&mut self.out)?;

        debug!(
            entry = %entry.record.file_name,
            size = entry.record.uncompressed_size,
            compressed = entry.record.compressed_size,
            "entry written"
        );
        self.entries.push(entry.record);
        Ok(())
    }

    /// Close any open entry and write the central directory.
    ///
    /// The underlying sink is flushed but not dropped; it is released when
    /// the writer goes out of scope.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.finish_entry()?;

        let cd_offset = self.out.written;
        for entry in &self.entries {
            entry.write_central_header(&mut self.out)?;
        }
        let eocd = EndOfCentralDirectory {
            total_entries: self.entries.len() as u64,
            cd_size: self.out.written - cd_offset,
            cd_offset,
        };

        if eocd.is_zip64() {
            let eocd64_offset = self.out.written;
            Zip64EOCD {
                total_entries: eocd.total_entries,
                cd_size: eocd.cd_size,
                cd_offset: eocd.cd_offset,
            }
            .write_to(&mut self.out)?;
            Zip64EOCDLocator { eocd64_offset }.write_to(&mut self.out)?;
            trace!(eocd64_offset, "zip64 end of central directory written");
        }
        eocd.write_to(&mut self.out)?;
        self.out.flush()?;

        debug!(entries = self.entries.len(), bytes = self.out.written, "archive finished");
        Ok(())
    }
}

impl<W: Write> Write for ZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(entry) = self.current.as_mut() else {
            return Err(io::Error::other("no entry is open"));
        };
        self.encoder.write_all(buf)?;
        let pending = self.encoder.get_mut();
        self.out.write_all(pending)?;
        pending.clear();

        entry.crc.update(buf);
        entry.record.uncompressed_size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Drop for ZipWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish();
        }
    }
}
