//! ZIP archive writing.
//!
//! This module produces standard ZIP containers from a stream of named
//! entries. It is the only part of the crate that knows the binary layout.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (headers, EOCD, DOS time)
//! - [`writer`]: Streaming writer that emits entries and the central directory
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The writer never seeks. Each entry's CRC-32 and sizes are written after
//! its data in a data descriptor, then repeated in the Central Directory.
//!
//! ## Supported Features
//!
//! - DEFLATE compression
//! - UTF-8 entry names
//! - ZIP64 extensions for more than 65535 entries and entries or archives over 4GB
//!
//! ## Limitations
//!
//! - No encryption support
//! - No directory entries, permissions or extra fields

mod structures;
mod writer;

pub use structures::*;
pub use writer::ZipWriter;
