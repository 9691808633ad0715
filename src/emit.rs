use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::SourceWarning;
use crate::walk::{ArchiveTarget, Member, Planner};
use crate::zip::ZipWriter;

/// An archive file open for writing.
///
/// Dropping it without [`finish`](Self::finish) still closes the archive, so
/// whatever was added before an error stays readable.
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<BufWriter<File>>,
}

impl ArchiveWriter {
    /// Create (or truncate) the archive at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        info!(?path, "create archive");
        let file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(BufWriter::new(file)),
        })
    }

    /// Open the member's source and stream it into a new entry.
    pub fn add(&mut self, member: &Member) -> Result<()> {
        let mut source = File::open(&member.source_path)
            .with_context(|| format!("cannot open {}", member.source_path.display()))?;

        debug!(source = ?member.source_path, entry = %member.entry_name, "add member");
        self.zip.start_entry(&member.entry_name)?;
        io::copy(&mut source, &mut self.zip)
            .with_context(|| format!("cannot read {}", member.source_path.display()))?;
        self.zip.finish_entry()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.zip
            .finish()
            .with_context(|| format!("cannot finish {}", self.path.display()))
    }
}

/// Write one planned archive with all of its members.
///
/// On error the partially written archive is left on disk. The writer and
/// the output file are still closed on the way out.
pub fn write_archive(target: &ArchiveTarget) -> Result<()> {
    let mut archive = ArchiveWriter::create(&target.archive_path)?;
    for member in &target.members {
        archive.add(member)?;
    }
    archive.finish()
}

/// Create the shared archive at `path`, then plan and add each source in turn.
///
/// The output exists before any source is looked at, so a failure to create
/// it comes before any skipped-source warning.
pub fn write_shared_archive<F>(path: &Path, sources: &[PathBuf], planner: &mut Planner<F>) -> Result<()>
where
    F: FnMut(SourceWarning),
{
    let mut archive = ArchiveWriter::create(path)?;
    for source in sources {
        for member in planner.shared_members(source) {
            archive.add(&member)?;
        }
    }
    archive.finish()
}
