//! Source classification and archive layout.
//!
//! Turns each source of a [`RunPlan`] into archive members: which archive
//! each file goes into and under which entry name.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::SourceWarning;
use crate::plan::RunPlan;

/// A regular file and the name it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub source_path: PathBuf,
    /// `/`-separated, never starts with `/`.
    pub entry_name: String,
}

/// An archive to create and the files that go into it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub archive_path: PathBuf,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Directory,
    Missing,
    /// Exists but is neither a regular file nor a directory.
    Other,
}

/// Classify a source path, following symlinks. Anything that cannot be
/// stat'ed counts as missing.
pub fn classify(path: &Path) -> SourceKind {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => SourceKind::File,
        Ok(meta) if meta.is_dir() => SourceKind::Directory,
        Ok(_) => SourceKind::Other,
        Err(err) => {
            trace!(?path, %err, "stat failed");
            SourceKind::Missing
        }
    }
}

/// Final component of `path`.
///
/// Paths such as `.` or `..` have no file name of their own; they are
/// resolved first so the name of the directory they point at is used.
/// The filesystem root has no name at all and yields an empty string.
pub fn basename(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().into_owned();
    }
    fs::canonicalize(path)
        .ok()
        .and_then(|full| full.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// Join the normal components of a relative path with `/`.
fn entry_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect the regular files below `dir`, named `prefix` + their path
/// relative to `dir`.
///
/// Only direct children are considered unless `recursive` is set.
/// Directories that cannot be listed are treated as empty.
pub fn directory_members(dir: &Path, prefix: &str, recursive: bool) -> Vec<Member> {
    let mut walker = WalkDir::new(dir).min_depth(1).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut members = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%err, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let entry_name = format!("{prefix}{}", entry_path(relative));
        trace!(source = ?entry.path(), %entry_name, "member");
        members.push(Member {
            source_path: entry.path().to_path_buf(),
            entry_name,
        });
    }
    members
}

/// Naming policy applied to one source.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub recursive: bool,
    pub content_only: bool,
}

impl Layout {
    /// Members contributed by a source already known to be a file or directory.
    pub fn members(&self, source: &Path, kind: SourceKind) -> Vec<Member> {
        match kind {
            SourceKind::File => vec![Member {
                source_path: source.to_path_buf(),
                entry_name: basename(source),
            }],
            SourceKind::Directory => {
                let name = basename(source);
                let prefix = if self.content_only || name.is_empty() {
                    String::new()
                } else {
                    format!("{name}/")
                };
                directory_members(source, &prefix, self.recursive)
            }
            SourceKind::Missing | SourceKind::Other => Vec::new(),
        }
    }
}

/// Maps sources to archive members, one source at a time.
///
/// Skipped sources are handed to the `warn` callback as they are met.
pub struct Planner<F: FnMut(SourceWarning)> {
    layout: Layout,
    warn: F,
}

impl<F: FnMut(SourceWarning)> Planner<F> {
    pub fn new(plan: &RunPlan, warn: F) -> Self {
        Self {
            layout: Layout {
                recursive: plan.recursive,
                content_only: plan.content_only,
            },
            warn,
        }
    }

    /// Members `source` adds to a shared archive. Missing and special
    /// sources add nothing.
    pub fn shared_members(&mut self, source: &Path) -> Vec<Member> {
        match classify(source) {
            SourceKind::Missing => {
                (self.warn)(SourceWarning::NotFound(source.to_path_buf()));
                Vec::new()
            }
            SourceKind::Other => {
                (self.warn)(SourceWarning::Skipping(source.to_path_buf()));
                Vec::new()
            }
            kind => {
                debug!(?source, ?kind, "adding source");
                self.layout.members(source, kind)
            }
        }
    }

    /// The `<basename>.zip` archive for `source` in the working directory,
    /// or `None` when the source is skipped.
    pub fn separate_target(&mut self, source: &Path) -> Option<ArchiveTarget> {
        match classify(source) {
            SourceKind::Missing => {
                (self.warn)(SourceWarning::NotFound(source.to_path_buf()));
                None
            }
            SourceKind::Other => {
                (self.warn)(SourceWarning::NotFileOrDirectory(source.to_path_buf()));
                None
            }
            kind => {
                debug!(?source, ?kind, "planning separate archive");
                Some(ArchiveTarget {
                    archive_path: PathBuf::from(format!("{}.zip", basename(source))),
                    members: self.layout.members(source, kind),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Output;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    /// `dir/x`, `dir/sub/y` inside a fresh temporary directory.
    fn sample_tree() -> TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("dir");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("x"), "x").unwrap();
        fs::write(dir.join("sub").join("y"), "y").unwrap();
        tmp
    }

    fn names(members: &[Member]) -> BTreeSet<String> {
        members.iter().map(|m| m.entry_name.clone()).collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn shared(sources: Vec<PathBuf>, recursive: bool, content_only: bool) -> RunPlan {
        RunPlan {
            sources,
            output: Output::Shared("out.zip".into()),
            recursive,
            content_only,
        }
    }

    #[test]
    fn classify_kinds() {
        let tmp = sample_tree();
        assert_eq!(classify(&tmp.path().join("dir")), SourceKind::Directory);
        assert_eq!(classify(&tmp.path().join("dir/x")), SourceKind::File);
        assert_eq!(classify(&tmp.path().join("ghost")), SourceKind::Missing);
    }

    #[cfg(unix)]
    #[test]
    fn classify_special_file() {
        assert_eq!(classify(Path::new("/dev/null")), SourceKind::Other);
    }

    #[test]
    fn basename_rules() {
        assert_eq!(basename(Path::new("a/b/c.txt")), "c.txt");
        assert_eq!(basename(Path::new("dir/")), "dir");
        let tmp = sample_tree();
        let dot = tmp.path().join("dir").join(".");
        assert_eq!(basename(&dot), "dir");
    }

    #[test]
    fn recursive_with_prefix() {
        let tmp = sample_tree();
        let members = directory_members(&tmp.path().join("dir"), "dir/", true);
        assert_eq!(names(&members), set(&["dir/x", "dir/sub/y"]));
        for member in &members {
            assert!(member.source_path.is_file());
        }
    }

    #[test]
    fn content_only_has_no_prefix() {
        let tmp = sample_tree();
        let members = directory_members(&tmp.path().join("dir"), "", true);
        assert_eq!(names(&members), set(&["x", "sub/y"]));
    }

    #[test]
    fn non_recursive_takes_direct_children() {
        let tmp = sample_tree();
        let members = directory_members(&tmp.path().join("dir"), "dir/", false);
        assert_eq!(names(&members), set(&["dir/x"]));
    }

    #[test]
    fn empty_directory_has_no_members() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(directory_members(tmp.path(), "", true).is_empty());
    }

    #[test]
    fn entry_names_are_relative_and_slash_separated() {
        let tmp = sample_tree();
        let members = directory_members(&tmp.path().join("dir"), "", true);
        for member in members {
            assert!(!member.entry_name.starts_with('/'));
            assert!(!member.entry_name.contains('\\'));
        }
    }

    #[test]
    fn shared_mode_members_follow_source_order() {
        let tmp = sample_tree();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let sources = vec![file.clone(), tmp.path().join("ghost"), tmp.path().join("dir")];
        let plan = shared(sources.clone(), true, false);

        let mut warnings = Vec::new();
        let mut planner = Planner::new(&plan, |w| warnings.push(w));
        let members: Vec<_> = sources.iter().flat_map(|s| planner.shared_members(s)).collect();

        assert_eq!(members[0].entry_name, "a.txt");
        assert_eq!(names(&members), set(&["a.txt", "dir/x", "dir/sub/y"]));
        assert_eq!(warnings, vec![SourceWarning::NotFound(tmp.path().join("ghost"))]);
    }

    #[test]
    fn separate_mode_names_archives_after_sources() {
        let tmp = sample_tree();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "hi").unwrap();
        let plan = RunPlan {
            sources: vec![file, tmp.path().join("ghost"), tmp.path().join("dir")],
            output: Output::Separate,
            recursive: false,
            content_only: false,
        };

        let mut warnings = Vec::new();
        let mut planner = Planner::new(&plan, |w| warnings.push(w));
        let targets: Vec<_> = plan
            .sources
            .iter()
            .filter_map(|s| planner.separate_target(s))
            .collect();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].archive_path, PathBuf::from("a.txt.zip"));
        assert_eq!(names(&targets[0].members), set(&["a.txt"]));
        assert_eq!(targets[1].archive_path, PathBuf::from("dir.zip"));
        assert_eq!(names(&targets[1].members), set(&["dir/x"]));
        assert_eq!(warnings, vec![SourceWarning::NotFound(tmp.path().join("ghost"))]);
    }

    #[test]
    fn empty_source_is_not_found() {
        let plan = shared(vec![PathBuf::new()], true, false);
        let mut warnings = Vec::new();
        let members = Planner::new(&plan, |w| warnings.push(w)).shared_members(Path::new(""));
        assert!(members.is_empty());
        assert_eq!(warnings, vec![SourceWarning::NotFound(PathBuf::new())]);
    }

    #[cfg(unix)]
    #[test]
    fn special_files_are_skipped_with_mode_specific_wording() {
        let null = Path::new("/dev/null");
        let plan = shared(vec![null.to_path_buf()], true, false);
        let mut warnings = Vec::new();
        let members = Planner::new(&plan, |w| warnings.push(w)).shared_members(null);
        assert!(members.is_empty());
        assert_eq!(warnings, vec![SourceWarning::Skipping(null.into())]);

        let plan = RunPlan {
            output: Output::Separate,
            ..plan
        };
        let mut warnings = Vec::new();
        let target = Planner::new(&plan, |w| warnings.push(w)).separate_target(null);
        assert!(target.is_none());
        assert_eq!(warnings, vec![SourceWarning::NotFileOrDirectory(null.into())]);
    }

    #[cfg(unix)]
    #[test]
    fn root_directory_entries_have_no_leading_slash() {
        let root = Path::new("/");
        assert_eq!(basename(root), "");

        let layout = Layout {
            recursive: false,
            content_only: false,
        };
        for member in layout.members(root, SourceKind::Directory) {
            assert!(!member.entry_name.starts_with('/'), "{}", member.entry_name);
            assert!(!member.entry_name.contains('/'), "{}", member.entry_name);
        }
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped() {
        let tmp = sample_tree();
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("dir/broken"))
            .unwrap();
        let members = directory_members(&tmp.path().join("dir"), "", true);
        assert_eq!(names(&members), set(&["x", "sub/y"]));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_end_the_walk() {
        let tmp = sample_tree();
        let dir = tmp.path().join("dir");
        std::os::unix::fs::symlink(&dir, dir.join("sub/loop")).unwrap();
        let members = directory_members(&dir, "", true);
        assert_eq!(names(&members), set(&["x", "sub/y"]));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directories_contribute_nothing() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = sample_tree();
        let locked = tmp.path().join("dir/locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden"), "h").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users can still list it
        let listable = fs::read_dir(&locked).is_ok();
        let members = directory_members(&tmp.path().join("dir"), "", true);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if listable {
            return;
        }

        assert_eq!(names(&members), set(&["x", "sub/y"]));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_followed() {
        let tmp = sample_tree();
        std::os::unix::fs::symlink(tmp.path().join("dir/sub"), tmp.path().join("dir/link")).unwrap();
        let members = directory_members(&tmp.path().join("dir"), "", true);
        assert_eq!(names(&members), set(&["x", "sub/y", "link/y"]));
    }
}
