//! Archive Accessor: resolves a SIARD URI whose path segments may cross
//! `.zip`/`.siard` boundaries into a concrete local file, extracting
//! through as many nested archives as needed and caching opened archives
//! by canonicalized name.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;
use crate::workspace::{UnzipMode, Workspace, EAGER_DELETE_IN_FILE_BY_FILE};

fn is_archive_segment(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    lower.ends_with(".zip") || lower.ends_with(".siard")
}

fn split_segments(uri: &str) -> Vec<&str> {
    uri.split('/').filter(|s| !s.is_empty()).collect()
}

/// Caches opened archives and extracted members for one translation run.
pub struct ArchiveAccessor<'w> {
    workspace: &'w Workspace,
    open: HashMap<String, zip::ZipArchive<File>>,
    pending_close: Vec<PathBuf>,
    extract_counter: u64,
    unzip_mode: UnzipMode,
}

impl<'w> ArchiveAccessor<'w> {
    pub fn new(workspace: &'w Workspace) -> Self {
        Self::with_unzip_mode(workspace, UnzipMode::FileByFile)
    }

    pub fn with_unzip_mode(workspace: &'w Workspace, unzip_mode: UnzipMode) -> Self {
        ArchiveAccessor {
            workspace,
            open: HashMap::new(),
            pending_close: Vec::new(),
            extract_counter: 0,
            unzip_mode,
        }
    }

    /// Resolves `uri` to a concrete local path, extracting through nested
    /// archives as needed. If `uri` contains no `.zip`/`.siard` segment,
    /// it is returned verbatim (spec §4.A).
    pub fn resolve(&mut self, uri: &str) -> Result<PathBuf, ArchiveError> {
        let segments = split_segments(uri);
        let leading_slash = uri.starts_with('/');
        self.resolve_segments(None, &segments, leading_slash)
    }

    fn resolve_segments(
        &mut self,
        current_archive: Option<PathBuf>,
        segments: &[&str],
        leading_slash: bool,
    ) -> Result<PathBuf, ArchiveError> {
        let mut accumulated: Vec<&str> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            accumulated.push(segment);

            if !is_archive_segment(segment) {
                continue;
            }

            let rest = &segments[i + 1..];

            match &current_archive {
                None => {
                    let path = join_plain(&accumulated, leading_slash);
                    return self.resolve_segments(Some(path), rest, leading_slash);
                }
                Some(archive_path) => {
                    let member_name = accumulated.join("/");
                    match self.extract_member(archive_path, &member_name) {
                        Ok(extracted) => match self.try_open_as_archive(&extracted) {
                            Ok(()) => {
                                return self.resolve_segments(Some(extracted), rest, false);
                            }
                            Err(_) => {
                                // Real directory/file whose name happens to
                                // contain ".zip"/".siard": keep it in the
                                // accumulated prefix and keep scanning.
                                self.forget(&extracted);
                                continue;
                            }
                        },
                        Err(ArchiveError::EntryNotFound { .. }) => {
                            // Not a member boundary here either; keep
                            // accumulating and scanning forward.
                            continue;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        // No (further) archive segment found: the whole remaining path is
        // either a plain filesystem path (current_archive is None) or a
        // member inside the current archive.
        match current_archive {
            None => Ok(join_plain(&accumulated, leading_slash)),
            Some(archive_path) => {
                let member_name = accumulated.join("/");
                self.extract_member(&archive_path, &member_name)
            }
        }
    }

    fn try_open_as_archive(&mut self, path: &Path) -> Result<(), ArchiveError> {
        self.open_archive(path).map(|_| ())
    }

    fn forget(&mut self, extracted: &Path) {
        self.open.remove(&key_for(extracted));
        if let Some(pos) = self.pending_close.iter().position(|p| p == extracted) {
            self.pending_close.remove(pos);
        }
        let _ = fs::remove_file(extracted);
    }

    fn open_archive(&mut self, path: &Path) -> Result<&mut zip::ZipArchive<File>, ArchiveError> {
        let key = key_for(path);
        if !self.open.contains_key(&key) {
            let file =
                File::open(path).map_err(|_| ArchiveError::NotFound(path.display().to_string()))?;
            let archive = zip::ZipArchive::new(file)
                .map_err(|err| ArchiveError::DecompressionFailed(path.display().to_string(), err))?;
            self.open.insert(key.clone(), archive);
        }
        Ok(self.open.get_mut(&key).unwrap())
    }

    /// Extracts `member_name` out of the archive at `archive_path` into
    /// the workspace, returning the extracted file's path.
    fn extract_member(
        &mut self,
        archive_path: &Path,
        member_name: &str,
    ) -> Result<PathBuf, ArchiveError> {
        let bytes = {
            let archive = self.open_archive(archive_path)?;
            let mut entry = archive.by_name(member_name).map_err(|_| {
                ArchiveError::EntryNotFound {
                    archive: archive_path.display().to_string(),
                    entry: member_name.to_string(),
                }
            })?;
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            buf
        };

        self.extract_counter += 1;
        let dest = self
            .workspace
            .join(format!("x{}", self.extract_counter))
            .join(sanitize_member_name(member_name));

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &bytes)?;
        self.pending_close.push(dest.clone());

        Ok(dest)
    }

    /// Deletes an extracted member eagerly once the caller is done reading
    /// it, but only in `FileByFile` mode and only when the compile-time
    /// `EAGER_DELETE_IN_FILE_BY_FILE` switch is on; in `FullUnzip` mode
    /// extracted members live until workspace teardown (spec §5). Safe to
    /// call on a path not tracked by this accessor (e.g. the original,
    /// non-archived input).
    pub fn forget_after_use(&mut self, path: &Path) {
        if self.unzip_mode != UnzipMode::FileByFile || !EAGER_DELETE_IN_FILE_BY_FILE {
            return;
        }
        if let Some(pos) = self.pending_close.iter().position(|p| p == path) {
            self.pending_close.remove(pos);
            let _ = fs::remove_file(path);
        }
    }

    /// Drains all cached archives and pending-close descriptors. Called
    /// exactly once at teardown.
    pub fn close_all(&mut self) {
        self.open.clear();
        for path in self.pending_close.drain(..) {
            let _ = fs::remove_file(path);
        }
    }
}

fn key_for(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn join_plain(segments: &[&str], leading_slash: bool) -> PathBuf {
    let joined = segments.join("/");
    if leading_slash {
        PathBuf::from(format!("/{}", joined))
    } else {
        PathBuf::from(joined)
    }
}

fn sanitize_member_name(member_name: &str) -> PathBuf {
    // Strip any leading "../" components defensively; member names come
    // from inside a trusted archive's own index, but the extraction
    // target must still stay inside the workspace.
    let mut out = PathBuf::new();
    for part in member_name.split('/') {
        match part {
            "" | "." | ".." => continue,
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, FileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn resolves_plain_path_verbatim() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        let mut accessor = ArchiveAccessor::new(&ws);

        let plain = tmp.path().join("header/metadata.xml");
        let resolved = accessor.resolve(plain.to_str().unwrap()).unwrap();
        assert_eq!(resolved, plain);
    }

    #[test]
    fn resolves_single_level_zip_member() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        let zip_path = tmp.path().join("archive.siard");
        write_zip(&zip_path, &[("header/metadata.xml", b"<root/>")]);

        let mut accessor = ArchiveAccessor::new(&ws);
        let uri = format!("{}/header/metadata.xml", zip_path.display());
        let resolved = accessor.resolve(&uri).unwrap();

        assert_eq!(fs::read(resolved).unwrap(), b"<root/>");
    }

    #[test]
    fn resolves_through_nested_zip() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();

        let inner_path = tmp.path().join("inner.zip.tmp");
        write_zip(&inner_path, &[("lob0", b"\x00\xff\x10")]);
        let inner_bytes = fs::read(&inner_path).unwrap();

        let outer_path = tmp.path().join("outer.siard");
        write_zip(&outer_path, &[("lobs/inner.zip", &inner_bytes)]);

        let mut accessor = ArchiveAccessor::new(&ws);
        let uri = format!("{}/lobs/inner.zip/lob0", outer_path.display());
        let resolved = accessor.resolve(&uri).unwrap();

        assert_eq!(fs::read(resolved).unwrap(), b"\x00\xff\x10");
    }

    #[test]
    fn full_unzip_mode_keeps_extracted_members_until_teardown() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        let zip_path = tmp.path().join("archive.siard");
        write_zip(&zip_path, &[("header/metadata.xml", b"<root/>")]);

        let mut accessor = ArchiveAccessor::with_unzip_mode(&ws, UnzipMode::FullUnzip);
        let uri = format!("{}/header/metadata.xml", zip_path.display());
        let resolved = accessor.resolve(&uri).unwrap();

        accessor.forget_after_use(&resolved);
        assert!(resolved.exists());
    }

    #[test]
    fn missing_entry_is_reported() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        let zip_path = tmp.path().join("archive.siard");
        write_zip(&zip_path, &[("header/metadata.xml", b"<root/>")]);

        let mut accessor = ArchiveAccessor::new(&ws);
        let uri = format!("{}/header/missing.xml", zip_path.display());
        assert!(matches!(
            accessor.resolve(&uri),
            Err(ArchiveError::EntryNotFound { .. })
        ));
    }
}
