use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// View over the recordings directory.
///
/// The entry list is a snapshot rebuilt from scratch on every refresh,
/// ordered newest-first by file creation time. A scan failure keeps the
/// previous snapshot; a missing directory is simply an empty catalog (the
/// state before the first recording).
pub struct Catalog {
    dir: PathBuf,
    entries: Vec<String>,
}

impl Catalog {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            entries: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Display names, newest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn refresh(&mut self) {
        match scan(&self.dir) {
            Ok(entries) => self.entries = entries,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), "catalog scan failed, keeping previous list: {e}");
            }
        }
    }

    /// Map a display name back to a playable file path.
    ///
    /// Names are plain file names; anything carrying a path separator, or
    /// naming a file that no longer exists, resolves to `None`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
            return None;
        }
        let path = self.dir.join(name);
        path.is_file().then_some(path)
    }

    /// Generate a display name for a new recording.
    ///
    /// Names are timestamped to the second; a same-second collision gets a
    /// numeric suffix so the catalog invariant of unique names holds.
    pub fn new_display_name(&self) -> String {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        unique_name(&self.dir, &format!("recording_{stamp}"))
    }
}

fn unique_name(dir: &Path, base: &str) -> String {
    let mut name = format!("{base}.wav");
    let mut n = 1;
    while dir.join(&name).exists() {
        name = format!("{base}_{n}.wav");
        n += 1;
    }
    name
}

fn scan(dir: &Path) -> io::Result<Vec<String>> {
    let read_dir = match fs::read_dir(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        other => other?,
    };

    let mut found: Vec<(SystemTime, String)> = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".wav") {
            continue;
        }

        // A file can vanish between the scan and the stat; skip it.
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let Ok(created) = meta.created().or_else(|_| meta.modified()) else {
            continue;
        };

        found.push((created, name));
    }

    // Newest first; name as a deterministic tie-break within one timestamp.
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    Ok(found.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn write_wav(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"RIFF").unwrap();
        // Keep file timestamps strictly ordered across calls.
        sleep(Duration::from_millis(20));
    }

    #[test]
    fn test_missing_directory_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(dir.path().join("not-created-yet"));
        catalog.refresh();
        assert!(catalog.entries().is_empty());
    }

    #[test]
    fn test_empty_directory_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(dir.path().to_path_buf());
        catalog.refresh();
        assert!(catalog.entries().is_empty());
    }

    #[test]
    fn test_entries_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path(), "first.wav");
        write_wav(dir.path(), "second.wav");
        write_wav(dir.path(), "third.wav");

        let mut catalog = Catalog::new(dir.path().to_path_buf());
        catalog.refresh();
        assert_eq!(catalog.entries(), ["third.wav", "second.wav", "first.wav"]);
    }

    #[test]
    fn test_non_wav_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path(), "note.wav");
        fs::write(dir.path().join("cover.png"), b"png").unwrap();
        fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let mut catalog = Catalog::new(dir.path().to_path_buf());
        catalog.refresh();
        assert_eq!(catalog.entries(), ["note.wav"]);
    }

    #[test]
    fn test_new_recording_appears_first_after_refresh() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path(), "old_a.wav");
        write_wav(dir.path(), "old_b.wav");

        let mut catalog = Catalog::new(dir.path().to_path_buf());
        catalog.refresh();
        let before = catalog.entries().to_vec();

        // Refresh without changes returns the prior list unchanged.
        catalog.refresh();
        assert_eq!(catalog.entries(), before.as_slice());

        write_wav(dir.path(), "new.wav");
        catalog.refresh();
        assert_eq!(catalog.entries().len(), before.len() + 1);
        assert_eq!(catalog.entries()[0], "new.wav");
        assert_eq!(&catalog.entries()[1..], before.as_slice());
    }

    #[test]
    fn test_resolve_existing_and_missing_names() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path(), "note.wav");

        let catalog = Catalog::new(dir.path().to_path_buf());
        assert_eq!(catalog.resolve("note.wav"), Some(dir.path().join("note.wav")));
        assert_eq!(catalog.resolve("nonexistent.wav"), None);
        // Repeated calls resolve to the same entry.
        assert_eq!(catalog.resolve("note.wav"), catalog.resolve("note.wav"));
    }

    #[test]
    fn test_resolve_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path(), "note.wav");

        let catalog = Catalog::new(dir.path().join("sub"));
        assert_eq!(catalog.resolve("../note.wav"), None);
    }

    #[test]
    fn test_unique_name_suffixes_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_name(dir.path(), "recording_x"), "recording_x.wav");

        fs::write(dir.path().join("recording_x.wav"), b"RIFF").unwrap();
        assert_eq!(unique_name(dir.path(), "recording_x"), "recording_x_1.wav");

        fs::write(dir.path().join("recording_x_1.wav"), b"RIFF").unwrap();
        assert_eq!(unique_name(dir.path(), "recording_x"), "recording_x_2.wav");
    }

    #[test]
    fn test_new_display_name_has_wav_extension() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path().to_path_buf());
        let name = catalog.new_display_name();
        assert!(name.starts_with("recording_"));
        assert!(name.ends_with(".wav"));
    }
}
