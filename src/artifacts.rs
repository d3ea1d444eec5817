use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix of the scratch files left behind by player-script decoders.
pub const PLAYER_SCRIPT_SUFFIX: &str = "-player-script.js";

/// Removes scratch files from a directory when dropped, whatever the outcome
/// of the work done while it was alive.
#[derive(Debug)]
pub struct ArtifactSweeper {
    dir: PathBuf,
    suffix: &'static str,
}

impl ArtifactSweeper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            suffix: PLAYER_SCRIPT_SUFFIX,
        }
    }

    /// Sweeps the process working directory.
    pub fn in_current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes matching files now and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot list artifact directory");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(self.suffix));
            if !matches || !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(file = %path.display(), "Removed artifact");
                    removed += 1;
                }
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to remove artifact"),
            }
        }
        removed
    }
}

impl Drop for ArtifactSweeper {
    fn drop(&mut self) {
        self.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_removes_only_player_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1700000000-player-script.js"), "x").unwrap();
        fs::write(dir.path().join("keep.js"), "x").unwrap();
        fs::create_dir(dir.path().join("nested-player-script.js")).unwrap();

        let sweeper = ArtifactSweeper::new(dir.path());
        assert_eq!(sweeper.dir(), dir.path());
        drop(sweeper);

        assert!(!dir.path().join("1700000000-player-script.js").exists());
        assert!(dir.path().join("keep.js").exists());
        assert!(dir.path().join("nested-player-script.js").is_dir());
    }

    #[test]
    fn sweep_reports_removed_count() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in ["1", "2"] {
            fs::write(dir.path().join(format!("{stamp}{PLAYER_SCRIPT_SUFFIX}")), "x").unwrap();
        }
        let sweeper = ArtifactSweeper::new(dir.path());
        assert_eq!(sweeper.sweep(), 2);
        assert_eq!(sweeper.sweep(), 0);
    }

    #[test]
    fn missing_directory_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = ArtifactSweeper::new(dir.path().join("gone"));
        assert_eq!(sweeper.sweep(), 0);
    }
}
