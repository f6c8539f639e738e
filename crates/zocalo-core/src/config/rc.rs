//! The boot configuration file (`step.rc` by convention).
//!
//! A line-based `key value` text file. The shell consumes it only
//! through the query functions below; everything else about the
//! settings subsystem lives outside this crate. Keys are matched
//! case-insensitively, `;` and `#` start comments, and a key may
//! repeat (`loadmodule` lines form the module list). The file is
//! re-read on recycle.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::module::ModuleLine;

#[derive(Debug, Error)]
pub enum RcError {
    /// The boot file is required; its absence is a fatal startup
    /// condition with its own exit code.
    #[error("unable to find the boot file {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Parsed boot file with ordered entries.
#[derive(Debug)]
pub struct RcFile {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl RcFile {
    /// Reads and parses the boot file at `path`.
    pub fn load(path: &Path) -> Result<Self, RcError> {
        if !path.exists() {
            return Err(RcError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| RcError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: parse(&content),
        })
    }

    /// Re-reads the file this instance was loaded from.
    pub fn reload(&mut self) -> Result<(), RcError> {
        *self = Self::load(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Boolean query. Absent keys return `default`; a present key
    /// counts as true unless its value spells false.
    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.first(key) {
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "false" | "off" | "no" | "0"
            ),
            None => default,
        }
    }

    /// String query: the first value recorded for `key`.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.first(key)
    }

    /// All values recorded for `key`, in file order.
    pub fn strings(&self, key: &str) -> Vec<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The module list: every `loadmodule` line, in file order.
    pub fn module_lines(&self) -> Vec<ModuleLine> {
        self.strings("loadmodule")
            .into_iter()
            .filter_map(ModuleLine::parse)
            .collect()
    }

    /// Startup items: every `startupapp` line, in file order.
    pub fn startup_apps(&self) -> Vec<&str> {
        self.strings("startupapp")
    }

    fn first(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn parse(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((k, v)) => (k, v.trim()),
            None => (line, ""),
        };
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        entries.push((key.to_ascii_lowercase(), value.to_string()));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::MODULE_CLR;

    fn rc(content: &str) -> RcFile {
        RcFile {
            path: PathBuf::from("step.rc"),
            entries: parse(content),
        }
    }

    #[test]
    fn bool_queries_fall_back_to_defaults() {
        let rc = rc("AutoHideModules\nSetAsShell false\n");
        assert!(rc.bool("autohidemodules", false));
        assert!(!rc.bool("setasshell", true));
        assert!(rc.bool("nostartup", true));
        assert!(!rc.bool("noshellwarning", false));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let rc = rc("NoShellWarning true\n");
        assert!(rc.bool("NOSHELLWARNING", false));
        assert!(rc.bool("noshellwarning", false));
    }

    #[test]
    fn string_returns_the_first_value() {
        let rc = rc("WallpaperStyle tile\nWallpaperStyle center\n");
        assert_eq!(rc.string("wallpaperstyle"), Some("tile"));
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let rc = rc("Wallpaper \"C:\\images\\sea shore.png\"\n");
        assert_eq!(rc.string("wallpaper"), Some(r"C:\images\sea shore.png"));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let rc = rc("; comment\n# another\n\nAutoHideModules\n");
        assert!(rc.bool("autohidemodules", false));
    }

    #[test]
    fn module_lines_keep_file_order_and_flags() {
        let rc = rc(
            "LoadModule C:\\modules\\taskbar.dll\n\
             LoadModule C:\\modules\\hotvm.dll clr\n",
        );
        let lines = rc.module_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].path, PathBuf::from(r"C:\modules\taskbar.dll"));
        assert_eq!(lines[0].flags, 0);
        assert_eq!(lines[1].flags, MODULE_CLR);
    }

    #[test]
    fn missing_file_is_its_own_error() {
        let err = RcFile::load(Path::new(r"Z:\does\not\exist\step.rc")).unwrap_err();
        assert!(matches!(err, RcError::Missing(_)));
    }
}
