//! The `checkpoint` file kept in a save directory, recording the most recent
//! checkpoint and the ones still retained, in protobuf text format.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::writer::{append_suffix, TempFile};

pub const STATE_FILENAME: &str = "checkpoint";

const MODEL_CHECKPOINT_PATH: &str = "model_checkpoint_path";
const ALL_MODEL_CHECKPOINT_PATHS: &str = "all_model_checkpoint_paths";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckpointState {
    /// Path to the most recent checkpoint.
    pub model_checkpoint_path: String,
    /// All retained checkpoints, oldest first; the latest is last.
    pub all_model_checkpoint_paths: Vec<String>,
}

pub fn state_path(dir: &Path) -> PathBuf {
    dir.join(STATE_FILENAME)
}

impl CheckpointState {
    /// Builds the state for `latest`, storing paths inside `dir` relative to it.
    pub fn new(dir: &Path, latest: &Path, all: &[PathBuf]) -> Self {
        let relative = |p: &Path| match p.strip_prefix(dir) {
            Ok(rel) if !dir.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
            _ => p.to_string_lossy().into_owned(),
        };
        let mut all_paths: Vec<String> = all.iter().map(|p| relative(p.as_path())).collect();
        let latest = relative(latest);
        if all_paths.last() != Some(&latest) {
            all_paths.retain(|p| p != &latest);
            all_paths.push(latest.clone());
        }
        Self {
            model_checkpoint_path: latest,
            all_model_checkpoint_paths: all_paths,
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{}: {}\n",
            MODEL_CHECKPOINT_PATH,
            quote(&self.model_checkpoint_path)
        );
        for path in &self.all_model_checkpoint_paths {
            out.push_str(&format!("{}: {}\n", ALL_MODEL_CHECKPOINT_PATHS, quote(path)));
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut latest = None;
        let mut all = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| {
                Error::InvalidState(format!("line {}: expected `key: \"value\"`", lineno + 1))
            })?;
            let value = unquote(value.trim())
                .map_err(|e| Error::InvalidState(format!("line {}: {}", lineno + 1, e)))?;
            match key.trim() {
                MODEL_CHECKPOINT_PATH => latest = Some(value),
                ALL_MODEL_CHECKPOINT_PATHS => all.push(value),
                other => {
                    return Err(Error::InvalidState(format!(
                        "line {}: unknown field {:?}",
                        lineno + 1,
                        other
                    )))
                }
            }
        }
        let model_checkpoint_path = latest
            .ok_or_else(|| Error::InvalidState(format!("missing {}", MODEL_CHECKPOINT_PATH)))?;
        Ok(Self {
            model_checkpoint_path,
            all_model_checkpoint_paths: all,
        })
    }

    /// Reads `<dir>/checkpoint`. Returns `None` if there is no state file.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = state_path(dir);
        if !path.is_file() {
            return Ok(None);
        }
        Self::parse(&fs::read_to_string(path)?).map(Some)
    }

    /// Atomically replaces `<dir>/checkpoint`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = state_path(dir);
        let tmp = TempFile::new(append_suffix(&path, ".tmp"));
        fs::write(tmp.path(), self.to_text())?;
        tmp.persist(&path)?;
        debug!(path = %path.display(), latest = %self.model_checkpoint_path, "updated checkpoint state");
        Ok(())
    }

    /// Resolves a recorded path against the directory holding the state file.
    pub fn resolve(dir: &Path, recorded: &str) -> PathBuf {
        let recorded = Path::new(recorded);
        if recorded.is_absolute() {
            recorded.to_path_buf()
        } else {
            dir.join(recorded)
        }
    }
}

/// Prefix of the most recent checkpoint saved in `dir`, if any.
pub fn latest_checkpoint(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(CheckpointState::read(dir)?
        .map(|state| CheckpointState::resolve(dir, &state.model_checkpoint_path)))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unquote(s: &str) -> std::result::Result<String, String> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("expected a quoted string, got {}", s))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("unsupported escape \\{}", other)),
            None => return Err("dangling backslash".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_format() {
        let dir = Path::new("tensorflow/simple");
        let latest = dir.join("model-two-variables.ckpt");
        let state = CheckpointState::new(dir, &latest, &[latest.clone()]);
        assert_eq!(
            state.to_text(),
            "model_checkpoint_path: \"model-two-variables.ckpt\"\n\
             all_model_checkpoint_paths: \"model-two-variables.ckpt\"\n"
        );
        assert_eq!(CheckpointState::parse(&state.to_text()).unwrap(), state);
    }

    #[test]
    fn test_latest_moves_to_end() {
        let dir = Path::new("/ckpt");
        let a = dir.join("a");
        let b = dir.join("b");
        let state = CheckpointState::new(dir, &a, &[a.clone(), b.clone()]);
        assert_eq!(state.all_model_checkpoint_paths, vec!["b", "a"]);
        assert_eq!(state.model_checkpoint_path, "a");
    }

    #[test]
    fn test_paths_outside_dir_stay_absolute() {
        let state = CheckpointState::new(Path::new("/ckpt"), Path::new("/other/m"), &[]);
        assert_eq!(state.model_checkpoint_path, "/other/m");
        assert_eq!(
            CheckpointState::resolve(Path::new("/ckpt"), &state.model_checkpoint_path),
            PathBuf::from("/other/m")
        );
    }

    #[test]
    fn test_escapes() {
        let mut state = CheckpointState::default();
        state.model_checkpoint_path = "we\"ird\\name".to_string();
        let text = state.to_text();
        assert!(text.starts_with("model_checkpoint_path: \"we\\\"ird\\\\name\""));
        assert_eq!(CheckpointState::parse(&text).unwrap(), state);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CheckpointState::parse("").is_err());
        assert!(CheckpointState::parse("model_checkpoint_path: unquoted").is_err());
        assert!(CheckpointState::parse("model_checkpoint_path: \"a\"\nbogus: \"b\"").is_err());
        assert!(CheckpointState::parse("model_checkpoint_path: \"a\\q\"").is_err());
    }

    #[test]
    fn test_read_write_latest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(latest_checkpoint(dir.path()).unwrap(), None);

        let prefix = dir.path().join("model.ckpt");
        CheckpointState::new(dir.path(), &prefix, &[])
            .write(dir.path())
            .unwrap();
        assert_eq!(latest_checkpoint(dir.path()).unwrap(), Some(prefix));
        let raw = fs::read_to_string(state_path(dir.path())).unwrap();
        assert!(raw.contains("\"model.ckpt\""));
        assert!(!dir.path().join("checkpoint.tmp").exists());
    }
}
