use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::meta_graph;
use crate::state::CheckpointState;
use crate::table::TableOptions;
use crate::variable::Variable;
use crate::writer::{self, BundleWriter};

#[derive(Clone, Debug)]
pub struct SaverOptions {
    /// Number of recent checkpoints to retain; older ones are deleted.
    /// Zero keeps everything.
    pub max_to_keep: usize,
    /// Write `<prefix>.meta` next to the bundle.
    pub write_meta_graph: bool,
    /// Maintain the `checkpoint` state file in the save directory.
    pub write_state: bool,
    pub table: TableOptions,
}

impl Default for SaverOptions {
    fn default() -> Self {
        Self {
            max_to_keep: 5,
            write_meta_graph: true,
            write_state: true,
            table: TableOptions::default(),
        }
    }
}

/// Saves variables to checkpoints and keeps track of the ones it wrote.
#[derive(Debug, Default)]
pub struct Saver {
    options: SaverOptions,
    last_checkpoints: Vec<PathBuf>,
}

impl Saver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SaverOptions) -> Self {
        Self {
            options,
            last_checkpoints: Vec::new(),
        }
    }

    /// Checkpoints written by this saver that are still retained, oldest
    /// first.
    pub fn last_checkpoints(&self) -> &[PathBuf] {
        &self.last_checkpoints
    }

    /// Writes `variables` to the checkpoint at `save_path` and returns the
    /// checkpoint prefix. The parent directory must already exist.
    pub fn save(&mut self, variables: &[&Variable], save_path: impl AsRef<Path>) -> Result<PathBuf> {
        let prefix = save_path.as_ref().to_path_buf();
        let dir = prefix.parent().map(Path::to_path_buf).unwrap_or_default();
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            return Err(Error::MissingDirectory(prefix));
        }
        if variables.is_empty() {
            return Err(Error::NoVariables);
        }
        let mut seen = BTreeSet::new();
        for variable in variables {
            if variable.name().is_empty() {
                return Err(Error::InvalidName(String::new()));
            }
            if !seen.insert(variable.name()) {
                return Err(Error::DuplicateName(variable.name().to_string()));
            }
        }

        let mut bundle = BundleWriter::with_options(&prefix, self.options.table.clone())?;
        for variable in variables {
            bundle.add(variable.name(), variable.tensor())?;
        }
        bundle.finish()?;

        if self.options.write_meta_graph {
            let meta = meta_graph::build(
                variables.iter().map(|v| v.name()),
                self.options.max_to_keep,
            );
            fs::write(writer::meta_path(&prefix), meta_graph::encode(&meta))?;
        }

        self.retain(prefix.clone());
        if self.options.write_state {
            CheckpointState::new(&dir, &prefix, &self.last_checkpoints).write(&dir)?;
        }
        info!(
            prefix = %prefix.display(),
            variables = variables.len(),
            "saved checkpoint"
        );
        Ok(prefix)
    }

    fn retain(&mut self, prefix: PathBuf) {
        self.last_checkpoints.retain(|p| p != &prefix);
        self.last_checkpoints.push(prefix);
        if self.options.max_to_keep == 0 {
            return;
        }
        while self.last_checkpoints.len() > self.options.max_to_keep {
            let oldest = self.last_checkpoints.remove(0);
            delete_checkpoint_files(&oldest);
        }
    }
}

/// Removes every file belonging to the checkpoint at `prefix`. Failures are
/// logged, not returned.
pub fn delete_checkpoint_files(prefix: &Path) {
    let paths = [
        writer::index_path(prefix),
        writer::data_path(prefix, 0, 1),
        writer::meta_path(prefix),
    ];
    for path in &paths {
        match fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "deleted old checkpoint file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete old checkpoint file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CheckpointReader;
    use crate::state::{latest_checkpoint, state_path};

    #[test]
    fn test_save_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut v1 = Variable::zeros::<f32>("v1", &[3]);
        v1.update(|x: f32| x + 1.0).unwrap();
        let v2 = Variable::filled("v2", &[5], -1.0f32);

        let mut saver = Saver::new();
        let prefix = saver.save(&[&v1, &v2], dir.path().join("model.ckpt")).unwrap();

        assert!(dir.path().join("model.ckpt.index").is_file());
        assert!(dir.path().join("model.ckpt.data-00000-of-00001").is_file());
        assert!(dir.path().join("model.ckpt.meta").is_file());
        assert!(state_path(dir.path()).is_file());
        assert_eq!(latest_checkpoint(dir.path()).unwrap(), Some(prefix.clone()));

        let reader = CheckpointReader::open(&prefix).unwrap();
        assert_eq!(reader.variables(), &["v1".to_string(), "v2".to_string()]);
        assert_eq!(
            reader.get_tensor("v1").unwrap().values::<f32>().unwrap(),
            vec![1.0; 3]
        );
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let v = Variable::zeros::<f32>("v", &[1]);
        let result = Saver::new().save(&[&v], dir.path().join("nope").join("model.ckpt"));
        assert!(matches!(result, Err(Error::MissingDirectory(_))));
    }

    #[test]
    fn test_rejects_bad_variable_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt");
        let a = Variable::zeros::<f32>("a", &[1]);
        let unnamed = Variable::zeros::<f32>("", &[1]);
        let mut saver = Saver::new();
        assert!(matches!(saver.save(&[], &path), Err(Error::NoVariables)));
        assert!(matches!(
            saver.save(&[&a, &a], &path),
            Err(Error::DuplicateName(_))
        ));
        assert!(matches!(
            saver.save(&[&unnamed], &path),
            Err(Error::InvalidName(_))
        ));
        assert!(saver.last_checkpoints().is_empty());
    }

    #[test]
    fn test_max_to_keep_deletes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut saver = Saver::with_options(SaverOptions {
            max_to_keep: 2,
            ..SaverOptions::default()
        });
        let mut step = Variable::zeros::<i64>("global_step", &[]);
        for i in 0..3 {
            step.assign(&[i as i64]).unwrap();
            saver
                .save(&[&step], dir.path().join(format!("model.ckpt-{}", i)))
                .unwrap();
        }

        assert!(!dir.path().join("model.ckpt-0.index").exists());
        assert!(!dir.path().join("model.ckpt-0.meta").exists());
        assert!(dir.path().join("model.ckpt-1.index").exists());
        assert!(dir.path().join("model.ckpt-2.index").exists());

        let state = CheckpointState::read(dir.path()).unwrap().unwrap();
        assert_eq!(state.model_checkpoint_path, "model.ckpt-2");
        assert_eq!(
            state.all_model_checkpoint_paths,
            vec!["model.ckpt-1", "model.ckpt-2"]
        );
    }

    #[test]
    fn test_resave_same_path_moves_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let v = Variable::zeros::<u8>("v", &[2]);
        let mut saver = Saver::new();
        let a = saver.save(&[&v], dir.path().join("a")).unwrap();
        let b = saver.save(&[&v], dir.path().join("b")).unwrap();
        saver.save(&[&v], &a).unwrap();
        assert_eq!(saver.last_checkpoints(), &[b, a]);
    }

    #[test]
    fn test_options_can_skip_side_files() {
        let dir = tempfile::tempdir().unwrap();
        let v = Variable::zeros::<f32>("v", &[1]);
        let mut saver = Saver::with_options(SaverOptions {
            write_meta_graph: false,
            write_state: false,
            ..SaverOptions::default()
        });
        let prefix = saver.save(&[&v], dir.path().join("model.ckpt")).unwrap();
        assert!(!writer::meta_path(&prefix).exists());
        assert!(!state_path(dir.path()).exists());
        assert!(CheckpointReader::open(&prefix).unwrap().variables().is_empty());
    }
}
