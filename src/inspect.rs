//! Human-readable dumps of checkpoint contents.

use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::reader::CheckpointReader;

/// Prints tensors of the checkpoint at `prefix` to `out`.
///
/// With `all_tensors` every tensor is printed. Otherwise an empty
/// `tensor_name` lists names, dtypes and shapes, and a non-empty one prints
/// just that tensor.
pub fn print_tensors_in_checkpoint_file<W: Write>(
    prefix: impl AsRef<Path>,
    tensor_name: &str,
    all_tensors: bool,
    out: &mut W,
) -> Result<()> {
    let reader = CheckpointReader::open(prefix)?;
    print_tensors(&reader, tensor_name, all_tensors, out)
}

pub fn print_tensors<W: Write>(
    reader: &CheckpointReader,
    tensor_name: &str,
    all_tensors: bool,
    out: &mut W,
) -> Result<()> {
    if all_tensors {
        for name in reader.tensor_names() {
            print_tensor(reader, name, out)?;
        }
    } else if tensor_name.is_empty() {
        out.write_all(reader.debug_string().as_bytes())?;
    } else {
        if !reader.has_tensor(tensor_name) {
            return Err(Error::TensorNotFound(tensor_name.to_string()));
        }
        print_tensor(reader, tensor_name, out)?;
    }
    Ok(())
}

fn print_tensor<W: Write>(reader: &CheckpointReader, name: &str, out: &mut W) -> Result<()> {
    let tensor = reader.get_tensor(name)?;
    writeln!(out, "tensor_name:  {}", name)?;
    writeln!(out, "{}", tensor)?;
    Ok(())
}

/// Formats a shape map the way `{"v1": [3], "v2": [5]}` reads.
pub fn format_shape_map(reader: &CheckpointReader) -> String {
    format!("{:?}", reader.variable_to_shape_map())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saver::Saver;
    use crate::variable::Variable;

    fn saved_checkpoint(dir: &Path) -> std::path::PathBuf {
        let v1 = Variable::filled("v1", &[3], 1.0f32);
        let v2 = Variable::filled("v2", &[5], -1.0f32);
        Saver::new()
            .save(&[&v1, &v2], dir.join("model-two-variables.ckpt"))
            .unwrap()
    }

    #[test]
    fn test_all_tensors() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = saved_checkpoint(dir.path());
        let mut out = Vec::new();
        print_tensors_in_checkpoint_file(&prefix, "", true, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "tensor_name:  v1\n[1. 1. 1.]\ntensor_name:  v2\n[-1. -1. -1. -1. -1.]\n"
        );
    }

    #[test]
    fn test_listing_and_single_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = saved_checkpoint(dir.path());
        let reader = CheckpointReader::open(&prefix).unwrap();

        let mut out = Vec::new();
        print_tensors(&reader, "", false, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "v1 (DT_FLOAT) [3]\nv2 (DT_FLOAT) [5]\n"
        );

        let mut out = Vec::new();
        print_tensors(&reader, "v2", false, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "tensor_name:  v2\n[-1. -1. -1. -1. -1.]\n"
        );

        let mut out = Vec::new();
        assert!(matches!(
            print_tensors(&reader, "v3", false, &mut out),
            Err(Error::TensorNotFound(_))
        ));
    }

    #[test]
    fn test_shape_map_format() {
        let dir = tempfile::tempdir().unwrap();
        let reader = CheckpointReader::open(saved_checkpoint(dir.path())).unwrap();
        assert_eq!(format_shape_map(&reader), r#"{"v1": [3], "v2": [5]}"#);
    }
}
