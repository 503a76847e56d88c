use std::fs;
use std::path::Path;

use rand::prelude::*;

use tf_checkpoint::inspect;
use tf_checkpoint::saver::SaverOptions;
use tf_checkpoint::state;
use tf_checkpoint::table::TableOptions;
use tf_checkpoint::{CheckpointReader, Error, Saver, Variable};

fn save_two_variables(dir: &Path) -> std::path::PathBuf {
    let mut v1 = Variable::zeros::<f32>("v1", &[3]);
    let mut v2 = Variable::zeros::<f32>("v2", &[5]);
    v1.update(|x: f32| x + 1.0).unwrap();
    v2.update(|x: f32| x - 1.0).unwrap();
    Saver::new()
        .save(&[&v1, &v2], dir.join("model-two-variables.ckpt"))
        .unwrap()
}

fn save_three_variables(dir: &Path) -> std::path::PathBuf {
    let mut v1 = Variable::zeros::<f32>("var1", &[5]);
    let mut v2 = Variable::zeros::<f32>("var2", &[5]);
    let mut v3 = Variable::zeros::<f32>("var3", &[5]);
    v1.update(|x: f32| x + 2.0).unwrap();
    v2.update(|x: f32| x - 2.0).unwrap();
    let product = Variable::zip_with(&v1, &v2, |a: f32, b| a * b).unwrap();
    v3.assign(&product).unwrap();
    Saver::new()
        .save(&[&v1, &v2, &v3], dir.join("model-three-variables.ckpt"))
        .unwrap()
}

#[test]
fn simple_checkpoints_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let two = save_two_variables(dir.path());
    let three = save_three_variables(dir.path());

    // Each saver records only its own checkpoints.
    let state = state::CheckpointState::read(dir.path()).unwrap().unwrap();
    assert_eq!(state.model_checkpoint_path, "model-three-variables.ckpt");
    assert_eq!(
        state.all_model_checkpoint_paths,
        vec!["model-three-variables.ckpt"]
    );
    fs::remove_file(state::state_path(dir.path())).unwrap();
    assert_eq!(state::latest_checkpoint(dir.path()).unwrap(), None);

    let reader = CheckpointReader::open(&two).unwrap();
    assert_eq!(
        inspect::format_shape_map(&reader),
        r#"{"v1": [3], "v2": [5]}"#
    );
    assert_eq!(reader.get_tensor("v1").unwrap().values::<f32>().unwrap(), vec![1.0; 3]);
    assert_eq!(reader.get_tensor("v2").unwrap().values::<f32>().unwrap(), vec![-1.0; 5]);

    let reader = CheckpointReader::open(&three).unwrap();
    assert_eq!(reader.variables(), &["var1", "var2", "var3"]);
    let expected = [("var1", 2.0f32), ("var2", -2.0), ("var3", -4.0)];
    for (name, value) in &expected {
        assert_eq!(
            reader.get_tensor(name).unwrap().values::<f32>().unwrap(),
            vec![*value; 5]
        );
    }

    let mut out = Vec::new();
    inspect::print_tensors(&reader, "", true, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "tensor_name:  var1\n[2. 2. 2. 2. 2.]\n\
         tensor_name:  var2\n[-2. -2. -2. -2. -2.]\n\
         tensor_name:  var3\n[-4. -4. -4. -4. -4.]\n"
    );
}

#[test]
fn in_memory_decoding_matches_files() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = save_two_variables(dir.path());
    let index = fs::read(dir.path().join("model-two-variables.ckpt.index")).unwrap();
    let data = fs::read(dir.path().join("model-two-variables.ckpt.data-00000-of-00001")).unwrap();
    let meta = fs::read(dir.path().join("model-two-variables.ckpt.meta")).unwrap();

    let from_files = CheckpointReader::open(&prefix).unwrap();
    let from_bytes = CheckpointReader::from_bytes(&index, vec![data], Some(&meta)).unwrap();
    assert_eq!(from_bytes.variables(), from_files.variables());
    assert_eq!(
        from_bytes.variable_to_shape_map(),
        from_files.variable_to_shape_map()
    );
    assert_eq!(
        from_bytes.get_tensor("v2").unwrap(),
        from_files.get_tensor("v2").unwrap()
    );
}

#[test]
fn random_variables_survive_multi_block_indexes() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let normal = rand_distr::Normal::new(0.0f64, 3.0).unwrap();

    let mut variables = Vec::new();
    for i in 0..200 {
        let rows = rng.gen_range(1..4);
        let cols = rng.gen_range(1..6);
        let values: Vec<f64> = (0..rows * cols).map(|_| normal.sample(&mut rng)).collect();
        let name = format!("layer{}/kernel_{}", i % 7, i);
        variables.push(Variable::from_values(&name, &[rows, cols], &values).unwrap());
    }

    let dir = tempfile::tempdir().unwrap();
    let mut saver = Saver::with_options(SaverOptions {
        table: TableOptions {
            block_size: 512,
            block_restart_interval: 8,
        },
        ..SaverOptions::default()
    });
    let refs: Vec<&Variable> = variables.iter().collect();
    let prefix = saver.save(&refs, dir.path().join("random.ckpt")).unwrap();

    let reader = CheckpointReader::open(&prefix).unwrap();
    assert_eq!(reader.tensor_names().count(), variables.len());
    for variable in &variables {
        let tensor = reader.get_tensor(variable.name()).unwrap();
        assert_eq!(&tensor, variable.tensor());
        assert_eq!(
            reader.variable_to_shape_map()[variable.name()],
            variable.shape().iter().map(|&d| d as i64).collect::<Vec<_>>()
        );
    }
}

#[test]
fn flipped_data_byte_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = save_three_variables(dir.path());
    let data_path = dir.path().join("model-three-variables.ckpt.data-00000-of-00001");
    let mut data = fs::read(&data_path).unwrap();
    // var2 occupies bytes 20..40.
    data[25] ^= 0x40;
    fs::write(&data_path, data).unwrap();

    let reader = CheckpointReader::open(&prefix).unwrap();
    assert!(reader.get_tensor("var1").is_ok());
    assert!(matches!(
        reader.get_tensor("var2"),
        Err(Error::ChecksumMismatch { .. })
    ));
    assert!(reader.get_tensor("var3").is_ok());
}

#[test]
fn missing_checkpoint_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = CheckpointReader::open(dir.path().join("absent.ckpt"));
    assert!(matches!(result, Err(Error::Io(_))));
}
