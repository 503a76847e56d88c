use std::process::Command;

use tf_checkpoint::{Saver, Variable};

#[test]
fn inspect_program_prints_all_tensors() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = Variable::filled("v1", &[3], 1.0f32);
    let v2 = Variable::filled("v2", &[5], -1.0f32);
    let prefix = Saver::new()
        .save(&[&v1, &v2], dir.path().join("model-two-variables.ckpt"))
        .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_inspect_checkpoint"))
        .arg(&prefix)
        .arg("--all-tensors")
        .env("TF_CHECKPOINT_LOG", "debug")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "tensor_name:  v1\n[1. 1. 1.]\ntensor_name:  v2\n[-1. -1. -1. -1. -1.]\n"
    );
    // Logs go to stderr only.
    assert!(String::from_utf8_lossy(&output.stderr).contains("opened checkpoint"));
}

#[test]
fn inspect_program_fails_on_missing_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_inspect_checkpoint"))
        .arg(dir.path().join("absent.ckpt"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to inspect"));
}
