use std::process::Command;

#[test]
fn help_exits_successfully() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zocalo"));
    cmd.arg("--help");

    // Act
    let output = cmd.output().expect("failed to execute zocalo");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("desktop shell"));
}

#[test]
fn version_exits_successfully() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zocalo"));
    cmd.arg("--version");

    // Act
    let output = cmd.output().expect("failed to execute zocalo");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("zocalo"));
}

#[test]
fn missing_boot_file_exits_with_code_2() {
    // No step.rc lives next to the test binary, so startup must fail
    // before any shell state is created.
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zocalo"));

    let output = cmd.output().expect("failed to execute zocalo");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("step.rc"));
}

#[test]
fn one_shot_bang_without_instance_exits_with_code_1() {
    // Forwarding requires a running instance; without one the process
    // exits without ever becoming a shell.
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zocalo"));
    cmd.arg("!Recycle");

    let output = cmd.output().expect("failed to execute zocalo");

    assert_eq!(output.status.code(), Some(1));
}
