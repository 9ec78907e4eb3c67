use std::path::PathBuf;
use std::process::Command;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("brain-defense-cli-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "brain-defense"])
        .status()
        .expect("failed to invoke cargo check for brain-defense CLI binary");

    assert!(status.success(), "cargo check --bin brain-defense should succeed");
}

#[test]
fn help_lists_every_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_brain-defense"))
        .arg("--help")
        .output()
        .expect("failed to run brain-defense --help");

    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in [
        "solo", "resume", "search", "invite", "join", "chat", "friend", "equip", "profile",
    ] {
        assert!(help.contains(command), "help should mention `{command}`");
    }
}

#[test]
fn fresh_profile_is_shown_offline() {
    let data_dir = scratch_dir("profile");
    let output = Command::new(env!("CARGO_BIN_EXE_brain-defense"))
        .args(["--offline", "--player", "amy_1", "--data-dir"])
        .arg(&data_dir)
        .arg("profile")
        .output()
        .expect("failed to run brain-defense profile");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("player:    AMY_1"));
    assert!(stdout.contains("equipped:  BONECA_AMBALABU"));
    let _ = std::fs::remove_dir_all(&data_dir);
}

#[test]
fn resume_without_an_interrupted_match_fails() {
    let data_dir = scratch_dir("resume");
    let output = Command::new(env!("CARGO_BIN_EXE_brain-defense"))
        .args(["--offline", "--data-dir"])
        .arg(&data_dir)
        .arg("resume")
        .output()
        .expect("failed to run brain-defense resume");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no interrupted match"));
    let _ = std::fs::remove_dir_all(&data_dir);
}
