use std::process::Command;

// A still agent never reaches anything, so with `--max-steps 6` every episode
// runs six policy steps plus the forced reset step: 7 steps, reward -7.00.
#[test]
fn still_policy_caps_episodes_and_reports_totals() {
    let output = Command::new(env!("CARGO_BIN_EXE_gridvault"))
        .args([
            "vault",
            "--seed",
            "7",
            "--episodes",
            "2",
            "--max-steps",
            "6",
            "--policy",
            "still",
            "-o",
            "world_dim=5",
        ])
        .output()
        .expect("failed to launch the gridvault binary");

    assert!(output.status.success(), "gridvault exited with failure");
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert!(stdout.contains("episode 1: seed "), "missing first episode line:\n{stdout}");
    assert!(stdout.contains("episode 2: seed "), "missing second episode line:\n{stdout}");
    assert!(
        stdout.contains("steps 7 reward -7.00"),
        "unexpected step count or reward:\n{stdout}"
    );
    assert!(
        stdout.contains("ran 2 episode(s), mean reward -7.00"),
        "missing summary line:\n{stdout}"
    );
}

#[test]
fn unknown_games_fail_with_a_diagnostic() {
    let output = Command::new(env!("CARGO_BIN_EXE_gridvault"))
        .args(["no-such-game", "--episodes", "1"])
        .output()
        .expect("failed to launch the gridvault binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr should be utf-8");
    assert!(stderr.contains("no-such-game"), "diagnostic should name the game:\n{stderr}");
}
