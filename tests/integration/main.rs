//! Integration tests for Containme

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    /// Command isolated from any user configuration
    fn containme(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("containme");
        cmd.env("CONTAINME_CONFIG", temp.path().join("config.toml"))
            .current_dir(temp.path());
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        containme(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("container-based build orchestrator"));
    }

    #[test]
    fn version_flag_displays() {
        let temp = TempDir::new().unwrap();
        containme(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("containme"));
    }

    #[test]
    fn version_command_displays() {
        let temp = TempDir::new().unwrap();
        containme(&temp)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        containme(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        containme(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[build]"))
            .stdout(predicate::str::contains("default_timeout_secs = 600"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        containme(&temp).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").exists());
    }

    #[test]
    fn invalid_config_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.toml"), "[build]\ndefault_timeout_secs = \"soon\"\n")
            .unwrap();
        containme(&temp)
            .arg("version")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn run_without_spec_fails() {
        let temp = TempDir::new().unwrap();
        containme(&temp)
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build spec not found"));
    }

    #[test]
    fn malformed_spec_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("containme.yaml"),
            "test:\n  override:\n    - [make, test]\n",
        )
        .unwrap();
        containme(&temp)
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse"));
    }

    #[test]
    fn unsupported_profile_reference_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("build.yaml"),
            "environment:\n  profile: profiles/debian\n",
        )
        .unwrap();
        containme(&temp)
            .args(["run", "--file", "build.yaml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("profile resolution strategy"));
    }

    #[test]
    fn missing_profile_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("containme.yaml"),
            "environment:\n  profile: ./profiles/debian\n",
        )
        .unwrap();
        containme(&temp)
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("profile could not be found"));
    }

    #[test]
    fn exec_requires_command() {
        let temp = TempDir::new().unwrap();
        containme(&temp).arg("exec").assert().failure();
    }
}
