use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn version_flag_prints_version() -> anyhow::Result<()> {
    Command::cargo_bin("gh-rate-limit-exporter")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("gh-rate-limit-exporter "));
    Ok(())
}

#[test]
fn missing_credential_file_fails_startup() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    Command::cargo_bin("gh-rate-limit-exporter")?
        .current_dir(dir.path())
        .env_remove("GH_RATE_LIMIT_EXPORTER_CREDENTIALS")
        .args(["--log-level", "warn", "--listen", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials.json"));
    Ok(())
}

#[test]
fn invalid_timeout_fails_startup() -> anyhow::Result<()> {
    Command::cargo_bin("gh-rate-limit-exporter")?
        .env("GITHUB_HTTP_TIMEOUT_SECS", "soon")
        .args(["--log-level", "warn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_HTTP_TIMEOUT_SECS"));
    Ok(())
}

#[test]
fn unusable_user_agent_fails_startup() -> anyhow::Result<()> {
    Command::cargo_bin("gh-rate-limit-exporter")?
        .env("GITHUB_USER_AGENT", "ops-bot\u{1}")
        .args(["--log-level", "warn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_USER_AGENT"));
    Ok(())
}
