use assert_cmd::Command;
use predicates::str::contains;

fn cmd() -> Command {
    Command::cargo_bin("phishcmp").unwrap()
}

#[test]
fn no_arguments_prints_usage() {
    cmd().assert().code(1).stderr(contains("Usage"));
}

#[test]
fn one_url_is_not_enough() {
    cmd().arg("https://paypal.com").assert().code(1).stderr(contains("Usage")).stdout("");
}

#[test]
fn three_urls_are_too_many() {
    cmd()
        .args(["https://paypal.com", "https://paypa1.com", "https://example.com"])
        .assert()
        .code(1)
        .stderr(contains("Usage"));
}

#[test]
fn help_lists_options() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("<REAL_URL>"))
        .stdout(contains("--render-timeout"));
}

#[test]
fn out_of_range_threshold_is_rejected() {
    cmd()
        .args(["--threshold", "1.5", "paypal.com", "paypa1.com"])
        .assert()
        .code(1)
        .stderr(contains("scoring.threshold"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .args(["paypal.com", "paypa1.com"])
        .assert()
        .code(1)
        .stderr(contains("absent.json"));
}
