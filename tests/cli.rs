use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("reel-feed")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("reel-feed")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reel Feed"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn rejects_unknown_argument() {
    Command::cargo_bin("reel-feed")
        .unwrap()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument"));
}

#[test]
fn lists_built_in_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "feed:\n  scroll_step: 2\n").unwrap();

    Command::cargo_bin("reel-feed")
        .unwrap()
        .env_remove("REEL_FEED_SOURCE__BASE_URL")
        .args(["--list", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("The Legend of Michael Jordan"))
        .stdout(predicate::str::contains("Simone Biles"));
}
