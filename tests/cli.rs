use assert_cmd::Command;
use predicates::prelude::*;

fn lingofeed() -> Command {
    Command::cargo_bin("lingofeed").expect("binary built")
}

#[test]
fn prints_version() {
    lingofeed()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    lingofeed()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lingofeed"))
        .stdout(predicate::str::contains("--login EMAIL PASSWORD"))
        .stdout(predicate::str::contains("--dictionary"));
}

#[test]
fn rejects_unknown_flags() {
    lingofeed()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument: --bogus"));
}

#[test]
fn login_needs_both_credentials() {
    lingofeed()
        .args(["--login", "someone@example.com"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--login needs EMAIL and PASSWORD"));
}

#[test]
fn demo_prints_sample_cards_with_subtitles() {
    let home = tempfile::tempdir().expect("temp home");
    lingofeed()
        .args(["--demo", "3"])
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Feed for guest"))
        .stdout(predicate::str::contains(">  1."))
        .stdout(predicate::str::contains("EN: Good morning, how are you today?"))
        .stdout(predicate::str::contains("  3."));
}
