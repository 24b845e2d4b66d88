use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("review-notes").unwrap();
    cmd.arg("--config")
        .arg(dir.join("config.yaml"))
        .arg("--db")
        .arg(dir.join("comments.db"))
        .env("REVIEW_NOTES_REVIEW__AUTHOR", "Tester");
    cmd
}

fn added_id(stdout: &[u8]) -> String {
    let text = String::from_utf8(stdout.to_vec()).unwrap();
    let start = text.rfind('(').unwrap() + 1;
    let end = text.rfind(')').unwrap();
    text[start..end].to_string()
}

#[test]
fn add_list_reply_and_delete() {
    let dir = tempdir().unwrap();

    cmd(dir.path())
        .args(["add", "00:05", "hello", "--author", "Bob"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Added #1 at 00:05"));

    let out = cmd(dir.path())
        .args(["add", "2", "internal note", "--author", "Amy"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Added #1 at 00:02"))
        .get_output()
        .stdout
        .clone();
    let note = added_id(&out);

    cmd(dir.path())
        .args(["add", "general", "overall fine"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Added • at General"));

    cmd(dir.path())
        .args(["reply", &note, "on it"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Replied to {note}")));

    cmd(dir.path())
        .args(["list", "--filter", "internal"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("All comments 3 · Public 2 · Internal 1")
                .and(predicate::str::contains("internal note"))
                .and(predicate::str::contains("↳ Tester: on it"))
                .and(predicate::str::contains("hello").not()),
        );

    cmd(dir.path())
        .args(["list", "--search", "BOB"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#2").and(predicate::str::contains("hello")));

    cmd(dir.path())
        .args(["delete", &note])
        .assert()
        .success()
        .stdout("Deleted 2 comments.\n");

    cmd(dir.path())
        .arg("counts")
        .assert()
        .success()
        .stdout("All comments 2 · Public 2 · Internal 0\n");
}

#[test]
fn export_csv_to_stdout() {
    let dir = tempdir().unwrap();
    cmd(dir.path())
        .args(["add", "1:00", "tighten the cut"])
        .assert()
        .success();

    cmd(dir.path())
        .args(["export", "--format", "csv"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with(
                "number,timecode,author,created_at,text,attachments,has_drawing,reply_to\n",
            )
            .and(predicate::str::contains("#1,01:00,Tester,")),
        );
}

#[test]
fn unknown_parent_is_an_error() {
    let dir = tempdir().unwrap();
    cmd(dir.path())
        .args(["reply", "missing", "hello?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comment missing not found"));
}

#[test]
fn bad_timecode_is_an_error() {
    let dir = tempdir().unwrap();
    cmd(dir.path())
        .args(["add", "1:99", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is out of range"));
}

#[test]
fn author_is_saved_to_config() {
    let dir = tempdir().unwrap();
    cmd(dir.path())
        .args(["author", "Dana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default author saved"));

    let saved = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(saved.contains("author: Dana"));
}
