use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp file");
    tmp.write_all(contents.as_bytes()).expect("write temp file");
    tmp
}

/// Room with a bed above the spawn point and the exit below it.
fn build_map() -> NamedTempFile {
    write_temp(
        r#"{
  "layers": [
    { "name": "map" },
    { "name": "boundaries", "objects": [
      { "name": "", "x": 0, "y": 0, "width": 10, "height": 25 },
      { "name": "bed", "x": 40, "y": 20, "width": 20, "height": 10 },
      { "name": "exit", "x": 40, "y": 90, "width": 20, "height": 5 }
    ]},
    { "name": "spawnpoints", "objects": [
      { "name": "player", "x": 50, "y": 50 }
    ]}
  ]
}"#,
    )
}

fn build_dialogue() -> NamedTempFile {
    write_temp(r#"{ "bed": "This is where I sleep." }"#)
}

#[test]
fn cli_prints_layout_summary() {
    let map = build_map();
    let mut cmd = Command::cargo_bin("crt-portfolio").expect("binary exists");
    cmd.arg(map.path()).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded map with 3 colliders (2 triggers)"))
        .stdout(contains(" - bed (dialogue)"))
        .stdout(contains(" - exit (to town)"))
        .stdout(contains("Spawn at (200.00, 200.00)"))
        .stdout(contains("Stage with 4 objects (3 interactive)"))
        .stdout(contains(
            " - scene=main pos=(200.00, 200.00) facing=down anim=idle-down locked=false",
        ));
}

#[test]
fn cli_walks_into_dialogue_then_exits_to_town() {
    let map = build_map();
    let dialogue = build_dialogue();
    let mut cmd = Command::cargo_bin("crt-portfolio").expect("binary exists");
    cmd.arg(map.path())
        .arg("--dialogue")
        .arg(dialogue.path())
        .args(["--walk", "up:30", "--walk", "down:80"])
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Walking up for 30 frames"))
        .stdout(contains("Dialogue opened: bed"))
        .stdout(contains("Dialogue text: This is where I sleep."))
        .stdout(contains("Dialogue closed"))
        .stdout(contains("Entered town scene"))
        .stdout(contains(" - scene=town"));
}

#[test]
fn cli_reads_config_and_stage() {
    let map = build_map();
    let config = write_temp(r#"{ "player_speed": 0 }"#);
    let stage = write_temp(
        r#"<stage>
  <object><name>playButton</name><action>toggle</action><size>0.9 0.35 0</size></object>
  <object><name>table</name><size>4 0.25 2</size></object>
</stage>"#,
    );
    let mut cmd = Command::cargo_bin("crt-portfolio").expect("binary exists");
    cmd.arg(map.path())
        .arg("--config")
        .arg(config.path())
        .arg("--stage")
        .arg(stage.path())
        .args(["--walk", "left:10", "--summary-only"]);
    cmd.assert()
        .success()
        .stdout(contains("Stage with 2 objects (1 interactive)"))
        .stdout(contains(
            " - scene=main pos=(200.00, 200.00) facing=left anim=idle-side locked=false",
        ));
}

#[test]
fn cli_rejects_bad_arguments() {
    let map = build_map();
    Command::cargo_bin("crt-portfolio")
        .expect("binary exists")
        .assert()
        .failure()
        .stderr(contains("Usage: crt-portfolio"));
    Command::cargo_bin("crt-portfolio")
        .expect("binary exists")
        .arg(map.path())
        .args(["--walk", "sideways:3"])
        .assert()
        .failure()
        .stderr(contains("unknown walk direction"));
}
