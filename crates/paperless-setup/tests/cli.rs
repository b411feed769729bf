//! Integration tests for the paperless-setup binary.
//!
//! Nothing here needs a terminal. The menu tests need root and skip
//! themselves otherwise; the install and menu flows are covered against
//! scripted executors in the library's own tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn paperless_setup() -> Command { Command::cargo_bin("paperless-setup").unwrap() }

/// A working directory holding a record for an installation in `<dir>/opt`.
fn recorded_installation() -> TempDir {
  let dir = tempdir().unwrap();
  std::fs::write(
    dir.path().join("paperless-ngx.install"),
    format!(
      "PAPERLESS_USER=\"paperlessngx\"\nPAPERLESS_DIR=\"{}\"\nPAPERLESS_DB=\"paperlessngx\"\n\
       PAPERLESS_VERSION=\"2.18.1\"\n",
      dir.path().join("opt").display()
    ),
  )
  .unwrap();
  dir
}

#[test]
fn test_help() {
  paperless_setup()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Paperless-ngx"))
    .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version() {
  paperless_setup()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_rejects_unknown_arguments() {
  paperless_setup().arg("--install-dir").arg("/tmp").assert().failure();
}

#[test]
fn test_requires_root() {
  if nix::unistd::geteuid().is_root() {
    return;
  }
  let dir = tempdir().unwrap();

  paperless_setup()
    .current_dir(dir.path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("must be run as root"));

  assert!(!dir.path().join("paperless-ngx.install").exists());
}

#[test]
fn test_menu_abort_from_piped_input() {
  if !nix::unistd::geteuid().is_root() {
    return;
  }
  let dir = recorded_installation();

  paperless_setup()
    .current_dir(dir.path())
    .write_stdin("10\n")
    .assert()
    .success()
    .stdout(predicate::str::contains("Uninstall"));

  assert!(dir.path().join("paperless-ngx.install").exists());
}

#[test]
fn test_declined_uninstall_from_piped_input() {
  if !nix::unistd::geteuid().is_root() {
    return;
  }
  let dir = recorded_installation();

  paperless_setup().current_dir(dir.path()).write_stdin("9\nno\n").assert().success();

  assert!(dir.path().join("paperless-ngx.install").exists());
}

#[test]
fn test_invalid_piped_choice_fails() {
  if !nix::unistd::geteuid().is_root() {
    return;
  }
  let dir = recorded_installation();

  paperless_setup().current_dir(dir.path()).write_stdin("11\n").assert().code(1);
}
