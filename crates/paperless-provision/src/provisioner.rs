//! Thin wrappers over the package manager and the service manager.

use super::*;

/// Packages needed before anything else runs.
pub const BASELINE_PACKAGES: &[&str] =
  &["ca-certificates", "curl", "wget", "gnupg", "xz-utils", "build-essential", "locales"];

/// Runtime dependencies of the application itself.
pub const APPLICATION_PACKAGES: &[&str] = &[
  "python3",
  "python3-pip",
  "python3-dev",
  "python3-venv",
  "default-libmysqlclient-dev",
  "pkg-config",
  "fonts-liberation",
  "gettext",
  "imagemagick",
  "libmagic-dev",
  "libzbar0",
  "poppler-utils",
  "unpaper",
  "pngquant",
  "icc-profiles-free",
  "qpdf",
  "liblept5",
  "libxml2",
  "libpq-dev",
  "zlib1g",
  "tesseract-ocr",
  "libjbig2dec0",
  "mime-support",
];

/// Services the application talks to.
pub const BACKING_SERVICES: &[&str] = &["postgresql", "redis-server"];

/// Runs apt and systemctl.
pub struct Provisioner<'a> {
  /// Host access
  ctx: Context<'a>,
}

impl<'a> Provisioner<'a> {
  /// Provision through `ctx`.
  pub fn new(ctx: Context<'a>) -> Self { Self { ctx } }

  /// `apt-get` that never asks questions.
  fn apt(&self) -> Invocation { Invocation::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive") }

  /// Refresh the package index.
  pub fn update_index(&self) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&self.apt().arg("update"))
  }

  /// Upgrade every installed package.
  pub fn upgrade_all(&self) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&self.apt().args(["-y", "upgrade"]))
  }

  /// Install `packages`; already installed ones are left alone by apt.
  pub fn install<S: AsRef<str>>(&self, packages: &[S]) -> Result<(), ProvisionError> {
    if packages.is_empty() {
      return Ok(());
    }
    debug!("Installing {} packages", packages.len());
    self.ctx.exec.run(
      &self.apt().args(["-y", "install"]).args(packages.iter().map(|p| p.as_ref().to_owned())),
    )
  }

  /// Upgrade `packages` without installing anything new.
  pub fn upgrade<S: AsRef<str>>(&self, packages: &[S]) -> Result<(), ProvisionError> {
    self.ctx.exec.run(
      &self
        .apt()
        .args(["-y", "install", "--only-upgrade"])
        .args(packages.iter().map(|p| p.as_ref().to_owned())),
    )
  }

  /// `systemctl <verb>` over `units`.
  fn systemctl<'s>(&self, verb: &str, units: impl IntoIterator<Item = &'s str>) -> Invocation {
    Invocation::new("systemctl").arg(verb).args(units)
  }

  /// Make systemd pick up changed unit files.
  pub fn daemon_reload(&self) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&Invocation::new("systemctl").arg("daemon-reload"))
  }

  /// Enable `units` at boot.
  pub fn enable(&self, units: &[&str]) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&self.systemctl("enable", units.iter().copied()))
  }

  /// Stop `units` starting at boot.
  pub fn disable(&self, units: &[&str]) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&self.systemctl("disable", units.iter().copied()))
  }

  /// Start `units`; already running ones are left running.
  pub fn start(&self, units: &[&str]) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&self.systemctl("start", units.iter().copied()))
  }

  /// Stop `units`; stopped ones stay stopped.
  pub fn stop(&self, units: &[&str]) -> Result<(), ProvisionError> {
    self.ctx.exec.run(&self.systemctl("stop", units.iter().copied()))
  }

  /// The `is-active` state of `unit`, e.g. `active` or `inactive`.
  pub fn active_state(&self, unit: &str) -> Result<String, ProvisionError> {
    self.query("is-active", unit)
  }

  /// The `is-enabled` state of `unit`, e.g. `enabled` or `disabled`.
  pub fn enabled_state(&self, unit: &str) -> Result<String, ProvisionError> {
    self.query("is-enabled", unit)
  }

  fn query(&self, verb: &str, unit: &str) -> Result<String, ProvisionError> {
    let out = self.ctx.exec.capture(&self.systemctl(verb, [unit]))?;
    let state = out.stdout.trim();
    Ok(if state.is_empty() { "unknown".to_owned() } else { state.to_owned() })
  }

  /// Start the four application units.
  pub fn start_all(&self) -> Result<(), ProvisionError> { self.start(&ServiceUnit::names()) }

  /// Stop the four application units.
  pub fn stop_all(&self) -> Result<(), ProvisionError> { self.stop(&ServiceUnit::names()) }

  /// Enable the four application units.
  pub fn enable_all(&self) -> Result<(), ProvisionError> { self.enable(&ServiceUnit::names()) }

  /// Disable the four application units.
  pub fn disable_all(&self) -> Result<(), ProvisionError> { self.disable(&ServiceUnit::names()) }
}
