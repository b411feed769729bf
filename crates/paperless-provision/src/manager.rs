//! Operations on an existing installation.
//!
//! Every operation works from the [`InstallationRecord`] loaded at startup.
//! Service toggles are idempotent because systemd's own verbs are; update and
//! uninstall take an explicit confirmation and do nothing without it.

use super::*;
use crate::{
  config::{confirm_password, validate_release, RuntimeConfiguration},
  installer::{install_requirements, manage_py},
  probe::Prober,
  provisioner::{Provisioner, BACKING_SERVICES},
};

/// The exact answer that confirms a destructive operation.
pub const CONFIRMATION: &str = "yes";

/// Run by `manage.py shell`; reads the credentials from the environment
const RESET_PASSWORD_SCRIPT: &str = "import os\n\
from django.contrib.auth.models import User\n\
user = User.objects.get(username=os.environ['PAPERLESS_ADMIN_USER'])\n\
user.set_password(os.environ['PAPERLESS_ADMIN_PASSWORD'])\n\
user.save()\n";

/// Live state of one service unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
  /// Which unit
  pub unit:    ServiceUnit,
  /// `systemctl is-active` answer
  pub active:  String,
  /// `systemctl is-enabled` answer
  pub enabled: String,
}

/// Result of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// The operator did not confirm; nothing changed.
  Declined,
  /// The new release is in place and this is the rewritten record.
  Updated(InstallationRecord),
}

/// Result of an uninstall request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
  /// The operator did not confirm; nothing changed.
  Declined,
  /// Everything the installer created is gone.
  Removed,
}

/// Runs management operations against one installation.
pub struct Manager<'a> {
  /// Host access
  ctx:    Context<'a>,
  /// The installation being managed
  record: &'a InstallationRecord,
}

impl<'a> Manager<'a> {
  /// Manage the installation described by `record`.
  pub fn new(ctx: &Context<'a>, record: &'a InstallationRecord) -> Self {
    Self { ctx: *ctx, record }
  }

  /// Package and unit control on this host.
  fn provisioner(&self) -> Provisioner<'a> { Provisioner::new(self.ctx) }

  /// Report the active and enabled state of every unit, and the public URL.
  pub fn status(&self) -> Result<Vec<UnitStatus>, ProvisionError> {
    let provisioner = self.provisioner();
    let mut statuses = Vec::with_capacity(ServiceUnit::ALL.len());
    for unit in ServiceUnit::ALL {
      statuses.push(UnitStatus {
        unit,
        active: provisioner.active_state(unit.unit_name())?,
        enabled: provisioner.enabled_state(unit.unit_name())?,
      });
    }

    println!(
      "\n{:<32} {:<12} {}",
      style("UNIT").bold(),
      style("ACTIVE").bold(),
      style("ENABLED").bold()
    );
    for s in &statuses {
      let active =
        if s.active == "active" { style(&s.active).green() } else { style(&s.active).red() };
      let enabled =
        if s.enabled == "enabled" { style(&s.enabled).green() } else { style(&s.enabled).yellow() };
      println!("{:<32} {:<12} {}", s.unit.unit_name(), active, enabled);
    }
    match RuntimeConfiguration::load(&self.record.config_file()) {
      Ok(config) => ui::note(&format!("Web UI: {}", config.url)),
      Err(e) => debug!("No URL to show: {e}"),
    }
    Ok(statuses)
  }

  /// Start all units.
  pub fn start(&self) -> Result<(), ProvisionError> {
    self.provisioner().start_all()?;
    ui::done("Services started");
    Ok(())
  }

  /// Stop all units.
  pub fn stop(&self) -> Result<(), ProvisionError> {
    self.provisioner().stop_all()?;
    ui::done("Services stopped");
    Ok(())
  }

  /// Start all units at boot.
  pub fn enable(&self) -> Result<(), ProvisionError> {
    self.provisioner().enable_all()?;
    ui::done("Autostart enabled");
    Ok(())
  }

  /// Stop starting the units at boot.
  pub fn disable(&self) -> Result<(), ProvisionError> {
    self.provisioner().disable_all()?;
    ui::done("Autostart disabled");
    Ok(())
  }

  /// Set the admin account's password. Both entries must match and be
  /// non-empty, otherwise nothing runs.
  pub fn reset_password(&self, first: &str, second: &str) -> Result<(), ProvisionError> {
    let password = confirm_password(first, second)?;
    self.ctx.exec.run(
      &manage_py(self.record, &["shell", "-c", RESET_PASSWORD_SCRIPT])
        .env("PAPERLESS_ADMIN_USER", &self.record.owning_user)
        .env("PAPERLESS_ADMIN_PASSWORD", password)
        .secret(),
    )?;
    ui::done(&format!("Password for {} changed", self.record.owning_user));
    Ok(())
  }

  /// Move the installation to release `version`.
  ///
  /// `confirmation` must be exactly [`CONFIRMATION`], meaning the operator
  /// has a backup. The existing `paperless.conf` is read first and written
  /// back after the release is unpacked, so its secret key and credentials
  /// survive. Only the version field of the record changes.
  pub fn update(&self, version: &str, confirmation: &str) -> Result<UpdateOutcome, ProvisionError> {
    if confirmation != CONFIRMATION {
      ui::cancelled("Update cancelled; nothing was changed");
      return Ok(UpdateOutcome::Declined);
    }
    let version = version.trim();
    validate_release(version)?;

    let config = RuntimeConfiguration::load(&self.record.config_file())?;
    let updated = self.record.with_version(version);
    let provisioner = self.provisioner();
    info!("Updating from {} to {version}", self.record.application_version);

    provisioner.update_index()?;
    provisioner.upgrade(BACKING_SERVICES)?;
    provisioner.stop_all()?;
    release::fetch_and_extract(self.ctx, version, &updated.install_dir)?;
    config.write(&updated.config_file())?;
    install_requirements(self.ctx, &updated, false)?;
    self.ctx.exec.run(&manage_py(&updated, &["migrate", "--skip-checks"]))?;
    accounts::chown(self.ctx, &updated.owning_user, &updated.install_dir)?;
    updated.save(&self.ctx.paths.record)?;
    provisioner.start_all()?;

    ui::done(&format!("Updated to {version}"));
    Ok(UpdateOutcome::Updated(updated))
  }

  /// Remove everything the installer created, then the record.
  ///
  /// Stopping and disabling units is best effort; they may already be gone.
  /// A missing user with a leftover directory is reported and the directory
  /// is removed directly.
  pub fn cleanup(&self) -> Result<(), ProvisionError> {
    let provisioner = self.provisioner();
    let names = ServiceUnit::names();
    if let Err(e) = provisioner.stop(&names) {
      ui::caution(&format!("Could not stop services: {e}"));
    }
    if let Err(e) = provisioner.disable(&names) {
      ui::caution(&format!("Could not disable services: {e}"));
    }
    units::remove_units(&self.ctx.paths.unit_dir)?;
    provisioner.daemon_reload()?;
    ui::done("Services removed");

    database::drop(self.ctx, &self.record.owning_user, &self.record.database_name)?;
    ui::done("Database removed");

    let dir = &self.record.install_dir;
    if Prober::new(self.ctx).user_exists(&self.record.owning_user)? {
      accounts::remove(self.ctx, &self.record.owning_user)?;
    } else if dir.exists() {
      ui::caution(&format!(
        "User {} does not exist; removing {} directly",
        self.record.owning_user,
        dir.display()
      ));
    }
    if dir.exists() {
      fs::remove_dir_all(dir)?;
    }
    ui::done("User and files removed");

    InstallationRecord::remove(&self.ctx.paths.record)?;
    Ok(())
  }

  /// Tear down the installation so the next run installs afresh.
  pub fn reinstall(&self) -> Result<(), ProvisionError> {
    self.cleanup()?;
    ui::note("Run paperless-setup again to install from scratch");
    Ok(())
  }

  /// Tear down the installation if `confirmation` is exactly
  /// [`CONFIRMATION`].
  pub fn uninstall(&self, confirmation: &str) -> Result<Teardown, ProvisionError> {
    if confirmation != CONFIRMATION {
      ui::cancelled("Uninstall cancelled; nothing was changed");
      return Ok(Teardown::Declined);
    }
    self.cleanup()?;
    ui::done("Paperless-ngx uninstalled");
    Ok(Teardown::Removed)
  }
}
