//! Entry point logic: first run or management menu.
//!
//! The dispatcher checks privilege, looks for the installation record and
//! either collects first-run answers and installs, or shows the menu and
//! hands the chosen operation to the [`Manager`]. All operator input goes
//! through the [`Prompt`] trait so the flow runs unchanged against scripted
//! answers.

use std::fmt;

use super::*;
use crate::{
  accounts,
  config::{confirm_password, defaults, InstallPlan},
  installer::{InstallSummary, Installer},
  manager::{Manager, Teardown, UpdateOutcome, CONFIRMATION},
  probe::Prober,
};

/// Label of the free-text entry in the timezone menu.
pub const OTHER_TIMEZONE: &str = "Other";

/// Reads answers from the operator.
pub trait Prompt {
  /// A line of text, falling back to `default` on empty input when given.
  fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, ProvisionError>;

  /// A line of text that is not echoed.
  fn password(&self, prompt: &str) -> Result<String, ProvisionError>;

  /// The index of one of `items`, preselecting `default`.
  fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize, ProvisionError>;
}

/// One entry of the management menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
  /// Show unit states
  Status,
  /// Start all units
  Start,
  /// Stop all units
  Stop,
  /// Start units at boot
  EnableAutostart,
  /// Do not start units at boot
  DisableAutostart,
  /// Change the admin password
  ResetPassword,
  /// Move to another release
  Update,
  /// Tear down so the next run installs again
  Reinstall,
  /// Tear down completely
  Uninstall,
  /// Leave without doing anything
  Abort,
}

impl MenuChoice {
  /// Every entry, in menu order.
  pub const ALL: [MenuChoice; 10] = [
    MenuChoice::Status,
    MenuChoice::Start,
    MenuChoice::Stop,
    MenuChoice::EnableAutostart,
    MenuChoice::DisableAutostart,
    MenuChoice::ResetPassword,
    MenuChoice::Update,
    MenuChoice::Reinstall,
    MenuChoice::Uninstall,
    MenuChoice::Abort,
  ];

  /// The number the operator types for this entry.
  pub fn number(self) -> usize {
    Self::ALL.iter().position(|&c| c == self).map_or(0, |i| i + 1)
  }
}

impl fmt::Display for MenuChoice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      MenuChoice::Status => "Show status",
      MenuChoice::Start => "Start services",
      MenuChoice::Stop => "Stop services",
      MenuChoice::EnableAutostart => "Enable autostart",
      MenuChoice::DisableAutostart => "Disable autostart",
      MenuChoice::ResetPassword => "Reset admin password",
      MenuChoice::Update => "Update Paperless-ngx",
      MenuChoice::Reinstall => "Reinstall",
      MenuChoice::Uninstall => "Uninstall",
      MenuChoice::Abort => "Abort",
    })
  }
}

impl FromStr for MenuChoice {
  type Err = ProvisionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.trim()
      .parse::<usize>()
      .ok()
      .and_then(|n| n.checked_sub(1))
      .and_then(|i| Self::ALL.get(i).copied())
      .ok_or_else(|| ProvisionError::InvalidChoice(s.trim().to_owned()))
  }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// A fresh install completed and its record was saved.
  Installed(InstallSummary),
  /// A menu operation ran to completion.
  Done(MenuChoice),
  /// A menu operation was not confirmed and changed nothing.
  Declined(MenuChoice),
  /// The operator chose to abort.
  Aborted,
}

/// Decides between installing and managing, and drives the chosen path.
pub struct Dispatcher<'a> {
  /// Host access
  ctx:        Context<'a>,
  /// Where answers come from
  prompt:     &'a dyn Prompt,
  /// Whether the process runs as root
  privileged: bool,
}

impl<'a> Dispatcher<'a> {
  /// `privileged` says whether the process runs as root.
  pub fn new(ctx: Context<'a>, prompt: &'a dyn Prompt, privileged: bool) -> Self {
    Self { ctx, prompt, privileged }
  }

  /// Run once: install on a fresh host, otherwise one menu operation.
  pub fn run(&self) -> Result<Outcome, ProvisionError> {
    if !self.privileged {
      return Err(ProvisionError::NotRoot);
    }
    match InstallationRecord::load(&self.ctx.paths.record)? {
      None => self.install(),
      Some(record) => self.manage(&record),
    }
  }

  /// Fresh host: ask, validate, install, then persist the record.
  fn install(&self) -> Result<Outcome, ProvisionError> {
    println!("{}", style("No installation found; setting up Paperless-ngx").bold());
    let plan = self.collect_plan()?;
    let summary = Installer::new(self.ctx, &plan).run()?;
    plan.record.save(&self.ctx.paths.record)?;
    summary.print();
    Ok(Outcome::Installed(summary))
  }

  /// Ask the first-run questions. Every answer is validated, and the account
  /// name checked to be free, before returning.
  pub fn collect_plan(&self) -> Result<InstallPlan, ProvisionError> {
    let p = self.prompt;
    let user = p.input("System user", Some(defaults::USER))?;
    let password = confirm_password(
      &p.password("Password (system user, database and admin)")?,
      &p.password("Repeat password")?,
    )?;
    let database = p.input("Database name", Some(defaults::DATABASE))?;
    let install_dir = p.input("Install directory", Some(defaults::INSTALL_DIR))?;
    let version = p.input("Paperless-ngx version", Some(defaults::VERSION))?;
    let timezone = self.ask_timezone()?;
    let ocr = p.input("OCR languages (e.g. deu+eng)", Some(defaults::OCR_LANGUAGES))?;

    let plan =
      InstallPlan::new(&user, &password, &database, &install_dir, &version, &timezone, &ocr)?;
    accounts::ensure_absent(self.ctx, &plan.record.owning_user)?;
    Ok(plan)
  }

  /// Pick a zone from the list, or type one after choosing "Other".
  fn ask_timezone(&self) -> Result<String, ProvisionError> {
    let mut items: Vec<&str> = defaults::TIMEZONES.to_vec();
    items.push(OTHER_TIMEZONE);
    let preselected = items.iter().position(|&z| z == defaults::TIMEZONE).unwrap_or(0);
    let chosen = self.prompt.select("Timezone", &items, preselected)?;
    match items.get(chosen) {
      Some(&OTHER_TIMEZONE) => self.prompt.input("Timezone (e.g. Europe/Paris)", None),
      Some(zone) => Ok((*zone).to_owned()),
      None => Err(ProvisionError::InvalidChoice(chosen.to_string())),
    }
  }

  /// Existing installation: show the menu and run the chosen operation.
  fn manage(&self, record: &InstallationRecord) -> Result<Outcome, ProvisionError> {
    for finding in Prober::new(self.ctx).inconsistencies(record) {
      ui::caution(&format!("Inconsistent installation: {finding}"));
    }

    println!(
      "\n{} {} in {}",
      style("Paperless-ngx").bold(),
      style(&record.application_version).cyan(),
      record.install_dir.display()
    );
    for choice in MenuChoice::ALL {
      println!("  {:>2}) {choice}", choice.number());
    }
    let choice: MenuChoice = self.prompt.input("Choice", None)?.parse()?;
    debug!("Menu choice: {choice:?}");

    let manager = Manager::new(&self.ctx, record);
    match choice {
      MenuChoice::Status => manager.status().map(|_| ())?,
      MenuChoice::Start => manager.start()?,
      MenuChoice::Stop => manager.stop()?,
      MenuChoice::EnableAutostart => manager.enable()?,
      MenuChoice::DisableAutostart => manager.disable()?,
      MenuChoice::ResetPassword => {
        let first = self.prompt.password("New admin password")?;
        let second = self.prompt.password("Repeat password")?;
        manager.reset_password(&first, &second)?;
      },
      MenuChoice::Update => {
        let version = self.prompt.input("Target version", None)?;
        let confirmation = self
          .prompt
          .input(&format!("Type `{CONFIRMATION}` to confirm you have a current backup"), None)?;
        if manager.update(&version, &confirmation)? == UpdateOutcome::Declined {
          return Ok(Outcome::Declined(choice));
        }
      },
      MenuChoice::Reinstall => manager.reinstall()?,
      MenuChoice::Uninstall => {
        let confirmation = self.prompt.input(
          &format!("Type `{CONFIRMATION}` to remove Paperless-ngx and all its documents"),
          None,
        )?;
        if manager.uninstall(&confirmation)? == Teardown::Declined {
          return Ok(Outcome::Declined(choice));
        }
      },
      MenuChoice::Abort => {
        ui::cancelled("Aborted");
        return Ok(Outcome::Aborted);
      },
    }
    Ok(Outcome::Done(choice))
  }
}
