//! Provisioning and lifecycle management for a single-host Paperless-ngx stack.
//!
//! The crate owns the installation state machine: on a fresh host it runs the
//! [`installer::Installer`] end to end and persists an
//! [`record::InstallationRecord`]; on every later invocation the
//! [`dispatcher::Dispatcher`] finds that record and hands one of the
//! [`manager::Manager`] operations the live installation to work on.
//!
//! Every external tool (apt, systemctl, psql, tar, wget, the application's
//! `manage.py`) is reached through the [`command::Executor`] seam, so the whole
//! flow can be driven against a scripted executor in tests.
//!
//! # Example
//! ```rust,no_run
//! use paperless_provision::{
//!   command::SystemExecutor, manager::Manager, paths::SystemPaths, record::InstallationRecord,
//!   Context,
//! };
//!
//! # fn main() -> Result<(), paperless_provision::errors::ProvisionError> {
//! let paths = SystemPaths::default();
//! let ctx = Context::new(&SystemExecutor, &paths);
//! if let Some(record) = InstallationRecord::load(&paths.record)? {
//!   Manager::new(&ctx, &record).status()?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  fs,
  path::{Path, PathBuf},
  str::FromStr,
};

use console::style;
use tracing::{debug, info, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod accounts;
pub mod command;
pub mod compiler;
pub mod config;
pub mod database;
pub mod dispatcher;
pub mod errors;
pub mod installer;
pub mod manager;
pub mod paths;
pub mod probe;
pub mod provisioner;
pub mod record;
pub mod release;
pub mod ui;
pub mod units;
pub mod version;

use command::{Executor, Invocation};
use errors::ProvisionError;
use paths::SystemPaths;
use record::InstallationRecord;
use units::ServiceUnit;
use version::Version;

/// Everything an operation needs to touch the host: the command executor and
/// the filesystem locations it is allowed to write.
///
/// Built once by the entry point and passed by reference to the installer and
/// to every manager operation.
#[derive(Clone, Copy)]
pub struct Context<'a> {
  /// Runs external tools
  pub exec:  &'a dyn Executor,
  /// Host filesystem layout
  pub paths: &'a SystemPaths,
}

impl<'a> Context<'a> {
  /// Bundle an executor and a path layout.
  pub fn new(exec: &'a dyn Executor, paths: &'a SystemPaths) -> Self { Self { exec, paths } }
}
