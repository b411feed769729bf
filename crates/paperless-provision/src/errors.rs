//! Error types for the provisioning library.
//!
//! Errors fall into four groups, mirroring how the tool reacts to them:
//! - precondition failures (bad input, password mismatch, invalid menu choice), reported before any
//!   side effect takes place
//! - external command failures, which abort the current run at the failing step
//! - malformed persisted state
//! - filesystem and pattern errors bubbling up from std and `glob`
//!
//! There is no rollback: an error returned halfway through an install leaves
//! the steps that already ran in place.
//!
//! # Examples
//!
//! ```
//! use paperless_provision::{config::confirm_password, errors::ProvisionError};
//!
//! match confirm_password("hunter2", "hunter3") {
//!   Err(ProvisionError::PasswordMismatch) => println!("try again"),
//!   Err(e) => println!("other error: {e}"),
//!   Ok(_) => unreachable!(),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while provisioning or managing an installation.
#[derive(Error, Debug)]
pub enum ProvisionError {
  /// The process lacks administrative privilege.
  #[error("this tool must be run as root")]
  NotRoot,

  /// An external command ran but exited unsuccessfully.
  ///
  /// The command's own output has already been streamed to the terminal, so
  /// this only names the program and its exit status.
  #[error("`{program}` failed with {status}")]
  CommandFailed {
    /// The program that failed (with arguments, secrets redacted)
    program: String,
    /// Exit status as reported by the OS
    status:  String,
  },

  /// An external command could not be launched at all.
  #[error("failed to launch `{program}`: {source}")]
  Spawn {
    /// The program that could not be started
    program: String,
    /// Underlying OS error
    #[source]
    source:  std::io::Error,
  },

  /// Operator input failed validation.
  #[error("invalid {field}: {reason}")]
  InvalidInput {
    /// Which prompt the value came from
    field:  &'static str,
    /// Why it was rejected
    reason: String,
  },

  /// An empty password was entered.
  #[error("password must not be empty")]
  EmptyPassword,

  /// The password and its confirmation differ.
  #[error("passwords do not match")]
  PasswordMismatch,

  /// The menu selection is not one of the listed options.
  #[error("invalid choice: `{0}`")]
  InvalidChoice(String),

  /// The installation record exists but cannot be trusted.
  #[error("installation record {path} is malformed: {reason}")]
  MalformedRecord {
    /// Location of the record file
    path:   PathBuf,
    /// What is wrong with it
    reason: String,
  },

  /// A file the operation depends on is missing (for example a unit template
  /// from the release archive).
  #[error("required file not found: {0}")]
  MissingFile(PathBuf),

  /// A version string could not be parsed.
  #[error("could not parse version `{0}`")]
  InvalidVersion(String),

  /// Reading operator input failed.
  #[error("prompt failed: {0}")]
  Interaction(String),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A glob pattern was invalid.
  #[error(transparent)]
  Glob(#[from] glob::PatternError),
}
