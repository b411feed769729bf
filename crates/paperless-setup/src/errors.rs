//! Error type for the `paperless-setup` binary.
//!
//! Everything the library can fail with arrives as a
//! [`ProvisionError`](paperless_provision::errors::ProvisionError); the binary
//! itself only adds terminal and working-directory failures. Both are wrapped
//! transparently so the operator sees the underlying message.

use thiserror::Error;

/// Errors that end a `paperless-setup` run with exit status 1.
#[derive(Error, Debug)]
pub enum SetupErrors {
  /// Errors from provisioning or managing the installation
  #[error(transparent)]
  Provision(#[from] paperless_provision::errors::ProvisionError),

  /// Errors from operator prompts
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),
}
