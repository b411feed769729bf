//! Read-only inspection of the live host.
//!
//! Probes go through [`Executor::capture`]; a command that runs but exits
//! non-zero is an answer ("no such user"), not an error.

use super::*;

/// Asks the host questions without changing anything.
pub struct Prober<'a> {
  /// Host access
  ctx: Context<'a>,
}

impl<'a> Prober<'a> {
  /// Probe through `ctx`.
  pub fn new(ctx: Context<'a>) -> Self { Self { ctx } }

  /// The installed Ghostscript version, or `None` when `gs` is absent or
  /// prints something unparseable.
  pub fn ghostscript_version(&self) -> Option<Version> {
    let out = self.ctx.exec.capture(&Invocation::new("gs").arg("--version")).ok()?;
    if !out.success {
      return None;
    }
    match out.stdout.trim().parse() {
      Ok(version) => Some(version),
      Err(e) => {
        debug!("Ignoring gs output: {e}");
        None
      },
    }
  }

  /// Major version of the installed tesseract, read from the first line of
  /// `tesseract --version` (e.g. `tesseract 5.3.0` gives `5`).
  pub fn tesseract_major(&self) -> Result<u64, ProvisionError> {
    let out = self.ctx.exec.capture(&Invocation::new("tesseract").arg("--version"))?;
    let first = out.stdout.lines().next().unwrap_or_default();
    first
      .split_whitespace()
      .find_map(|word| word.trim_start_matches('v').parse::<Version>().ok())
      .and_then(|v| v.components().first().copied())
      .ok_or_else(|| ProvisionError::InvalidVersion(first.to_owned()))
  }

  /// The tesseract data directory matching the installed major version.
  ///
  /// Falls back to the first `<share>/*/tessdata` present, and finally to the
  /// versioned path even if it does not exist yet.
  pub fn tessdata_dir(&self) -> Result<PathBuf, ProvisionError> {
    let major = self.tesseract_major()?;
    let share = &self.ctx.paths.tesseract_share;
    let versioned = share.join(major.to_string()).join("tessdata");
    if versioned.is_dir() {
      return Ok(versioned);
    }

    let pattern = share.join("*").join("tessdata");
    let found = glob::glob(&pattern.to_string_lossy())?.filter_map(Result::ok).find(|p| p.is_dir());
    match found {
      Some(dir) => {
        info!("Using tessdata at {} (no {})", dir.display(), versioned.display());
        Ok(dir)
      },
      None => {
        ui::caution(&format!("No tessdata directory found; assuming {}", versioned.display()));
        Ok(versioned)
      },
    }
  }

  /// The host's first configured address, used for the public URL.
  pub fn primary_address(&self) -> String {
    self
      .ctx
      .exec
      .capture(&Invocation::new("hostname").arg("-I"))
      .ok()
      .filter(|out| out.success)
      .and_then(|out| out.stdout.split_whitespace().next().map(str::to_owned))
      .unwrap_or_else(|| "localhost".to_owned())
  }

  /// Whether `locale -a` lists `name` (compared the way glibc normalizes it,
  /// so `en_US.UTF-8` matches `en_US.utf8`).
  pub fn has_locale(&self, name: &str) -> Result<bool, ProvisionError> {
    let normalize = |s: &str| s.to_lowercase().replace(['-', '.'], "");
    let wanted = normalize(name);
    let out = self.ctx.exec.capture(&Invocation::new("locale").arg("-a"))?;
    Ok(out.stdout.lines().any(|line| normalize(line.trim()) == wanted))
  }

  /// Whether a system account called `user` exists.
  pub fn user_exists(&self, user: &str) -> Result<bool, ProvisionError> {
    accounts::exists(self.ctx, user)
  }

  /// Whether a database called `name` exists.
  pub fn database_exists(&self, name: &str) -> Result<bool, ProvisionError> {
    database::exists(self.ctx, name)
  }

  /// Whether a database role called `role` exists.
  pub fn role_exists(&self, role: &str) -> Result<bool, ProvisionError> {
    database::role_exists(self.ctx, role)
  }

  /// Parallel jobs to use for source builds.
  pub fn parallelism(&self) -> usize {
    std::thread::available_parallelism().map(usize::from).unwrap_or(1)
  }

  /// Everything about `record` that does not match the live host.
  pub fn inconsistencies(&self, record: &InstallationRecord) -> Vec<String> {
    let mut found = Vec::new();
    match self.user_exists(&record.owning_user) {
      Ok(true) => {},
      Ok(false) => found.push(format!("system user `{}` does not exist", record.owning_user)),
      Err(e) => found.push(format!("could not check user `{}`: {e}", record.owning_user)),
    }
    if !record.install_dir.is_dir() {
      found.push(format!("install directory {} does not exist", record.install_dir.display()));
    }
    match self.database_exists(&record.database_name) {
      Ok(true) => {},
      Ok(false) => found.push(format!("database `{}` does not exist", record.database_name)),
      Err(e) => found.push(format!("could not check database `{}`: {e}", record.database_name)),
    }
    match self.role_exists(&record.owning_user) {
      Ok(true) => {},
      Ok(false) => found.push(format!("database role `{}` does not exist", record.owning_user)),
      Err(e) => found.push(format!("could not check role `{}`: {e}", record.owning_user)),
    }
    found
  }
}
