//! The system account that owns and runs the installation.

use super::*;

/// Subdirectories of the install directory holding documents and state.
pub const DATA_SUBDIRS: [&str; 3] = ["consume", "media", "data"];

/// Whether a system account called `user` exists.
pub fn exists(ctx: Context<'_>, user: &str) -> Result<bool, ProvisionError> {
  Ok(ctx.exec.capture(&Invocation::new("id").args(["-u", user]))?.success)
}

/// Fail unless no account called `user` exists yet.
pub fn ensure_absent(ctx: Context<'_>, user: &str) -> Result<(), ProvisionError> {
  if exists(ctx, user)? {
    return Err(ProvisionError::InvalidInput {
      field:  "user name",
      reason: format!("system account `{user}` already exists; choose a new name"),
    });
  }
  Ok(())
}

/// Create `user` as a system account without a login shell, homed at
/// `home`, and set its password.
pub fn create(ctx: Context<'_>, user: &str, password: &str, home: &Path) -> Result<(), ProvisionError> {
  ensure_absent(ctx, user)?;
  info!("Creating system user {user}");
  ctx.exec.run(
    &Invocation::new("useradd")
      .args(["--system", "--create-home", "--user-group", "--shell", "/usr/sbin/nologin"])
      .arg("--home-dir")
      .arg(home.to_string_lossy())
      .arg(user),
  )?;
  ctx.exec.run(&Invocation::new("chpasswd").stdin(format!("{user}:{password}\n")).secret())
}

/// Create the data subdirectories below `home`.
pub fn create_data_dirs(home: &Path) -> Result<(), ProvisionError> {
  for sub in DATA_SUBDIRS {
    fs::create_dir_all(home.join(sub))?;
  }
  Ok(())
}

/// Hand `dir` and everything below it to `user`.
pub fn chown(ctx: Context<'_>, user: &str, dir: &Path) -> Result<(), ProvisionError> {
  ctx.exec.run(
    &Invocation::new("chown").arg("-R").arg(format!("{user}:{user}")).arg(dir.to_string_lossy()),
  )
}

/// Delete `user` together with its home directory.
pub fn remove(ctx: Context<'_>, user: &str) -> Result<(), ProvisionError> {
  ctx.exec.run(&Invocation::new("userdel").args(["-r", user]))
}
