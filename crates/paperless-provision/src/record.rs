//! The persisted description of an existing installation.
//!
//! The record is a flat file of four `KEY="value"` assignments that a POSIX
//! shell can source directly:
//!
//! ```text
//! PAPERLESS_USER="paperlessngx"
//! PAPERLESS_DIR="/opt/paperlessngx"
//! PAPERLESS_DB="paperlessngx"
//! PAPERLESS_VERSION="2.18.1"
//! ```
//!
//! Its presence is what separates a first run from a management run. It is
//! written once after a successful install, only its version is rewritten by an
//! update, and it is deleted as the last step of a cleanup. The password is
//! not part of it.

use super::*;

/// Owning account
const USER_KEY: &str = "PAPERLESS_USER";
/// Install directory
const DIR_KEY: &str = "PAPERLESS_DIR";
/// Database name
const DB_KEY: &str = "PAPERLESS_DB";
/// Installed release
const VERSION_KEY: &str = "PAPERLESS_VERSION";

/// The four facts needed to manage an installation after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
  /// System account that owns the installation (also the database role)
  pub owning_user:         String,
  /// Absolute path of the install directory, which is also the user's home
  pub install_dir:         PathBuf,
  /// Name of the application's database
  pub database_name:       String,
  /// Installed application release, e.g. `2.18.1`
  pub application_version: String,
}

impl InstallationRecord {
  /// Load the record at `path`.
  ///
  /// Returns `Ok(None)` when no record exists, which means nothing is
  /// installed. A record that exists but lacks a field, or holds an empty one,
  /// is an error rather than a fresh host.
  pub fn load(path: &Path) -> Result<Option<Self>, ProvisionError> {
    if !path.exists() {
      debug!("No installation record at {}", path.display());
      return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Self::parse(&text)
      .map(Some)
      .map_err(|reason| ProvisionError::MalformedRecord { path: path.to_path_buf(), reason })
  }

  /// Parse the `KEY="value"` lines, naming the first missing field on failure.
  fn parse(text: &str) -> Result<Self, String> {
    let (mut user, mut dir, mut db, mut version) = (None, None, None, None);

    for (lineno, line) in text.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let (key, value) =
        line.split_once('=').ok_or_else(|| format!("line {} is not an assignment", lineno + 1))?;
      let value = unquote(value.trim());
      match key.trim() {
        USER_KEY => user = Some(value),
        DIR_KEY => dir = Some(value),
        DB_KEY => db = Some(value),
        VERSION_KEY => version = Some(value),
        other => warn!("Ignoring unknown key `{other}` in installation record"),
      }
    }

    let require = |key: &str, value: Option<String>| match value {
      Some(v) if !v.is_empty() => Ok(v),
      Some(_) => Err(format!("{key} is empty")),
      None => Err(format!("{key} is missing")),
    };

    Ok(Self {
      owning_user:         require(USER_KEY, user)?,
      install_dir:         PathBuf::from(require(DIR_KEY, dir)?),
      database_name:       require(DB_KEY, db)?,
      application_version: require(VERSION_KEY, version)?,
    })
  }

  /// Serialize the record into its on-disk form.
  pub fn render(&self) -> String {
    let dir = self.install_dir.to_string_lossy();
    [
      (USER_KEY, self.owning_user.as_str()),
      (DIR_KEY, dir.as_ref()),
      (DB_KEY, self.database_name.as_str()),
      (VERSION_KEY, self.application_version.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{key}={}\n", quote(value)))
    .collect()
  }

  /// Write the record to `path`, replacing any previous one.
  pub fn save(&self, path: &Path) -> Result<(), ProvisionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("install.tmp");
    fs::write(&staging, self.render())?;
    fs::rename(&staging, path)?;
    info!("Saved installation record to {}", path.display());
    Ok(())
  }

  /// Delete the record at `path` if there is one.
  pub fn remove(path: &Path) -> Result<(), ProvisionError> {
    if path.exists() {
      fs::remove_file(path)?;
      info!("Removed installation record {}", path.display());
    }
    Ok(())
  }

  /// A copy of this record pointing at another application release.
  pub fn with_version(&self, version: impl Into<String>) -> Self {
    Self { application_version: version.into(), ..self.clone() }
  }

  /// The application's source tree inside the install directory.
  pub fn src_dir(&self) -> PathBuf { self.install_dir.join("src") }

  /// The application's isolated interpreter environment.
  pub fn venv_dir(&self) -> PathBuf { self.install_dir.join(".venv") }

  /// The application's configuration file.
  pub fn config_file(&self) -> PathBuf { self.install_dir.join("paperless.conf") }
}

/// Double-quote `value` so a shell sourcing the file reads it back verbatim.
fn quote(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    if matches!(c, '"' | '\\' | '$' | '`') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('"');
  out
}

/// Strip one pair of matching single or double quotes, undoing [`quote`].
fn unquote(value: &str) -> String {
  if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
      match c {
        '\\' => out.extend(chars.next()),
        c => out.push(c),
      }
    }
    out
  } else if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
    inner.to_owned()
  } else {
    value.to_owned()
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  fn sample() -> InstallationRecord {
    InstallationRecord {
      owning_user:         "paperlessngx".into(),
      install_dir:         PathBuf::from("/opt/paperlessngx"),
      database_name:       "paperlessngx".into(),
      application_version: "2.18.1".into(),
    }
  }

  #[test]
  fn renders_shell_assignments() {
    let text = sample().render();
    assert_eq!(
      text,
      "PAPERLESS_USER=\"paperlessngx\"\nPAPERLESS_DIR=\"/opt/paperlessngx\"\nPAPERLESS_DB=\"paperlessngx\"\nPAPERLESS_VERSION=\"2.18.1\"\n"
    );
  }

  #[test]
  fn save_then_load() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join(paths::RECORD_FILE);
    let mut record = sample();
    record.install_dir = PathBuf::from("/srv/odd \"dir\" $HOME");

    record.save(&path)?;
    assert_eq!(InstallationRecord::load(&path)?, Some(record));
    Ok(())
  }

  #[test]
  fn absent_record_means_fresh_host() -> anyhow::Result<()> {
    let dir = tempdir()?;
    assert_eq!(InstallationRecord::load(&dir.path().join("nope"))?, None);
    Ok(())
  }

  #[test]
  fn accepts_unquoted_and_single_quoted_values() {
    let record = InstallationRecord::parse(
      "# written by hand\nPAPERLESS_USER=paperlessngx\nPAPERLESS_DIR='/opt/paperlessngx'\n\
       PAPERLESS_DB=paperlessngx\nPAPERLESS_VERSION=2.18.1\n",
    )
    .unwrap();
    assert_eq!(record, sample());
  }

  #[test]
  fn missing_or_empty_field_is_malformed() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join(paths::RECORD_FILE);

    fs::write(&path, "PAPERLESS_USER=\"a\"\nPAPERLESS_DIR=\"/b\"\nPAPERLESS_DB=\"c\"\n")?;
    let err = InstallationRecord::load(&path).unwrap_err();
    assert!(matches!(err, ProvisionError::MalformedRecord { ref reason, .. } if reason.contains("PAPERLESS_VERSION is missing")));

    fs::write(
      &path,
      "PAPERLESS_USER=\"\"\nPAPERLESS_DIR=\"/b\"\nPAPERLESS_DB=\"c\"\nPAPERLESS_VERSION=\"1.0.0\"\n",
    )?;
    let err = InstallationRecord::load(&path).unwrap_err();
    assert!(matches!(err, ProvisionError::MalformedRecord { ref reason, .. } if reason.contains("PAPERLESS_USER is empty")));
    Ok(())
  }

  #[test]
  fn with_version_touches_only_the_version() {
    let updated = sample().with_version("2.19.0");
    assert_eq!(updated.application_version, "2.19.0");
    assert_eq!(updated.owning_user, sample().owning_user);
    assert_eq!(updated.install_dir, sample().install_dir);
    assert_eq!(updated.database_name, sample().database_name);
  }
}
