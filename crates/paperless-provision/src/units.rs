//! The four application service units and their rendering.
//!
//! Paperless-ngx ships one systemd unit per background process under
//! `scripts/` in its release archive. They assume the application lives in
//! `/opt/paperless` and runs as `paperless`, with executables on `PATH`. Each
//! template is parsed into sections and keys, adjusted for this installation,
//! and rendered into the systemd unit directory:
//!
//! - `User=` and `Group=` become the owning user
//! - any value rooted at the template's `/opt/paperless` is re-rooted at the install directory
//! - a bare executable in `ExecStart=` is resolved inside the interpreter environment

use std::fmt;

use super::*;

/// Install root the shipped templates are written against.
const TEMPLATE_ROOT: &str = "/opt/paperless";

/// One of the fixed set of background services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceUnit {
  /// HTTP front end
  Webserver,
  /// Watches the consumption directory
  Consumer,
  /// Periodic task scheduler
  Scheduler,
  /// Background task worker
  TaskQueue,
}

impl ServiceUnit {
  /// Every unit, in start order.
  pub const ALL: [ServiceUnit; 4] =
    [ServiceUnit::Webserver, ServiceUnit::Consumer, ServiceUnit::Scheduler, ServiceUnit::TaskQueue];

  /// The systemd unit name, e.g. `paperless-webserver.service`.
  pub fn unit_name(self) -> &'static str {
    match self {
      ServiceUnit::Webserver => "paperless-webserver.service",
      ServiceUnit::Consumer => "paperless-consumer.service",
      ServiceUnit::Scheduler => "paperless-scheduler.service",
      ServiceUnit::TaskQueue => "paperless-task-queue.service",
    }
  }

  /// All unit names, in start order.
  pub fn names() -> Vec<&'static str> { Self::ALL.iter().map(|u| u.unit_name()).collect() }
}

impl fmt::Display for ServiceUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.unit_name()) }
}

/// A unit file as ordered sections of ordered `Key=Value` entries.
///
/// Comments and blank lines are not preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFile {
  /// Sections in file order, each with its keys in file order
  sections: Vec<(String, Vec<(String, String)>)>,
}

impl UnitFile {
  /// Parse unit file text.
  pub fn parse(text: &str) -> Self {
    let mut unit = Self::default();
    for line in text.lines() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
        continue;
      }
      if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        unit.sections.push((name.to_owned(), Vec::new()));
      } else if let Some((key, value)) = line.split_once('=') {
        if unit.sections.is_empty() {
          unit.sections.push((String::new(), Vec::new()));
        }
        if let Some((_, entries)) = unit.sections.last_mut() {
          entries.push((key.trim().to_owned(), value.trim().to_owned()));
        }
      }
    }
    unit
  }

  /// First value of `key` in `section`.
  pub fn get(&self, section: &str, key: &str) -> Option<&str> {
    self
      .sections
      .iter()
      .filter(|(name, _)| name == section)
      .flat_map(|(_, entries)| entries.iter())
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  /// Replace every `key` in `section` with a single `key=value`, appending it
  /// (and the section) if absent.
  pub fn set(&mut self, section: &str, key: &str, value: &str) {
    let index = match self.sections.iter().position(|(name, _)| name == section) {
      Some(index) => index,
      None => {
        self.sections.push((section.to_owned(), Vec::new()));
        self.sections.len() - 1
      },
    };
    let entries = &mut self.sections[index].1;
    match entries.iter().position(|(k, _)| k == key) {
      Some(first) => {
        entries[first].1 = value.to_owned();
        let mut i = 0;
        entries.retain(|(k, _)| {
          i += 1;
          i - 1 == first || k != key
        });
      },
      None => entries.push((key.to_owned(), value.to_owned())),
    }
  }

  /// Apply `f` to every value in the file.
  pub fn map_values(&mut self, mut f: impl FnMut(&str, &str) -> Option<String>) {
    for (_, entries) in &mut self.sections {
      for (key, value) in entries.iter_mut() {
        if let Some(new) = f(key, value) {
          *value = new;
        }
      }
    }
  }

  /// Render back to unit file text.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for (name, entries) in &self.sections {
      if !out.is_empty() {
        out.push('\n');
      }
      if !name.is_empty() {
        out.push_str(&format!("[{name}]\n"));
      }
      for (key, value) in entries {
        out.push_str(&format!("{key}={value}\n"));
      }
    }
    out
  }
}

/// How to adapt the shipped templates to one installation.
#[derive(Debug, Clone)]
pub struct UnitRewrite<'a> {
  /// The install directory replacing `/opt/paperless`
  pub install_dir: &'a Path,
  /// Account (and group) the services run as
  pub user:        &'a str,
  /// Directory holding the interpreter environment's executables
  pub bin_dir:     PathBuf,
}

impl<'a> UnitRewrite<'a> {
  /// Rewrite rules for `record`'s installation.
  pub fn for_record(record: &'a InstallationRecord) -> Self {
    Self {
      install_dir: &record.install_dir,
      user:        &record.owning_user,
      bin_dir:     record.venv_dir().join("bin"),
    }
  }

  /// Apply the rules to a parsed template.
  pub fn apply(&self, unit: &mut UnitFile) {
    let root = self.install_dir.to_string_lossy().trim_end_matches('/').to_owned();
    unit.map_values(|_, value| {
      value
        .split_whitespace()
        .any(|word| split_root(word).is_some())
        .then(|| value.split(' ').map(|word| reroot(word, &root)).collect::<Vec<_>>().join(" "))
    });

    if let Some(exec) = unit.get("Service", "ExecStart").map(str::to_owned) {
      let (program, rest) = exec.split_once(' ').unwrap_or((exec.as_str(), ""));
      if !program.starts_with('/') && !program.starts_with('-') && !program.starts_with('@') {
        let resolved = self.bin_dir.join(program).to_string_lossy().into_owned();
        let line = if rest.is_empty() { resolved } else { format!("{resolved} {rest}") };
        unit.set("Service", "ExecStart", &line);
      }
    }

    unit.set("Service", "User", self.user);
    unit.set("Service", "Group", self.user);
  }
}

/// Split `word` around a leading template root, returning the text before the
/// root (an optional `NAME=`, `-` marker or opening quote) and the text after
/// it.
fn split_root(word: &str) -> Option<(&str, &str)> {
  let assign = match word.find('=') {
    Some(i) if !word.starts_with(['/', '"', '\'', '-']) => i + 1,
    _ => 0,
  };
  let rest = &word[assign..];
  let quote_len = rest.len() - rest.trim_start_matches(['"', '\'', '-']).len();
  let (prefix, path) = word.split_at(assign + quote_len);
  let tail = path.strip_prefix(TEMPLATE_ROOT)?;
  let bare = tail.trim_end_matches(['"', '\'']);
  (bare.is_empty() || bare.starts_with('/')).then_some((prefix, tail))
}

/// Swap the template root in `word` for `root`; other words pass through.
fn reroot(word: &str, root: &str) -> String {
  match split_root(word) {
    Some((prefix, tail)) => format!("{prefix}{root}{tail}"),
    None => word.to_owned(),
  }
}

/// Render all four units from the release templates into `unit_dir`.
///
/// Fails with [`ProvisionError::MissingFile`] before writing anything if any
/// template is absent from `<install_dir>/scripts`.
pub fn install_units(record: &InstallationRecord, unit_dir: &Path) -> Result<(), ProvisionError> {
  let scripts = record.install_dir.join("scripts");
  let templates = ServiceUnit::ALL
    .iter()
    .map(|unit| {
      let template = scripts.join(unit.unit_name());
      if template.is_file() {
        Ok((unit, fs::read_to_string(&template)?))
      } else {
        Err(ProvisionError::MissingFile(template))
      }
    })
    .collect::<Result<Vec<_>, ProvisionError>>()?;

  fs::create_dir_all(unit_dir)?;
  let rewrite = UnitRewrite::for_record(record);
  for (unit, text) in templates {
    let mut parsed = UnitFile::parse(&text);
    rewrite.apply(&mut parsed);
    let target = unit_dir.join(unit.unit_name());
    fs::write(&target, parsed.render())?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(&target, fs::Permissions::from_mode(0o644))?;
    }
    debug!("Rendered {}", target.display());
  }
  Ok(())
}

/// Delete the four unit files from `unit_dir`, skipping any already gone.
pub fn remove_units(unit_dir: &Path) -> Result<(), ProvisionError> {
  for unit in ServiceUnit::ALL {
    let path = unit_dir.join(unit.unit_name());
    if path.exists() {
      fs::remove_file(&path)?;
      debug!("Removed {}", path.display());
    }
  }
  Ok(())
}
