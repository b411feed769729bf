//! First-run answers and the application's configuration file.
//!
//! [`InstallPlan`] is what the operator typed on a fresh host, validated in one
//! place before anything touches the system. [`RuntimeConfiguration`] is the
//! fully resolved set of values the application needs; it is rendered into
//! `paperless.conf` and never stored anywhere else. On update it is read back
//! from that file so the secret key and database credentials survive.

use lazy_static::lazy_static;
use rand::{distr::Alphanumeric, Rng};
use regex::Regex;

use super::*;

/// Literal defaults offered at the first-run prompts.
pub mod defaults {
  /// Owning system account
  pub const USER: &str = "paperlessngx";
  /// Database name
  pub const DATABASE: &str = "paperlessngx";
  /// Install directory
  pub const INSTALL_DIR: &str = "/opt/paperlessngx";
  /// Application release
  pub const VERSION: &str = "2.18.1";
  /// OCR languages, plus-separated
  pub const OCR_LANGUAGES: &str = "deu";
  /// Timezone preselected in the menu
  pub const TIMEZONE: &str = "Europe/Berlin";
  /// Zones offered before the free-text "Other" entry
  pub const TIMEZONES: &[&str] = &[
    "Europe/Berlin",
    "Europe/Vienna",
    "Europe/Zurich",
    "Europe/London",
    "America/New_York",
    "America/Los_Angeles",
    "Asia/Tokyo",
    "UTC",
  ];
  /// Port the web server binds to
  pub const PORT: u16 = 8000;
  /// Address the web server binds to
  pub const BIND_ADDR: &str = "0.0.0.0";
  /// Cache connection URL
  pub const REDIS_URL: &str = "redis://localhost:6379";
  /// Database host
  pub const DB_HOST: &str = "localhost";
}

lazy_static! {
  /// Valid Linux account and PostgreSQL identifier
  static ref ACCOUNT_NAME: Regex = Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").unwrap();
  /// `MAJOR.MINOR.PATCH`
  static ref RELEASE: Regex = Regex::new(r"^\d+\.\d+\.\d+$").unwrap();
  /// Tesseract language code such as `deu` or `chi_sim`
  static ref OCR_CODE: Regex = Regex::new(r"^[a-z]{3}(_[a-z]+)?$").unwrap();
}

/// Accounts and databases that belong to the host, never to an installation.
const RESERVED_NAMES: &[&str] = &["root", "postgres", "template0", "template1"];

/// Three-letter tesseract codes and the date-parser locale each maps to.
const DATE_PARSER_LOCALES: &[(&str, &str)] = &[
  ("ara", "ar"),
  ("ces", "cs"),
  ("chi_sim", "zh"),
  ("chi_tra", "zh"),
  ("dan", "da"),
  ("deu", "de"),
  ("ell", "el"),
  ("eng", "en"),
  ("est", "et"),
  ("fin", "fi"),
  ("fra", "fr"),
  ("heb", "he"),
  ("hun", "hu"),
  ("ita", "it"),
  ("jpn", "ja"),
  ("kor", "ko"),
  ("lav", "lv"),
  ("lit", "lt"),
  ("nld", "nl"),
  ("nor", "nb"),
  ("pol", "pl"),
  ("por", "pt"),
  ("ron", "ro"),
  ("rus", "ru"),
  ("slk", "sk"),
  ("slv", "sl"),
  ("spa", "es"),
  ("swe", "sv"),
  ("tur", "tr"),
  ("ukr", "uk"),
];

/// Reject `value` unless it is a valid system account or database name.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ProvisionError> {
  if !ACCOUNT_NAME.is_match(value) {
    return Err(ProvisionError::InvalidInput {
      field,
      reason: format!("`{value}` must be lowercase letters, digits, `_` or `-` (max 32)"),
    });
  }
  if RESERVED_NAMES.contains(&value) {
    return Err(ProvisionError::InvalidInput {
      field,
      reason: format!("`{value}` is reserved by the system"),
    });
  }
  Ok(())
}

/// Reject `value` unless it looks like `MAJOR.MINOR.PATCH`.
pub fn validate_release(value: &str) -> Result<(), ProvisionError> {
  if RELEASE.is_match(value) {
    Ok(())
  } else {
    Err(ProvisionError::InvalidInput {
      field:  "version",
      reason: format!("`{value}` is not of the form MAJOR.MINOR.PATCH"),
    })
  }
}

/// Split a plus-separated list of OCR codes, validating each one.
pub fn parse_ocr_languages(value: &str) -> Result<Vec<String>, ProvisionError> {
  let codes: Vec<String> =
    value.split('+').map(str::trim).filter(|c| !c.is_empty()).map(str::to_owned).collect();
  if codes.is_empty() {
    return Err(ProvisionError::InvalidInput {
      field:  "OCR languages",
      reason: "at least one language code is required".into(),
    });
  }
  if let Some(bad) = codes.iter().find(|c| !OCR_CODE.is_match(c)) {
    return Err(ProvisionError::InvalidInput {
      field:  "OCR languages",
      reason: format!("`{bad}` is not a tesseract language code such as `deu` or `chi_sim`"),
    });
  }
  Ok(codes)
}

/// Accept a password only if it is non-empty and both entries agree.
pub fn confirm_password(first: &str, second: &str) -> Result<String, ProvisionError> {
  if first.is_empty() {
    return Err(ProvisionError::EmptyPassword);
  }
  if first != second {
    return Err(ProvisionError::PasswordMismatch);
  }
  Ok(first.to_owned())
}

/// Map OCR codes to the date parser's locale codes, dropping duplicates and
/// codes without an entry.
pub fn date_parser_languages(codes: &[String]) -> Vec<&'static str> {
  let mut out = Vec::new();
  for code in codes {
    match DATE_PARSER_LOCALES.iter().find(|(ocr, _)| *ocr == code.as_str()) {
      Some((_, locale)) if !out.contains(locale) => out.push(*locale),
      Some(_) => {},
      None => warn!("No date-parser locale known for OCR language `{code}`"),
    }
  }
  out
}

/// A fresh random secret key for the application.
pub fn generate_secret_key() -> String {
  rand::rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect()
}

/// Everything collected from the operator on a fresh host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
  /// What will be persisted once the install succeeds
  pub record:        InstallationRecord,
  /// Shared by the system account, database role and admin account
  pub password:      String,
  /// IANA timezone name
  pub timezone:      String,
  /// Tesseract language codes
  pub ocr_languages: Vec<String>,
}

impl InstallPlan {
  /// Validate raw answers into a plan. Nothing on the host is touched.
  pub fn new(
    user: &str,
    password: &str,
    database: &str,
    install_dir: &str,
    version: &str,
    timezone: &str,
    ocr_languages: &str,
  ) -> Result<Self, ProvisionError> {
    validate_name("user name", user)?;
    validate_name("database name", database)?;
    let install_dir = PathBuf::from(install_dir.trim_end_matches('/'));
    if !install_dir.is_absolute() || install_dir.parent().is_none() {
      return Err(ProvisionError::InvalidInput {
        field:  "install directory",
        reason: format!("`{}` must be an absolute path below /", install_dir.display()),
      });
    }
    validate_release(version)?;
    if password.is_empty() {
      return Err(ProvisionError::EmptyPassword);
    }
    if timezone.trim().is_empty() || timezone.contains(char::is_whitespace) {
      return Err(ProvisionError::InvalidInput {
        field:  "timezone",
        reason: format!("`{timezone}` is not a timezone name"),
      });
    }

    Ok(Self {
      record:        InstallationRecord {
        owning_user: user.to_owned(),
        install_dir,
        database_name: database.to_owned(),
        application_version: version.to_owned(),
      },
      password:      password.to_owned(),
      timezone:      timezone.trim().to_owned(),
      ocr_languages: parse_ocr_languages(ocr_languages)?,
    })
  }
}

/// The resolved values rendered into `paperless.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfiguration {
  /// Django secret key
  pub secret_key:      String,
  /// Cache connection URL
  pub redis_url:       String,
  /// Database host
  pub db_host:         String,
  /// Database name
  pub db_name:         String,
  /// Database role
  pub db_user:         String,
  /// Database role's password
  pub db_password:     String,
  /// Directory watched for new documents
  pub consumption_dir: PathBuf,
  /// Application state directory
  pub data_dir:        PathBuf,
  /// Stored documents
  pub media_dir:       PathBuf,
  /// Tesseract language codes
  pub ocr_languages:   Vec<String>,
  /// IANA timezone name
  pub timezone:        String,
  /// Public URL of the web UI
  pub url:             String,
  /// Tesseract data directory
  pub tessdata:        PathBuf,
  /// Web server bind address
  pub bind_addr:       String,
  /// Web server port
  pub port:            u16,
}

impl RuntimeConfiguration {
  /// Resolve a configuration for a new install.
  pub fn for_plan(plan: &InstallPlan, address: &str, tessdata: PathBuf) -> Self {
    let dir = &plan.record.install_dir;
    Self {
      secret_key: generate_secret_key(),
      redis_url: defaults::REDIS_URL.to_owned(),
      db_host: defaults::DB_HOST.to_owned(),
      db_name: plan.record.database_name.clone(),
      db_user: plan.record.owning_user.clone(),
      db_password: plan.password.clone(),
      consumption_dir: dir.join("consume"),
      data_dir: dir.join("data"),
      media_dir: dir.join("media"),
      ocr_languages: plan.ocr_languages.clone(),
      timezone: plan.timezone.clone(),
      url: format!("http://{address}:{}", defaults::PORT),
      tessdata,
      bind_addr: defaults::BIND_ADDR.to_owned(),
      port: defaults::PORT,
    }
  }

  /// The configuration file's schema: every key, in order, with its value.
  pub fn entries(&self) -> Vec<(&'static str, String)> {
    vec![
      ("PAPERLESS_SECRET_KEY", self.secret_key.clone()),
      ("PAPERLESS_REDIS", self.redis_url.clone()),
      ("PAPERLESS_DBENGINE", "postgresql".to_owned()),
      ("PAPERLESS_DBHOST", self.db_host.clone()),
      ("PAPERLESS_DBNAME", self.db_name.clone()),
      ("PAPERLESS_DBUSER", self.db_user.clone()),
      ("PAPERLESS_DBPASS", self.db_password.clone()),
      ("PAPERLESS_CONSUMPTION_DIR", self.consumption_dir.to_string_lossy().into_owned()),
      ("PAPERLESS_DATA_DIR", self.data_dir.to_string_lossy().into_owned()),
      ("PAPERLESS_MEDIA_ROOT", self.media_dir.to_string_lossy().into_owned()),
      ("PAPERLESS_OCR_LANGUAGE", self.ocr_languages.join("+")),
      ("PAPERLESS_TIME_ZONE", self.timezone.clone()),
      ("PAPERLESS_URL", self.url.clone()),
      ("TESSDATA_PREFIX", self.tessdata.to_string_lossy().into_owned()),
      ("PAPERLESS_BIND_ADDR", self.bind_addr.clone()),
      ("PAPERLESS_PORT", self.port.to_string()),
      ("PAPERLESS_DATE_PARSER_LANGUAGES", date_parser_languages(&self.ocr_languages).join("+")),
    ]
  }

  /// Render the configuration file.
  pub fn render(&self) -> String {
    let mut out = String::from("# Generated by paperless-setup\n");
    for (key, value) in self.entries() {
      out.push_str(&format!("{key}={}\n", dotenv_quote(&value)));
    }
    out
  }

  /// Read a configuration file written by [`RuntimeConfiguration::render`].
  pub fn parse(text: &str) -> Result<Self, ProvisionError> {
    let mut values = std::collections::HashMap::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')) {
      if let Some((key, value)) = line.split_once('=') {
        values.insert(key.trim().to_owned(), dotenv_unquote(value.trim()));
      }
    }
    let get = |key: &'static str| {
      values.get(key).cloned().ok_or_else(|| ProvisionError::InvalidInput {
        field:  "paperless.conf",
        reason: format!("{key} is not set"),
      })
    };
    let port = get("PAPERLESS_PORT")?;

    Ok(Self {
      secret_key:      get("PAPERLESS_SECRET_KEY")?,
      redis_url:       get("PAPERLESS_REDIS")?,
      db_host:         get("PAPERLESS_DBHOST")?,
      db_name:         get("PAPERLESS_DBNAME")?,
      db_user:         get("PAPERLESS_DBUSER")?,
      db_password:     get("PAPERLESS_DBPASS")?,
      consumption_dir: get("PAPERLESS_CONSUMPTION_DIR")?.into(),
      data_dir:        get("PAPERLESS_DATA_DIR")?.into(),
      media_dir:       get("PAPERLESS_MEDIA_ROOT")?.into(),
      ocr_languages:   parse_ocr_languages(&get("PAPERLESS_OCR_LANGUAGE")?)?,
      timezone:        get("PAPERLESS_TIME_ZONE")?,
      url:             get("PAPERLESS_URL")?,
      tessdata:        get("TESSDATA_PREFIX")?.into(),
      bind_addr:       get("PAPERLESS_BIND_ADDR")?,
      port:            port.parse().map_err(|_| ProvisionError::InvalidInput {
        field:  "paperless.conf",
        reason: format!("PAPERLESS_PORT `{port}` is not a port number"),
      })?,
    })
  }

  /// Load the configuration file at `path`.
  pub fn load(path: &Path) -> Result<Self, ProvisionError> {
    if !path.is_file() {
      return Err(ProvisionError::MissingFile(path.to_path_buf()));
    }
    Self::parse(&fs::read_to_string(path)?)
  }

  /// Write the configuration file to `path`, readable by owner and group only.
  pub fn write(&self, path: &Path) -> Result<(), ProvisionError> {
    fs::write(path, self.render())?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(path, fs::Permissions::from_mode(0o640))?;
    }
    debug!("Wrote {}", path.display());
    Ok(())
  }
}

/// Double-quote `value` for `paperless.conf`, escaping backslashes and quotes.
fn dotenv_quote(value: &str) -> String {
  format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Inverse of [`dotenv_quote`].
fn dotenv_unquote(value: &str) -> String {
  match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
    Some(inner) => {
      let mut out = String::with_capacity(inner.len());
      let mut chars = inner.chars();
      while let Some(c) = chars.next() {
        match c {
          '\\' => out.extend(chars.next()),
          c => out.push(c),
        }
      }
      out
    },
    None => value.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn plan() -> InstallPlan {
    InstallPlan::new(
      "paperlessngx",
      "s3cr\"t",
      "paperlessngx",
      "/opt/paperlessngx",
      "2.18.1",
      "Europe/Berlin",
      "deu+eng",
    )
    .unwrap()
  }

  #[test]
  fn renders_every_key() {
    let config = RuntimeConfiguration::for_plan(
      &plan(),
      "192.0.2.10",
      PathBuf::from("/usr/share/tesseract-ocr/5/tessdata"),
    );
    let text = config.render();
    for key in [
      "PAPERLESS_SECRET_KEY",
      "PAPERLESS_REDIS",
      "PAPERLESS_DBENGINE",
      "PAPERLESS_DBHOST",
      "PAPERLESS_DBNAME",
      "PAPERLESS_DBUSER",
      "PAPERLESS_DBPASS",
      "PAPERLESS_CONSUMPTION_DIR",
      "PAPERLESS_DATA_DIR",
      "PAPERLESS_MEDIA_ROOT",
      "PAPERLESS_OCR_LANGUAGE",
      "PAPERLESS_TIME_ZONE",
      "PAPERLESS_URL",
      "TESSDATA_PREFIX",
      "PAPERLESS_BIND_ADDR",
      "PAPERLESS_PORT",
      "PAPERLESS_DATE_PARSER_LANGUAGES",
    ] {
      assert!(text.contains(&format!("\n{key}=")), "missing {key}");
    }
    assert!(text.contains("PAPERLESS_URL=\"http://192.0.2.10:8000\""));
    assert!(text.contains("PAPERLESS_DATE_PARSER_LANGUAGES=\"de+en\""));
    assert!(text.contains("PAPERLESS_CONSUMPTION_DIR=\"/opt/paperlessngx/consume\""));

    assert_eq!(RuntimeConfiguration::parse(&text).unwrap(), config);
  }

  #[test]
  fn secret_keys_are_fresh() {
    let a = generate_secret_key();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(a, generate_secret_key());
  }

  #[test]
  fn language_table() {
    let codes = parse_ocr_languages("deu+eng+deu+xyz").unwrap();
    assert_eq!(date_parser_languages(&codes), vec!["de", "en"]);
    assert!(parse_ocr_languages("de").is_err());
    assert!(parse_ocr_languages("").is_err());
    assert_eq!(parse_ocr_languages("chi_sim").unwrap(), vec!["chi_sim"]);
  }

  #[test]
  fn plan_validation() {
    assert!(matches!(
      InstallPlan::new("Root", "pw", "db", "/opt/x", "2.18.1", "UTC", "deu"),
      Err(ProvisionError::InvalidInput { field: "user name", .. })
    ));
    assert!(matches!(
      InstallPlan::new("root", "pw", "db", "/opt/x", "2.18.1", "UTC", "deu"),
      Err(ProvisionError::InvalidInput { field: "user name", .. })
    ));
    assert!(matches!(
      InstallPlan::new("u", "pw", "postgres", "/opt/x", "2.18.1", "UTC", "deu"),
      Err(ProvisionError::InvalidInput { field: "database name", .. })
    ));
    assert!(matches!(
      InstallPlan::new("u", "pw", "db", "opt/x", "2.18.1", "UTC", "deu"),
      Err(ProvisionError::InvalidInput { field: "install directory", .. })
    ));
    assert!(matches!(
      InstallPlan::new("u", "pw", "db", "/", "2.18.1", "UTC", "deu"),
      Err(ProvisionError::InvalidInput { field: "install directory", .. })
    ));
    assert!(matches!(
      InstallPlan::new("u", "pw", "db", "/opt/x", "latest", "UTC", "deu"),
      Err(ProvisionError::InvalidInput { field: "version", .. })
    ));
    assert!(matches!(
      InstallPlan::new("u", "", "db", "/opt/x", "2.18.1", "UTC", "deu"),
      Err(ProvisionError::EmptyPassword)
    ));
    assert_eq!(plan().record.install_dir, PathBuf::from("/opt/paperlessngx"));
  }

  #[test]
  fn password_confirmation() {
    assert!(matches!(confirm_password("", ""), Err(ProvisionError::EmptyPassword)));
    assert!(matches!(confirm_password("a", "b"), Err(ProvisionError::PasswordMismatch)));
    assert_eq!(confirm_password("a", "a").unwrap(), "a");
  }
}
