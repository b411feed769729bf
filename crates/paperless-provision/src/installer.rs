//! First-run provisioning of a complete installation.
//!
//! [`Installer::run`] walks the eleven steps in order. There is no rollback:
//! the first failing step returns its error and everything before it stays in
//! place.

use super::*;
use crate::{
  accounts,
  compiler::{CompileOutcome, Compiler},
  config::{InstallPlan, RuntimeConfiguration},
  probe::Prober,
  provisioner::{Provisioner, APPLICATION_PACKAGES, BACKING_SERVICES, BASELINE_PACKAGES},
};

/// Steps announced in the progress counter
const TOTAL_STEPS: usize = 11;

/// Locale the database collation depends on.
pub const REQUIRED_LOCALE: &str = "en_US.UTF-8";

/// What the operator needs after a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
  /// Where the web UI answers
  pub url:         String,
  /// Admin account name (the owning user)
  pub admin_user:  String,
  /// Install directory
  pub install_dir: PathBuf,
}

impl InstallSummary {
  /// Print the completion banner with follow-up commands.
  pub fn print(&self) {
    println!(
      "\n{} {}",
      style(ui::SUCCESS).green(),
      style("Paperless-ngx is installed").green().bold()
    );
    println!("  URL:         {}", style(&self.url).cyan());
    println!("  Admin user:  {} (password as entered)", style(&self.admin_user).cyan());
    println!("  Directory:   {}", self.install_dir.display());
    println!("\n  Check the services with:");
    for unit in ServiceUnit::ALL {
      println!("    systemctl status {unit}");
    }
    println!("  Follow the logs with:");
    println!("    journalctl -u {} -f", ServiceUnit::Webserver);
  }
}

/// Runs the first-run steps for one [`InstallPlan`].
pub struct Installer<'a> {
  /// Host access
  ctx:  Context<'a>,
  /// Validated first-run answers
  plan: &'a InstallPlan,
}

impl<'a> Installer<'a> {
  /// Prepare to install `plan` through `ctx`.
  pub fn new(ctx: Context<'a>, plan: &'a InstallPlan) -> Self { Self { ctx, plan } }

  /// The record the plan will persist.
  fn record(&self) -> &InstallationRecord { &self.plan.record }

  /// `manage.py` for the planned install.
  fn manage(&self, args: &[&str]) -> Invocation { manage_py(self.record(), args) }

  /// Provision everything. The record is not saved here; the caller persists
  /// it once this returns `Ok`.
  pub fn run(&self) -> Result<InstallSummary, ProvisionError> {
    let record = self.record();
    let provisioner = Provisioner::new(self.ctx);
    let prober = Prober::new(self.ctx);
    info!(
      "Installing Paperless-ngx {} into {}",
      record.application_version,
      record.install_dir.display()
    );

    ui::step(1, TOTAL_STEPS, "Updating the system and enabling the locale");
    provisioner.update_index()?;
    provisioner.upgrade_all()?;
    provisioner.install(BASELINE_PACKAGES)?;
    self.ensure_locale(&prober)?;
    ui::done("System ready");

    ui::step(2, TOTAL_STEPS, "Installing application dependencies");
    let mut packages: Vec<String> = APPLICATION_PACKAGES.iter().map(|p| (*p).to_owned()).collect();
    packages.extend(self.plan.ocr_languages.iter().map(|code| tesseract_package(code)));
    provisioner.install(&packages)?;
    ui::done("Dependencies installed");

    ui::step(3, TOTAL_STEPS, "Checking Ghostscript");
    match Compiler::new(self.ctx).ensure_ghostscript()? {
      CompileOutcome::AlreadySatisfied(v) => ui::done(&format!("Ghostscript {v} is recent enough")),
      CompileOutcome::Built(v) => ui::done(&format!("Built Ghostscript {v}")),
    }

    ui::step(4, TOTAL_STEPS, "Setting up PostgreSQL and Redis");
    provisioner.install(BACKING_SERVICES)?;
    provisioner.enable(BACKING_SERVICES)?;
    provisioner.start(BACKING_SERVICES)?;
    database::create(self.ctx, &record.owning_user, &self.plan.password, &record.database_name)?;
    ui::done("Database ready");

    ui::step(5, TOTAL_STEPS, "Creating the system user");
    accounts::create(self.ctx, &record.owning_user, &self.plan.password, &record.install_dir)?;
    accounts::create_data_dirs(&record.install_dir)?;
    ui::done(&format!("User {} owns {}", record.owning_user, record.install_dir.display()));

    ui::step(6, TOTAL_STEPS, "Downloading Paperless-ngx");
    release::fetch_and_extract(self.ctx, &record.application_version, &record.install_dir)?;
    ui::done(&format!("Release {} extracted", record.application_version));

    ui::step(7, TOTAL_STEPS, "Writing paperless.conf");
    let config = RuntimeConfiguration::for_plan(
      self.plan,
      &prober.primary_address(),
      prober.tessdata_dir()?,
    );
    config.write(&record.config_file())?;
    ui::done("Configuration written");

    ui::step(8, TOTAL_STEPS, "Creating the Python environment");
    accounts::chown(self.ctx, &record.owning_user, &record.install_dir)?;
    self.install_requirements()?;
    ui::done("Python environment ready");

    ui::step(9, TOTAL_STEPS, "Initializing the database");
    self.ctx.exec.run(&self.manage(&["migrate", "--skip-checks"]))?;
    self.ctx.exec.run(
      &self
        .manage(&["createsuperuser", "--noinput", "--skip-checks"])
        .env("DJANGO_SUPERUSER_USERNAME", &record.owning_user)
        .env("DJANGO_SUPERUSER_EMAIL", format!("{}@localhost", record.owning_user))
        .env("DJANGO_SUPERUSER_PASSWORD", &self.plan.password)
        .secret(),
    )?;
    ui::done("Admin account created");

    ui::step(10, TOTAL_STEPS, "Installing and starting services");
    units::install_units(record, &self.ctx.paths.unit_dir)?;
    provisioner.daemon_reload()?;
    provisioner.enable_all()?;
    provisioner.start_all()?;
    ui::done("Services running");

    ui::step(11, TOTAL_STEPS, "Allowing ImageMagick to handle PDFs");
    relax_imagemagick_policy(&self.ctx.paths.imagemagick_policies)?;
    ui::done("ImageMagick policy updated");

    Ok(InstallSummary {
      url:         config.url,
      admin_user:  record.owning_user.clone(),
      install_dir: record.install_dir.clone(),
    })
  }

  /// Generate the database collation locale unless the host already has it.
  fn ensure_locale(&self, prober: &Prober<'_>) -> Result<(), ProvisionError> {
    if prober.has_locale(REQUIRED_LOCALE)? {
      debug!("{REQUIRED_LOCALE} already generated");
      return Ok(());
    }
    enable_locale(&self.ctx.paths.locale_gen, REQUIRED_LOCALE)?;
    self.ctx.exec.run(&Invocation::new("locale-gen"))?;
    self.ctx.exec.run(&Invocation::new("update-locale").arg(format!("LANG={REQUIRED_LOCALE}")))
  }

  /// Build the virtualenv and install the release's requirements.
  fn install_requirements(&self) -> Result<(), ProvisionError> {
    install_requirements(self.ctx, self.record(), true)
  }
}

/// A `manage.py` call run as the owning user inside the source tree.
pub(crate) fn manage_py(record: &InstallationRecord, args: &[&str]) -> Invocation {
  Invocation::new(record.venv_dir().join("bin/python3").to_string_lossy())
    .arg("manage.py")
    .args(args.iter().copied())
    .current_dir(record.src_dir())
    .run_as(&record.owning_user)
}

/// Create the interpreter environment if asked to, then install the release's
/// requirements and the PostgreSQL driver into it as the owning user.
pub(crate) fn install_requirements(
  ctx: Context<'_>,
  record: &InstallationRecord,
  create_venv: bool,
) -> Result<(), ProvisionError> {
  let venv = record.venv_dir();
  if create_venv {
    ctx.exec.run(
      &Invocation::new("python3")
        .args(["-m", "venv"])
        .arg(venv.to_string_lossy())
        .run_as(&record.owning_user),
    )?;
  }
  let pip = || {
    Invocation::new(venv.join("bin/pip").to_string_lossy())
      .arg("install")
      .arg("--upgrade")
      .current_dir(&record.install_dir)
      .run_as(&record.owning_user)
  };
  ctx.exec.run(&pip().args(["-r", "requirements.txt"]))?;
  ctx.exec.run(&pip().arg("psycopg[c]"))
}

/// The distribution package carrying tesseract data for `code`.
pub fn tesseract_package(code: &str) -> String {
  format!("tesseract-ocr-{}", code.replace('_', "-"))
}

/// Uncomment `locale` in a `locale.gen` file, or append it when absent.
pub fn enable_locale(locale_gen: &Path, locale: &str) -> Result<(), ProvisionError> {
  let entry = format!("{locale} UTF-8");
  let text = fs::read_to_string(locale_gen).unwrap_or_default();
  let mut found = false;
  let mut lines: Vec<String> = text
    .lines()
    .map(|line| {
      let bare = line.trim_start_matches('#').trim();
      if bare == entry {
        found = true;
        entry.clone()
      } else {
        line.to_owned()
      }
    })
    .collect();
  if !found {
    lines.push(entry);
  }
  if let Some(parent) = locale_gen.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(locale_gen, lines.join("\n") + "\n")?;
  info!("Enabled {locale} in {}", locale_gen.display());
  Ok(())
}

/// Let ImageMagick read and write PDFs in every policy file that exists.
pub fn relax_imagemagick_policy(policies: &[PathBuf]) -> Result<(), ProvisionError> {
  let mut touched = 0;
  for path in policies.iter().filter(|p| p.is_file()) {
    let text = fs::read_to_string(path)?;
    let relaxed: Vec<String> = text
      .lines()
      .map(|line| {
        if line.contains("pattern=\"PDF\"") {
          line.replace("rights=\"none\"", "rights=\"read|write\"")
        } else {
          line.to_owned()
        }
      })
      .collect();
    let mut relaxed = relaxed.join("\n");
    if text.ends_with('\n') {
      relaxed.push('\n');
    }
    if relaxed != text {
      fs::write(path, relaxed)?;
      info!("Relaxed PDF policy in {}", path.display());
    }
    touched += 1;
  }
  if touched == 0 {
    ui::caution("No ImageMagick policy file found; PDF thumbnails may fail");
  }
  Ok(())
}
