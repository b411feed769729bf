//! Building a system dependency from source when the packaged one is too old.
//!
//! Distribution Ghostscript often lags behind what the application's PDF
//! pipeline needs. [`Compiler::ensure`] leaves a sufficient installation alone
//! and otherwise builds the pinned release into `/usr/local`.

use super::*;
use crate::provisioner::Provisioner;

/// A dependency that may need to be built from a source tarball.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePackage {
  /// Human name, for narration
  pub name:           &'static str,
  /// Oldest acceptable installed version
  pub minimum:        &'static str,
  /// Source tarball to build when the installed version is too old
  pub url:            &'static str,
  /// Top-level directory inside the tarball
  pub source_dir:     &'static str,
  /// Packages needed to build it
  pub build_packages: &'static [&'static str],
}

/// Ghostscript as required by the application.
pub const GHOSTSCRIPT: SourcePackage = SourcePackage {
  name:           "Ghostscript",
  minimum:        "10.03.1",
  url:            "https://github.com/ArtifexSoftware/ghostpdl-downloads/releases/download/gs10031/ghostscript-10.03.1.tar.gz",
  source_dir:     "ghostscript-10.03.1",
  build_packages: &["build-essential", "autoconf", "libtool", "pkg-config", "libfontconfig1-dev"],
};

/// What [`Compiler::ensure`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
  /// The installed version was already new enough.
  AlreadySatisfied(Version),
  /// The package was built from source at this version.
  Built(Version),
}

/// Conditionally builds a [`SourcePackage`].
pub struct Compiler<'a> {
  /// Host access
  ctx: Context<'a>,
}

impl<'a> Compiler<'a> {
  /// Build through `ctx`.
  pub fn new(ctx: Context<'a>) -> Self { Self { ctx } }

  /// Make sure Ghostscript is at least [`GHOSTSCRIPT`]`.minimum`.
  pub fn ensure_ghostscript(&self) -> Result<CompileOutcome, ProvisionError> {
    self.ensure(&GHOSTSCRIPT, || probe::Prober::new(self.ctx).ghostscript_version())
  }

  /// Build `package` unless `installed` reports a sufficient version.
  ///
  /// The downloaded archive and the extracted tree are removed whether or not
  /// the build succeeds; a failed build step is still returned as an error.
  pub fn ensure(
    &self,
    package: &SourcePackage,
    installed: impl Fn() -> Option<Version>,
  ) -> Result<CompileOutcome, ProvisionError> {
    let minimum: Version = package.minimum.parse()?;
    match installed() {
      Some(current) if current >= minimum => {
        info!("{} {current} satisfies minimum {minimum}", package.name);
        return Ok(CompileOutcome::AlreadySatisfied(current));
      },
      Some(current) => ui::note(&format!(
        "{} {current} is older than {minimum}; building from source",
        package.name
      )),
      None => ui::note(&format!("{} not found; building {minimum} from source", package.name)),
    }

    Provisioner::new(self.ctx).install(package.build_packages)?;

    let build_dir = &self.ctx.paths.build_dir;
    fs::create_dir_all(build_dir)?;
    let archive = build_dir.join(format!("{}.tar.gz", package.source_dir));
    let source = build_dir.join(package.source_dir);

    let built = self.build(package, &archive, &source);

    for path in [&archive, &source] {
      let removed = if path.is_dir() {
        fs::remove_dir_all(path)
      } else if path.exists() {
        fs::remove_file(path)
      } else {
        Ok(())
      };
      if let Err(e) = removed {
        warn!("Could not remove {}: {e}", path.display());
      }
    }

    built?;
    Ok(CompileOutcome::Built(minimum))
  }

  /// Download to `archive`, then unpack and build it in `source`.
  fn build(
    &self,
    package: &SourcePackage,
    archive: &Path,
    source: &Path,
  ) -> Result<(), ProvisionError> {
    let exec = self.ctx.exec;
    exec.run(
      &Invocation::new("wget").args(["-q", "-O"]).arg(archive.to_string_lossy()).arg(package.url),
    )?;
    if source.exists() {
      debug!("Removing stale source tree {}", source.display());
      fs::remove_dir_all(source)?;
    }
    let parent = source.parent().unwrap_or(source);
    exec.run(
      &Invocation::new("tar")
        .arg("-xzf")
        .arg(archive.to_string_lossy())
        .arg("-C")
        .arg(parent.to_string_lossy()),
    )?;

    let jobs = probe::Prober::new(self.ctx).parallelism();
    exec.run(&Invocation::new(source.join("configure").to_string_lossy()).current_dir(source))?;
    exec.run(&Invocation::new("make").arg(format!("-j{jobs}")).current_dir(source))?;
    exec.run(&Invocation::new("make").arg("install").current_dir(source))?;
    exec.run(&Invocation::new("ldconfig"))
  }
}
