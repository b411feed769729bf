//! Host filesystem locations touched outside the install directory.

use super::*;

/// File name of the installation record, relative to the working directory.
pub const RECORD_FILE: &str = "paperless-ngx.install";

/// Where the tool reads and writes host-level files.
///
/// [`SystemPaths::default`] points at the real system locations;
/// [`SystemPaths::under`] re-roots everything below a directory so the
/// orchestration can be exercised without touching `/etc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
  /// Directory systemd loads unit files from
  pub unit_dir:             PathBuf,
  /// The glibc locale selection file
  pub locale_gen:           PathBuf,
  /// Candidate ImageMagick security policy files
  pub imagemagick_policies: Vec<PathBuf>,
  /// Root of the per-version tesseract data directories
  pub tesseract_share:      PathBuf,
  /// Scratch space for downloads and source builds
  pub build_dir:            PathBuf,
  /// The installation record
  pub record:               PathBuf,
}

impl Default for SystemPaths {
  fn default() -> Self {
    Self {
      unit_dir:             PathBuf::from("/etc/systemd/system"),
      locale_gen:           PathBuf::from("/etc/locale.gen"),
      imagemagick_policies: vec![
        PathBuf::from("/etc/ImageMagick-6/policy.xml"),
        PathBuf::from("/etc/ImageMagick-7/policy.xml"),
      ],
      tesseract_share:      PathBuf::from("/usr/share/tesseract-ocr"),
      build_dir:            std::env::temp_dir().join("paperless-setup"),
      record:               PathBuf::from(RECORD_FILE),
    }
  }
}

impl SystemPaths {
  /// The same layout with every location moved below `root`.
  pub fn under(root: &Path) -> Self {
    Self {
      unit_dir:             root.join("etc/systemd/system"),
      locale_gen:           root.join("etc/locale.gen"),
      imagemagick_policies: vec![
        root.join("etc/ImageMagick-6/policy.xml"),
        root.join("etc/ImageMagick-7/policy.xml"),
      ],
      tesseract_share:      root.join("usr/share/tesseract-ocr"),
      build_dir:            root.join("tmp/paperless-setup"),
      record:               root.join(RECORD_FILE),
    }
  }
}
