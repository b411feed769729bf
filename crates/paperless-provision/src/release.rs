//! Fetching and unpacking application releases.

use super::*;

/// Base URL of the published release archives
const RELEASES: &str = "https://github.com/paperless-ngx/paperless-ngx/releases/download";

/// File name of the release archive for `version`.
pub fn archive_name(version: &str) -> String { format!("paperless-ngx-v{version}.tar.xz") }

/// Download location of the release archive for `version`.
pub fn archive_url(version: &str) -> String {
  format!("{RELEASES}/v{version}/{}", archive_name(version))
}

/// Download `version` and unpack it over `install_dir`, dropping the
/// archive's top-level directory. Files already in `install_dir` that the
/// release does not ship (documents, data, configuration) are left in place.
pub fn fetch_and_extract(
  ctx: Context<'_>,
  version: &str,
  install_dir: &Path,
) -> Result<(), ProvisionError> {
  fs::create_dir_all(&ctx.paths.build_dir)?;
  fs::create_dir_all(install_dir)?;
  let archive = ctx.paths.build_dir.join(archive_name(version));

  info!("Downloading {}", archive_url(version));
  let extracted = ctx
    .exec
    .run(
      &Invocation::new("wget")
        .args(["-q", "--show-progress", "-O"])
        .arg(archive.to_string_lossy())
        .arg(archive_url(version)),
    )
    .and_then(|()| {
      ctx.exec.run(
        &Invocation::new("tar")
          .arg("-xJf")
          .arg(archive.to_string_lossy())
          .arg("-C")
          .arg(install_dir.to_string_lossy())
          .arg("--strip-components=1"),
      )
    });

  // A failed download can leave a partial file behind.
  if archive.exists() {
    fs::remove_file(&archive)?;
  }
  extracted
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn release_url() {
    assert_eq!(
      archive_url("2.18.1"),
      "https://github.com/paperless-ngx/paperless-ngx/releases/download/v2.18.1/paperless-ngx-v2.18.1.tar.xz"
    );
  }
}
