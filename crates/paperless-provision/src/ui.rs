//! Operator-facing narration.
//!
//! Progress goes to stdout as styled lines; diagnostics go through `tracing`.

use console::Emoji;

use super::*;

/// Marker for a step that started.
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Marker for a step that completed.
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[ok] ");
/// Marker for something the operator should look at.
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
/// Marker for plain information.
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "");
/// Marker for a finished run.
pub static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");
/// Marker for a cancelled operation.
pub static CROSS: Emoji<'_, '_> = Emoji("✖ ", "x ");

/// Announce step `n` of `total`.
pub fn step(n: usize, total: usize, what: &str) {
  info!("step {n}/{total}: {what}");
  println!(
    "\n{} {} {}",
    style(GEAR).cyan(),
    style(format!("[{n}/{total}]")).bold().dim(),
    style(what).cyan().bold()
  );
}

/// Mark the current step as done.
pub fn done(what: &str) { println!("{} {}", style(CHECK).green(), style(what).green()); }

/// Tell the operator about a recoverable problem.
pub fn caution(what: &str) {
  warn!("{what}");
  println!("{} {}", style(WARNING).yellow(), style(what).yellow());
}

/// Plain informational line.
pub fn note(what: &str) { println!("{} {}", style(INFO).blue(), what); }

/// Operation cancelled by the operator.
pub fn cancelled(what: &str) { println!("{} {}", style(CROSS).red(), what); }
