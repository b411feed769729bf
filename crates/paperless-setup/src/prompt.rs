//! Operator prompts.
//!
//! On a terminal the questions go through `dialoguer`. When standard input is
//! piped, [`LinePrompt`] reads one answer per line instead, so the installer
//! and the menu can be driven from a script.

use std::{cell::RefCell, io::BufRead};

use console::Term;
use dialoguer::{Input, Password, Select};
use paperless_provision::{dispatcher::Prompt, errors::ProvisionError};

use crate::errors::SetupErrors;

/// Asks the operator on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompt;

/// Turn a terminal failure into the library's prompt error.
fn interaction(e: dialoguer::Error) -> ProvisionError {
  ProvisionError::Interaction(SetupErrors::from(e).to_string())
}

impl Prompt for DialoguerPrompt {
  fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, ProvisionError> {
    let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
    if let Some(default) = default {
      input = input.default(default.to_owned());
    }
    input.interact_text().map(|s| s.trim().to_owned()).map_err(interaction)
  }

  fn password(&self, prompt: &str) -> Result<String, ProvisionError> {
    Password::new().with_prompt(prompt).allow_empty_password(true).interact().map_err(interaction)
  }

  fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize, ProvisionError> {
    Select::new().with_prompt(prompt).items(items).default(default).interact().map_err(interaction)
  }
}

/// Reads answers line by line from a non-interactive source.
///
/// Prompts are echoed to stderr. An empty line takes the default, and a
/// selection is answered with its 1-based position in the list.
pub struct LinePrompt<R> {
  /// Where answers come from
  reader: RefCell<R>,
  /// Where prompts are shown
  term:   Term,
}

impl<R: BufRead> LinePrompt<R> {
  /// Answer prompts from `reader`.
  pub fn new(reader: R) -> Self { Self { reader: RefCell::new(reader), term: Term::stderr() } }

  /// Show `prompt` and return the next line, trimmed.
  fn ask(&self, prompt: &str) -> Result<String, ProvisionError> {
    self.term.write_line(prompt)?;
    let mut line = String::new();
    if self.reader.borrow_mut().read_line(&mut line)? == 0 {
      return Err(ProvisionError::Interaction(format!(
        "standard input closed before `{prompt}` was answered"
      )));
    }
    Ok(line.trim().to_owned())
  }
}

impl<R: BufRead> Prompt for LinePrompt<R> {
  fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, ProvisionError> {
    let answer = match default {
      Some(default) => self.ask(&format!("{prompt} [{default}]:"))?,
      None => self.ask(&format!("{prompt}:"))?,
    };
    Ok(match default {
      Some(default) if answer.is_empty() => default.to_owned(),
      _ => answer,
    })
  }

  fn password(&self, prompt: &str) -> Result<String, ProvisionError> {
    self.ask(&format!("{prompt}:"))
  }

  fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize, ProvisionError> {
    for (i, item) in items.iter().enumerate() {
      self.term.write_line(&format!("  {:>2}) {item}", i + 1))?;
    }
    let answer = self.ask(&format!("{prompt} [{}]:", default + 1))?;
    if answer.is_empty() {
      return Ok(default);
    }
    match answer.parse::<usize>() {
      Ok(n) if (1..=items.len()).contains(&n) => Ok(n - 1),
      _ => Err(ProvisionError::InvalidChoice(answer)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_lines_take_defaults() {
    let prompt = LinePrompt::new("\nalice\n".as_bytes());
    assert_eq!(prompt.input("System user", Some("paperlessngx")).unwrap(), "paperlessngx");
    assert_eq!(prompt.input("System user", Some("paperlessngx")).unwrap(), "alice");
  }

  #[test]
  fn answers_are_trimmed_and_passwords_kept() {
    let prompt = LinePrompt::new("  9 \nno\ns3cret\n".as_bytes());
    assert_eq!(prompt.input("Choice", None).unwrap(), "9");
    assert_eq!(prompt.input("Confirm", None).unwrap(), "no");
    assert_eq!(prompt.password("Password").unwrap(), "s3cret");
  }

  #[test]
  fn selections_are_one_based() {
    let items = ["Europe/Berlin", "UTC", "Other"];
    let prompt = LinePrompt::new("\n2\n4\nUTC\n".as_bytes());
    assert_eq!(prompt.select("Timezone", &items, 0).unwrap(), 0);
    assert_eq!(prompt.select("Timezone", &items, 0).unwrap(), 1);
    assert!(matches!(prompt.select("Timezone", &items, 0), Err(ProvisionError::InvalidChoice(_))));
    assert!(matches!(prompt.select("Timezone", &items, 0), Err(ProvisionError::InvalidChoice(_))));
  }

  #[test]
  fn closed_input_is_an_error() {
    let prompt = LinePrompt::new("".as_bytes());
    assert!(matches!(prompt.input("Choice", None), Err(ProvisionError::Interaction(_))));
  }
}
