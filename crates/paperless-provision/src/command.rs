//! The seam between orchestration and the external tools it drives.
//!
//! An [`Invocation`] describes one command line: program, arguments,
//! environment, optional stdin payload, working directory, and an optional
//! account to run it as (through `runuser`). An [`Executor`] carries it out.
//! [`SystemExecutor`] spawns real processes; tests substitute a scripted one.
//!
//! Secrets never travel in argv. Commands that carry one pass it on stdin or in
//! the environment and are marked with [`Invocation::secret`], which keeps the
//! payload out of debug logs.

use std::{
  io::Write,
  process::{Command, Stdio},
};

use super::*;

/// A single external command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
  /// Executable name or path
  program:     String,
  /// Arguments after the program
  args:        Vec<String>,
  /// Extra environment variables
  env:         Vec<(String, String)>,
  /// Text fed to standard input
  stdin:       Option<String>,
  /// Working directory
  current_dir: Option<PathBuf>,
  /// Account to run as through `runuser`
  run_as:      Option<String>,
  /// Keep env values and stdin out of the logs
  secret:      bool,
}

impl Invocation {
  /// Start describing a call to `program`.
  pub fn new(program: impl Into<String>) -> Self {
    Self { program: program.into(), ..Self::default() }
  }

  /// Append one argument.
  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  /// Append several arguments.
  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Set an environment variable for the child.
  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  /// Feed `input` to the child's stdin.
  pub fn stdin(mut self, input: impl Into<String>) -> Self {
    self.stdin = Some(input.into());
    self
  }

  /// Run the child in `dir`.
  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.current_dir = Some(dir.into());
    self
  }

  /// Run the child as `user` via `runuser -u <user> --`.
  pub fn run_as(mut self, user: impl Into<String>) -> Self {
    self.run_as = Some(user.into());
    self
  }

  /// Mark the stdin payload and environment values as sensitive.
  pub fn secret(mut self) -> Self {
    self.secret = true;
    self
  }

  /// The program actually spawned (`runuser` when running as another user).
  pub fn program(&self) -> &str {
    if self.run_as.is_some() {
      "runuser"
    } else {
      &self.program
    }
  }

  /// Arguments actually passed to [`Invocation::program`].
  pub fn argv(&self) -> Vec<String> {
    match &self.run_as {
      Some(user) => {
        let mut argv = vec!["-u".to_owned(), user.clone(), "--".to_owned(), self.program.clone()];
        argv.extend(self.args.iter().cloned());
        argv
      },
      None => self.args.clone(),
    }
  }

  /// The full command line as a single string, for logs and errors.
  pub fn line(&self) -> String {
    std::iter::once(self.program().to_owned())
      .chain(self.argv())
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// Environment passed to the child.
  pub fn envs(&self) -> &[(String, String)] { &self.env }

  /// Stdin payload, if any.
  pub fn input(&self) -> Option<&str> { self.stdin.as_deref() }

  /// Working directory, if set.
  pub fn dir(&self) -> Option<&Path> { self.current_dir.as_deref() }

  /// Whether this invocation carries a secret.
  pub fn is_secret(&self) -> bool { self.secret }

  fn describe_env(&self) -> String {
    self
      .env
      .iter()
      .map(|(k, v)| if self.secret { format!("{k}=***") } else { format!("{k}={v}") })
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Result of a command whose output is inspected rather than streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
  /// Whether the command exited with status zero
  pub success: bool,
  /// Everything the command wrote to stdout
  pub stdout:  String,
}

/// Runs external commands on behalf of the orchestration layer.
pub trait Executor {
  /// Run the command with its output going straight to the terminal.
  ///
  /// A non-zero exit is an error: callers propagate it and the run stops at
  /// this step.
  fn run(&self, invocation: &Invocation) -> Result<(), ProvisionError>;

  /// Run the command and collect its stdout.
  ///
  /// A non-zero exit is not an error here; it is reported through
  /// [`Captured::success`] so probes can treat it as an answer. Failing to
  /// launch the program at all is still an error.
  fn capture(&self, invocation: &Invocation) -> Result<Captured, ProvisionError>;
}

/// [`Executor`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
  /// Translate `invocation` into a [`Command`].
  fn command(invocation: &Invocation) -> Command {
    let mut cmd = Command::new(invocation.program());
    cmd.args(invocation.argv());
    cmd.envs(invocation.envs().iter().map(|(k, v)| (k, v)));
    if let Some(dir) = invocation.dir() {
      cmd.current_dir(dir);
    }
    cmd.stdin(if invocation.input().is_some() { Stdio::piped() } else { Stdio::inherit() });
    cmd
  }

  /// The program could not be started.
  fn spawn_error(invocation: &Invocation, source: std::io::Error) -> ProvisionError {
    ProvisionError::Spawn { program: invocation.program().to_owned(), source }
  }

  /// Write the invocation's stdin text, if any, then close the pipe.
  fn feed(child: &mut std::process::Child, invocation: &Invocation) -> Result<(), ProvisionError> {
    if let (Some(input), Some(mut stdin)) = (invocation.input(), child.stdin.take()) {
      stdin.write_all(input.as_bytes())?;
    }
    Ok(())
  }
}

impl Executor for SystemExecutor {
  fn run(&self, invocation: &Invocation) -> Result<(), ProvisionError> {
    debug!("run: {} [{}]", invocation.line(), invocation.describe_env());
    let mut child =
      Self::command(invocation).spawn().map_err(|e| Self::spawn_error(invocation, e))?;
    Self::feed(&mut child, invocation)?;
    let status = child.wait()?;

    if !status.success() {
      return Err(ProvisionError::CommandFailed {
        program: invocation.line(),
        status:  status.to_string(),
      });
    }
    Ok(())
  }

  fn capture(&self, invocation: &Invocation) -> Result<Captured, ProvisionError> {
    debug!("capture: {} [{}]", invocation.line(), invocation.describe_env());
    let mut child = Self::command(invocation)
      .stdout(Stdio::piped())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| Self::spawn_error(invocation, e))?;
    Self::feed(&mut child, invocation)?;
    let output = child.wait_with_output()?;

    Ok(Captured {
      success: output.status.success(),
      stdout:  String::from_utf8_lossy(&output.stdout).into_owned(),
    })
  }
}
