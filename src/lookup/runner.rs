//! Runner Module
//!
//! The pluggable lookup backend and the implementations shipped with the crate.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{bail, Context};
use serde_json::Value;

use crate::event::{kind_of, Event};

// == Runner Trait ==
/// Performs the actual (expensive) lookup for an event.
///
/// The runner always receives the full event, not only the key fields.
pub trait Runner: Send + Sync {
    /// Returns the fields produced for `event`.
    fn run(&self, event: &Event) -> anyhow::Result<Event>;

    /// Key fields used when the configuration names none.
    fn key_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

// == Fn Runner ==
/// Adapts a closure into a [`Runner`].
pub struct FnRunner<F> {
    lookup: F,
    key_fields: Vec<String>,
}

impl<F> FnRunner<F>
where
    F: Fn(&Event) -> anyhow::Result<Event> + Send + Sync,
{
    /// Wraps `lookup`; the runner declares no key fields.
    pub fn new(lookup: F) -> Self {
        Self {
            lookup,
            key_fields: Vec::new(),
        }
    }

    /// Declares the key fields used when the configuration names none.
    pub fn with_key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

impl<F> Runner for FnRunner<F>
where
    F: Fn(&Event) -> anyhow::Result<Event> + Send + Sync,
{
    fn run(&self, event: &Event) -> anyhow::Result<Event> {
        (self.lookup)(event)
    }

    fn key_fields(&self) -> Vec<String> {
        self.key_fields.clone()
    }
}

// == Command Runner ==
/// Runs an external program per lookup.
///
/// The event is written to the program's stdin as JSON; its stdout must be
/// a single JSON object, which becomes the looked-up fields. A non-zero
/// exit status is a failure. The call has no timeout of its own.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    key_fields: Vec<String>,
}

impl CommandRunner {
    /// Creates a runner for `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            key_fields: Vec::new(),
        }
    }

    /// Declares the key fields the program looks up by.
    pub fn with_key_fields(mut self, fields: Vec<String>) -> Self {
        self.key_fields = fields;
        self
    }
}

impl Runner for CommandRunner {
    fn run(&self, event: &Event) -> anyhow::Result<Event> {
        let input = serde_json::to_vec(event).context("failed to encode event")?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", self.program))?;

        // Feed stdin from another thread so a chatty child cannot deadlock us.
        let stdin = child.stdin.take().context("child stdin unavailable")?;
        let writer = thread::spawn(move || {
            let mut stdin = stdin;
            stdin.write_all(&input)
        });

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for '{}'", self.program))?;

        let written = writer.join();

        if !output.status.success() {
            bail!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        match written {
            Ok(result) => {
                result.with_context(|| format!("failed to write to '{}'", self.program))?
            }
            Err(_) => bail!("stdin writer for '{}' panicked", self.program),
        }

        let value: Value = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("'{}' did not print valid JSON", self.program))?;
        match value {
            Value::Object(fields) => Ok(fields),
            other => bail!(
                "'{}' printed {} instead of a JSON object",
                self.program,
                kind_of(&other)
            ),
        }
    }

    fn key_fields(&self) -> Vec<String> {
        self.key_fields.clone()
    }
}
