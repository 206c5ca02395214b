// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// Backend completion seam.
//
// Responsibilities:
// - Define the single-flight backend contract every handler and the queue
//   worker build against.
// - Provide the subprocess-backed implementation used in production: the
//   rendered prompt goes to the child's stdin, the trimmed stdout is the
//   answer.

use crate::openai::ChatCompletionsPayload;
use crate::prompt;
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CompleterError {
    #[error("backend command failed: {0}")]
    CommandFailed(String),
    #[error("backend produced an empty answer")]
    EmptyAnswer,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A backend that turns one request into one finished answer.
///
/// Implementations are not required to tolerate concurrent calls; the
/// dispatch queue worker is the only production caller and it awaits each
/// completion before starting the next.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, payload: &ChatCompletionsPayload) -> Result<String, CompleterError>;
}

/// Runs an external command per request, feeding the rendered prompt on
/// stdin and reading the answer from stdout.
pub struct CommandCompleter {
    program: String,
    args: Vec<String>,
}

impl CommandCompleter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Completer for CommandCompleter {
    async fn complete(&self, payload: &ChatCompletionsPayload) -> Result<String, CompleterError> {
        let rendered = prompt::render(&payload.messages, payload.tools.as_deref());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| CompleterError::Unavailable(err.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(rendered.as_bytes()).await {
                // Reap the child before surfacing the error so a broken
                // pipe does not leak the process.
                let _ = child.kill().await;
                return Err(CompleterError::CommandFailed(err.to_string()));
            }
            // Dropping stdin closes the pipe so the child sees EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| CompleterError::CommandFailed(err.to_string()))?;

        if !output.status.success() {
            return Err(CompleterError::CommandFailed(format!(
                "exit status {}",
                output.status
            )));
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if answer.is_empty() {
            return Err(CompleterError::EmptyAnswer);
        }
        Ok(answer)
    }
}
