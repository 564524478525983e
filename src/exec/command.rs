// src/exec/command.rs

//! External command transform step.
//!
//! A category can hand its files to a user-supplied program (a SCSS
//! compiler, a bundler, an HTML minifier). The file is written to the
//! program's stdin and its stdout becomes the new content. `{input}` in the
//! command line is replaced by the source path, for tools that want to read
//! the entry themselves.

use std::fmt;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::SiteflowError;
use crate::transform::{Asset, StepFuture, TransformStep};

#[derive(Clone)]
pub struct CommandStep {
    cmd: String,
}

impl fmt::Debug for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStep").field("cmd", &self.cmd).finish()
    }
}

impl CommandStep {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    /// Command line with `{input}` substituted.
    pub fn command_line(&self, asset: &Asset) -> String {
        self.cmd.replace("{input}", &asset.source.to_string_lossy())
    }
}

impl TransformStep for CommandStep {
    fn name(&self) -> &str {
        "command"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        Box::pin(async move {
            let line = self.command_line(&asset);
            let output = pipe_through(&line, &asset.bytes)
                .await
                .map_err(|e| SiteflowError::transform(&asset.source, format!("{e:#}")))?;
            Ok(Asset {
                bytes: output,
                ..asset
            })
        })
    }
}

/// Run `line` in a shell, feed it `input`, and collect stdout.
async fn pipe_through(line: &str, input: &[u8]) -> anyhow::Result<Vec<u8>> {
    info!(cmd = %line, "running external transform");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{line}'"))?;

    if let Some(mut stdin) = child.stdin.take() {
        let input = input.to_vec();
        // Written from its own task while stdout drains below.
        tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for '{line}'"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for l in stderr.lines() {
        debug!(cmd = %line, "stderr: {}", l);
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        anyhow::bail!("'{line}' exited with code {code}: {}", stderr.trim());
    }
    Ok(output.stdout)
}
