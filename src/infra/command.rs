//! # Command Execution Module / 命令执行模块
//!
//! Spawns external tools (`elastic-package`, `docker`, `git`, `curl`, ...),
//! captures their combined output and turns a non-zero exit into an error
//! that carries the step description and the captured output.
//!
//! 派生外部工具（`elastic-package`、`docker`、`git`、`curl` 等），
//! 捕获其合并输出，并将非零退出转换为携带步骤描述和捕获输出的错误。

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::infra::t;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{message}: could not start `{command}`")]
    Spawn {
        message: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}, output: {output}")]
    Failed {
        message: String,
        command: String,
        status: ExitStatus,
        output: String,
    },
}

/// Output of a command that ran to completion, successful or not.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Describes a program invocation: what to run, where, and the failure message.
/// 描述一次程序调用：运行什么、在哪里运行，以及失败时的消息。
#[derive(Debug, Clone)]
pub struct Step {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Message of the error raised when the program fails.
    pub failure_message: String,
}

impl Step {
    pub fn new<I, S>(program: &str, args: I, failure_message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
            failure_message: failure_message.into(),
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The command line as a shell would read it, for logs and errors.
    pub fn command_line(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words).unwrap_or_else(|_| {
            std::iter::once(self.program.clone())
                .chain(self.args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Runs the step and returns its output whatever the exit status.
    pub async fn output(&self) -> Result<CommandOutput, CommandError> {
        let command = self.command_line();
        tracing::debug!(%command, dir = ?self.current_dir, "running");

        let (status, output) = spawn_and_capture(self.to_command()).await;
        let status = status.map_err(|source| CommandError::Spawn {
            message: self.failure_message.clone(),
            command: command.clone(),
            source,
        })?;
        tracing::debug!(%command, %status, "finished");
        Ok(CommandOutput { status, output })
    }

    /// Runs the step and fails unless it exits successfully.
    pub async fn run(&self) -> Result<String, CommandError> {
        let result = self.output().await?;
        if result.success() {
            Ok(result.output)
        } else {
            Err(CommandError::Failed {
                message: self.failure_message.clone(),
                command: self.command_line(),
                status: result.status,
                output: result.output,
            })
        }
    }
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<ExitStatus>, String) {
    let mut child = match cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let Some(stdout) = child.stdout.take() else {
        return (
            Err(std::io::Error::other(t!("command.capture_stdout_failed").to_string())),
            String::new(),
        );
    };
    let Some(stderr) = child.stderr.take() else {
        return (
            Err(std::io::Error::other(t!("command.capture_stderr_failed").to_string())),
            String::new(),
        );
    };

    // Both readers append to the same buffer, line by line.
    // 两个读取任务逐行追加到同一个缓冲区。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(drain_lines(stdout, stdout_output));

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(drain_lines(stderr, stderr_output));

    let status = child.wait().await;

    if let Err(e) = stdout_handle.await {
        tracing::warn!("failed to join stdout task: {e}");
    }
    if let Err(e) = stderr_handle.await {
        tracing::warn!("failed to join stderr task: {e}");
    }

    let captured = output.lock().await.clone();
    (status, captured)
}

/// Appends every line of `reader` to `output`. Invalid UTF-8 is replaced, not dropped.
async fn drain_lines<R>(reader: R, output: Arc<tokio::sync::Mutex<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']);
                let mut output = output.lock().await;
                output.push_str(line);
                output.push('\n');
            }
            Err(e) => {
                tracing::warn!("failed to read child output: {e}");
                break;
            }
        }
    }
}
