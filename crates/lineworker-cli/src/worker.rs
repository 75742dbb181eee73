use crate::config::CommandSpec;
use anyhow::anyhow;
use lineworker::{BoxError, Line, LineEnding, Worker};
use std::process::Stdio;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt, Stdout},
    process::Command,
    sync::Mutex,
};

/// Runs a command once per line, passing the line as the final argument.
///
/// The child inherits stdout and stderr. A non-zero exit status fails the
/// line.
#[derive(Debug)]
pub struct CommandWorker {
    command: CommandSpec,
}

impl CommandWorker {
    pub const fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

impl Worker<Line> for CommandWorker {
    #[tracing::instrument(level = "debug", skip_all, fields(line = line.number()))]
    async fn process(&self, line: Line) -> Result<(), BoxError> {
        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(line.to_string_lossy().as_ref())
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| anyhow!("failed to spawn `{}`: {e}", self.command.program))?;

        if !status.success() {
            return Err(anyhow!(
                "`{}` exited with {status} on line {}",
                self.command.program,
                line.number()
            )
            .into());
        }

        tracing::trace!("Line {} done", line.number());
        Ok(())
    }
}

/// Writes each line to stdout, one whole line at a time.
///
/// Lines keep their original terminator; an unterminated final line is
/// closed with `\n`.
#[derive(Debug)]
pub struct EchoWorker<O = Stdout> {
    out: Mutex<O>,
}

impl EchoWorker {
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl Default for EchoWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> EchoWorker<O> {
    pub fn with_writer(out: O) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> O {
        self.out.into_inner()
    }
}

impl<O> Worker<Line> for EchoWorker<O>
where
    O: AsyncWrite + Unpin + Send + 'static,
{
    async fn process(&self, line: Line) -> Result<(), BoxError> {
        let ending = match line.ending() {
            LineEnding::None => b"\n".as_slice(),
            ending => ending.as_bytes(),
        };

        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(ending).await?;
        out.flush().await?;
        Ok(())
    }
}
