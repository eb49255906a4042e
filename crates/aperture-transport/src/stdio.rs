//! Stdio transport: newline-delimited JSON over a child process's stdin and
//! stdout (spec §4.3).

use tokio::process::{Child, ChildStdin, ChildStdout};

use crate::error::{TransportError, TransportResult};
use crate::line::LineTransport;

/// Newline-framed transport over a spawned external server's stdio.
pub type StdioTransport = LineTransport<ChildStdout, ChildStdin>;

/// Take ownership of `child`'s stdin/stdout pipes and wrap them as a
/// [`Transport`](crate::Transport).
///
/// The Supervisor (spec §4.13) retains the [`Child`] handle itself, for
/// waiting on exit status and sending signals; this only borrows the pipes.
///
/// # Errors
/// Returns [`TransportError::Io`] if the child was not spawned with piped
/// stdin/stdout.
pub fn open(child: &mut Child) -> TransportResult<StdioTransport> {
    let stdin = child.stdin.take().ok_or_else(|| {
        TransportError::Io(std::io::Error::other("child process has no piped stdin"))
    })?;
    let stdout = child.stdout.take().ok_or_else(|| {
        TransportError::Io(std::io::Error::other("child process has no piped stdout"))
    })?;
    Ok(LineTransport::new(stdout, stdin))
}
