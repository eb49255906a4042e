//! Per-method fetch and build routines, each populating a staging directory.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{InstallerError, InstallerResult};
use crate::types::{InstallMethod, LaunchSpec, PackageManager};

/// Run `method`, placing the built artifacts under `staging`, and return the
/// [`LaunchSpec`] that will launch the installed server.
///
/// # Errors
/// Returns [`InstallerError::CommandFailed`] if the required binary is
/// missing or the fetch/build command exits non-zero.
pub(crate) async fn run(method: &InstallMethod, staging: &Path) -> InstallerResult<LaunchSpec> {
    match method {
        InstallMethod::PackageManager { manager, spec } => install_package(*manager, spec, staging).await,
        InstallMethod::Git { url, git_ref, build_command } => {
            install_git(url, git_ref.as_deref(), build_command.as_deref(), staging).await
        }
        InstallMethod::Container { image } => install_container(image, staging).await,
    }
}

async fn install_package(manager: PackageManager, spec: &str, staging: &Path) -> InstallerResult<LaunchSpec> {
    let binary = require_binary(manager.binary())?;

    let args: Vec<String> = match manager {
        PackageManager::Npm => {
            vec!["install".into(), "--prefix".into(), ".".into(), spec.to_string()]
        }
        PackageManager::Pip => {
            vec!["install".into(), "--target".into(), ".".into(), spec.to_string()]
        }
        PackageManager::Cargo => {
            vec!["install".into(), "--root".into(), ".".into(), spec.to_string()]
        }
    };

    run_command(&binary, &args, staging).await?;

    let (command, launch_args) = match manager {
        PackageManager::Npm => ("node".to_string(), vec!["node_modules/.bin/server".to_string()]),
        PackageManager::Pip => ("python3".to_string(), vec!["-m".to_string(), spec_module_name(spec)]),
        PackageManager::Cargo => ("./bin/server".to_string(), Vec::new()),
    };

    Ok(LaunchSpec { command, args: launch_args, env: Vec::new(), working_dir: staging.to_path_buf() })
}

fn spec_module_name(spec: &str) -> String {
    spec.split(['@', '=']).next().unwrap_or(spec).to_string()
}

async fn install_git(
    url: &str,
    git_ref: Option<&str>,
    build_command: Option<&str>,
    staging: &Path,
) -> InstallerResult<LaunchSpec> {
    require_binary("git")?;

    let mut args = vec!["clone".to_string(), "--depth=1".to_string()];
    if let Some(r) = git_ref {
        args.push("--branch".to_string());
        args.push(r.to_string());
    }
    args.push(url.to_string());
    args.push(".".to_string());

    run_command("git", &args, staging).await?;

    if let Some(build) = build_command {
        run_command("sh", &["-c".to_string(), build.to_string()], staging).await?;
    }

    Ok(LaunchSpec {
        command: "./bin/server".to_string(),
        args: Vec::new(),
        env: Vec::new(),
        working_dir: staging.to_path_buf(),
    })
}

async fn install_container(image: &str, staging: &Path) -> InstallerResult<LaunchSpec> {
    require_binary("docker")?;
    run_command("docker", &["pull".to_string(), image.to_string()], staging).await?;

    Ok(LaunchSpec {
        command: "docker".to_string(),
        args: vec!["run".to_string(), "--rm".to_string(), "-i".to_string(), image.to_string()],
        env: Vec::new(),
        working_dir: staging.to_path_buf(),
    })
}

fn require_binary(name: &str) -> InstallerResult<String> {
    which::which(name)
        .map(|path| path.display().to_string())
        .map_err(|_| InstallerError::CommandFailed(format!("required binary '{name}' not found on PATH")))
}

async fn run_command(program: &str, args: &[String], cwd: &Path) -> InstallerResult<()> {
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| InstallerError::CommandFailed(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InstallerError::CommandFailed(format!("{program} {}: {stderr}", args.join(" "))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_strips_version_pin() {
        assert_eq!(spec_module_name("mypkg==1.0.0"), "mypkg");
        assert_eq!(spec_module_name("mypkg@1.0.0"), "mypkg");
        assert_eq!(spec_module_name("mypkg"), "mypkg");
    }
}
