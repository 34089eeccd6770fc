//! # Compose Driver
//!
//! The container runtime and its compose tool are external collaborators.
//! They are reached through two capability traits:
//!
//! - **`ComposeDriver`**: `validate_manifest`, `build` and `up`, all taking
//!   the same [`ComposeInvocation`] so the three stages observe an identical
//!   environment projection.
//! - **`ContainerRuntime`**: list existing container names (any state) and
//!   force-remove a container.
//!
//! The defaults shell out to `docker`. Tests substitute recording fakes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::error::{ComposeStage, Error, Result};

/// Everything a compose call needs, shared by validate, build and up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeInvocation {
    pub project: String,
    pub manifest: PathBuf,
    pub env_file: Option<PathBuf>,
    pub workdir: PathBuf,
    /// Variables exported to the compose process.
    pub environment: Vec<(String, String)>,
}

impl ComposeInvocation {
    /// The same invocation reading a different env file.
    pub fn with_env_file(&self, env_file: &Path) -> Self {
        Self {
            env_file: Some(env_file.to_path_buf()),
            ..self.clone()
        }
    }
}

/// Trait for compose operations - allows mocking in tests
pub trait ComposeDriver {
    /// No-op `config` pass; an error means the manifest is invalid.
    fn validate_manifest(&self, invocation: &ComposeInvocation) -> Result<()>;

    fn build(&self, invocation: &ComposeInvocation, no_cache: bool) -> Result<()>;

    /// Start the stack, recreating containers and removing orphans.
    fn up(&self, invocation: &ComposeInvocation) -> Result<()>;
}

/// Trait for container inspection - allows mocking in tests
pub trait ContainerRuntime {
    /// Names of all containers, running or stopped.
    fn container_names(&self) -> Result<Vec<String>>;

    fn remove_container(&self, name: &str) -> Result<()>;
}

/// `docker compose` (or any compatible command line).
pub struct DockerCompose {
    program: String,
    prefix: Vec<String>,
}

impl DockerCompose {
    /// Build from a command line such as `docker compose` or `docker-compose`.
    pub fn new(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| Error::InvalidInput {
            name: "COMPOSE_COMMAND".to_string(),
            message: "compose command is empty".to_string(),
        })?;
        Ok(Self {
            program,
            prefix: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, invocation: &ComposeInvocation) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.prefix);
        command
            .arg("--project-name")
            .arg(&invocation.project)
            .arg("--file")
            .arg(&invocation.manifest);
        if let Some(env_file) = &invocation.env_file {
            command.arg("--env-file").arg(env_file);
        }
        command
            .current_dir(&invocation.workdir)
            .envs(invocation.environment.iter().map(|(k, v)| (k, v)));
        command
    }

    fn run_streaming(&self, mut command: Command, stage: ComposeStage) -> Result<()> {
        debug!("Running {:?}", command);
        let status = command.status().map_err(|e| Error::Compose {
            stage,
            message: format!("could not run {}: {}", self.program, e),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Compose {
                stage,
                message: format!("{} exited with {}", self.program, status),
            })
        }
    }
}

impl ComposeDriver for DockerCompose {
    fn validate_manifest(&self, invocation: &ComposeInvocation) -> Result<()> {
        let mut command = self.command(invocation);
        command.args(["config", "--quiet"]).stdout(Stdio::null());
        debug!("Running {:?}", command);

        let output = command.output().map_err(|e| Error::Compose {
            stage: ComposeStage::Validate,
            message: format!("could not run {}: {}", self.program, e),
        })?;
        if output.status.success() {
            info!("Manifest {} is valid", invocation.manifest.display());
            return Ok(());
        }
        Err(Error::Compose {
            stage: ComposeStage::Validate,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn build(&self, invocation: &ComposeInvocation, no_cache: bool) -> Result<()> {
        let mut command = self.command(invocation);
        command.arg("build");
        if no_cache {
            command.arg("--no-cache");
        }
        self.run_streaming(command, ComposeStage::Build)
    }

    fn up(&self, invocation: &ComposeInvocation) -> Result<()> {
        let mut command = self.command(invocation);
        command.args(["up", "--detach", "--force-recreate", "--remove-orphans"]);
        self.run_streaming(command, ComposeStage::Up)
    }
}

/// The `docker` CLI as a [`ContainerRuntime`].
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl ContainerRuntime for DockerCli {
    fn container_names(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .args(["ps", "--all", "--format", "{{.Names}}"])
            .output()?;
        if !output.status.success() {
            return Err(Error::Runtime {
                action: "ps".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(parse_container_names(&String::from_utf8_lossy(&output.stdout)))
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        let output = Command::new(&self.program)
            .args(["rm", "--force", name])
            .output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Runtime {
                action: format!("rm {}", name),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn parse_container_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
