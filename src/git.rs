//! Single-file sparse fetches with the system `git` binary.
//!
//! Instead of a full clone, the fetch initializes an empty scratch
//! repository, restricts the sparse checkout to the one requested path,
//! fetches depth-1 history for the named branch and checks it out detached.
//! The scratch directory is a [`tempfile::TempDir`], so it is removed on
//! every exit path.
//!
//! Using the system git command means SSH agents, `~/.ssh/config` and
//! credential helpers work exactly as they do for the operator's own git.

use std::fs;
use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::resolver::AuthHeader;
use crate::source::{git_transport, redact_url, GitTransport};
use crate::suggestions;

/// Credentials available to a git fetch.
#[derive(Debug, Clone, Default)]
pub struct GitAuth<'a> {
    pub ssh_key: Option<&'a Path>,
    pub header: Option<&'a AuthHeader>,
}

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Fetch `path` at `branch` from `repo` into `dest`, returning the number
    /// of bytes written.
    fn fetch_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        auth: &GitAuth<'_>,
        dest: &Path,
    ) -> Result<u64>;
}

/// The default implementation of `GitOperations`, which shells out to `git`.
pub struct GitCli;

impl GitOperations for GitCli {
    fn fetch_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        auth: &GitAuth<'_>,
        dest: &Path,
    ) -> Result<u64> {
        sparse_fetch(repo, branch, path, auth, dest)
    }
}

/// Retrieve exactly one file from one branch of a remote repository.
pub fn sparse_fetch(
    repo: &str,
    branch: &str,
    path: &str,
    auth: &GitAuth<'_>,
    dest: &Path,
) -> Result<u64> {
    let shown = redact_url(repo);
    info!("Fetching {} from {}@{}", path, shown, branch);

    let scratch = tempfile::Builder::new()
        .prefix("hostprov-git-")
        .tempdir()?;
    let work = scratch.path();

    let git = GitInvocation::new(repo, work);
    git.run(&["init", "-q"], None)?;
    git.run(&["remote", "add", "origin", repo], None)?;
    git.run(&["config", "core.sparseCheckout", "true"], None)?;

    let info_dir = work.join(".git").join("info");
    fs::create_dir_all(&info_dir)?;
    fs::write(info_dir.join("sparse-checkout"), format!("/{}\n", path))?;

    let transport = git_transport(repo);
    let header = match transport {
        GitTransport::Ssh => None,
        _ => auth.header,
    };
    let ssh_command = match (transport, auth.ssh_key) {
        (GitTransport::Ssh, Some(key)) => Some(ssh_command_for_key(key)),
        _ => None,
    };

    git.fetch(branch, header, ssh_command.as_deref())
        .map_err(|e| classify_fetch_error(e, repo, branch, transport, auth))?;
    git.run(&["checkout", "-q", "--detach", "FETCH_HEAD"], None)
        .map_err(|e| match e {
            // Older git refuses a sparse checkout that matches nothing.
            Error::GitCommand { stderr, .. } if stderr.contains("leaves no entry") => {
                Error::MissingRepoFile {
                    url: shown.clone(),
                    branch: branch.to_string(),
                    path: path.to_string(),
                }
            }
            other => other,
        })?;

    let source = work.join(path);
    let size = fs::metadata(&source)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .unwrap_or(0);
    if size == 0 {
        return Err(Error::MissingRepoFile {
            url: shown,
            branch: branch.to_string(),
            path: path.to_string(),
        });
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let written = fs::copy(&source, dest)?;
    debug!("Copied {} ({} bytes) to {}", path, written, dest.display());

    Ok(written)
}

/// Build a `GIT_SSH_COMMAND` that forces a specific private key.
fn ssh_command_for_key(key: &Path) -> String {
    let quoted = key.display().to_string().replace('\'', r"'\''");
    format!(
        "ssh -i '{}' -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
        quoted
    )
}

struct GitInvocation<'a> {
    repo: &'a str,
    work: &'a Path,
}

impl<'a> GitInvocation<'a> {
    fn new(repo: &'a str, work: &'a Path) -> Self {
        Self { repo, work }
    }

    fn fetch(
        &self,
        branch: &str,
        header: Option<&AuthHeader>,
        ssh_command: Option<&str>,
    ) -> Result<()> {
        let mut command = self.command(header);
        if let Some(ssh_command) = ssh_command {
            command.env("GIT_SSH_COMMAND", ssh_command);
        }
        command.args(["fetch", "-q", "--depth=1", "origin", branch]);
        self.finish(command, "fetch --depth=1 origin")
    }

    fn run(&self, args: &[&str], header: Option<&AuthHeader>) -> Result<()> {
        let mut command = self.command(header);
        command.args(args);
        self.finish(command, &args.join(" "))
    }

    /// The extra header is passed through `-c` and is never logged.
    fn command(&self, header: Option<&AuthHeader>) -> Command {
        let mut command = Command::new("git");
        if let Some(header) = header {
            command
                .arg("-c")
                .arg(format!("http.extraHeader={}: {}", header.name, header.value));
        }
        command
            .current_dir(self.work)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_ASKPASS", "true");
        command
    }

    fn finish(&self, mut command: Command, shown: &str) -> Result<()> {
        debug!("git {}", redact_url(shown));
        let output = command.output().map_err(|e| Error::GitCommand {
            command: shown.to_string(),
            url: redact_url(self.repo),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command: redact_url(shown),
                url: redact_url(self.repo),
                stderr: redact_url(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }
        Ok(())
    }
}

fn classify_fetch_error(
    error: Error,
    repo: &str,
    branch: &str,
    transport: GitTransport,
    auth: &GitAuth<'_>,
) -> Error {
    let stderr = match &error {
        Error::GitCommand { stderr, .. } => stderr.clone(),
        _ => String::new(),
    };
    if stderr.is_empty() {
        return error;
    }

    let auth_failed = stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("could not read Username")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("terminal prompts disabled")
        || stderr.contains("403");
    if auth_failed {
        let has_credentials = match transport {
            GitTransport::Ssh => auth.ssh_key.is_some(),
            _ => auth.header.is_some(),
        };
        return Error::AuthRejected {
            url: redact_url(repo),
            message: stderr,
            hint: Some(suggestions::git_auth_hint(transport, has_credentials)),
        };
    }

    if stderr.contains("couldn't find remote ref") {
        return Error::GitCommand {
            command: "fetch --depth=1 origin".to_string(),
            url: redact_url(repo),
            stderr: format!("branch '{}' does not exist", branch),
        };
    }

    error
}
