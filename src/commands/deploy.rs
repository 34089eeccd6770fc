//! # Deploy Command Implementation
//!
//! Runs the Provisioning Orchestrator for one host.
//!
//! Inputs are resolved in three layers, highest first:
//!
//! 1. command-line flags
//! 2. environment variables (`CONFIG_SRC`, `COMPOSE_SRC`, `PROFILES`, ...)
//! 3. the optional deploy file (`--config`)
//!
//! and finally the built-in defaults. The command prints a short summary on
//! success; stage progress is logged as it happens.

use anyhow::Result;
use clap::Args;
use std::io::IsTerminal;
use std::path::PathBuf;

use hostprov::artifact::Addresses;
use hostprov::config::{self, pick, DeployFile};
use hostprov::defaults;
use hostprov::orchestrator::{DeployRequest, Provisioner, Sources};
use hostprov::output::{OutputConfig, Status};
use hostprov::profiles::ProfileSet;

use super::CredentialArgs;

/// Provision the host: fetch artifacts, build and start the stack
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Host identifier, e.g. node35.example.com
    #[arg(long, value_name = "HOST", env = "DEPLOY_HOST")]
    pub host: Option<String>,

    /// Comma-separated profiles (stunnel-mtls, stunnel-https, ddns-go)
    #[arg(long, value_name = "LIST", env = "PROFILES")]
    pub profiles: Option<String>,

    /// Primary application config source
    #[arg(long, value_name = "SOURCE", env = "CONFIG_SRC")]
    pub config_src: Option<String>,

    /// Compose manifest source
    #[arg(long, value_name = "SOURCE", env = "COMPOSE_SRC")]
    pub compose_src: Option<String>,

    /// Env template source
    #[arg(long, value_name = "SOURCE", env = "ENV_TEMPLATE_SRC")]
    pub env_template_src: Option<String>,

    /// stunnel CA certificate source
    #[arg(long, value_name = "SOURCE", env = "STUNNEL_CAFILE_SRC")]
    pub stunnel_cafile_src: Option<String>,

    /// stunnel certificate source
    #[arg(long, value_name = "SOURCE", env = "STUNNEL_CERT_SRC")]
    pub stunnel_cert_src: Option<String>,

    /// stunnel private key source
    #[arg(long, value_name = "SOURCE", env = "STUNNEL_KEY_SRC")]
    pub stunnel_key_src: Option<String>,

    /// ddns-go config source
    #[arg(long, value_name = "SOURCE", env = "DDNS_GO_CONFIG_SRC")]
    pub ddns_go_config_src: Option<String>,

    /// Externally reachable address
    #[arg(long, value_name = "ADDR", env = "EXTERNAL_DOMAIN")]
    pub external_domain: Option<String>,

    /// Internally reachable address
    #[arg(long, value_name = "ADDR", env = "INTERNAL_DOMAIN")]
    pub internal_domain: Option<String>,

    /// Compose project name (derived from the host when absent)
    #[arg(long, value_name = "NAME", env = "PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Parent directory of per-project working directories
    ///
    /// Defaults to the platform data directory (e.g. `~/.local/share/hostprov`).
    #[arg(long, value_name = "DIR", env = "DEPLOY_DIR")]
    pub deploy_dir: Option<PathBuf>,

    /// Remove conflicting containers without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Keep the image build cache
    #[arg(long)]
    pub use_cache: bool,

    /// Compose command line [default: docker compose]
    #[arg(long, value_name = "CMD", env = "COMPOSE_COMMAND")]
    pub compose_command: Option<String>,

    /// Service that needs both address placeholders [default: coturn]
    #[arg(long, value_name = "NAME", env = "DEPENDENT_SERVICE")]
    pub dependent_service: Option<String>,

    /// Deploy file with default inputs
    #[arg(short, long, value_name = "FILE", env = "HOSTPROV_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

impl DeployArgs {
    /// Merge flags and environment over the deploy file.
    pub fn request(&self, file: &DeployFile) -> DeployRequest {
        let s = &file.sources;
        let sources = Sources {
            config: pick(self.config_src.as_deref(), s.config.as_deref()),
            compose: pick(self.compose_src.as_deref(), s.compose.as_deref()),
            env_template: pick(self.env_template_src.as_deref(), s.env_template.as_deref()),
            stunnel_ca: pick(self.stunnel_cafile_src.as_deref(), s.stunnel_ca.as_deref()),
            stunnel_cert: pick(self.stunnel_cert_src.as_deref(), s.stunnel_cert.as_deref()),
            stunnel_key: pick(self.stunnel_key_src.as_deref(), s.stunnel_key.as_deref()),
            ddns_go: pick(self.ddns_go_config_src.as_deref(), s.ddns_go.as_deref()),
        };
        let file_profiles = file.profiles.as_ref().map(|p| p.joined());
        let profiles = pick(self.profiles.as_deref(), file_profiles.as_deref()).unwrap_or_default();

        DeployRequest {
            host: self.host.clone().unwrap_or_default(),
            project: pick(self.project_name.as_deref(), file.project_name.as_deref()),
            profiles: ProfileSet::parse(&profiles),
            deploy_root: self
                .deploy_dir
                .clone()
                .unwrap_or_else(defaults::default_deploy_root),
            sources,
            addresses: Addresses::new(
                pick(self.external_domain.as_deref(), file.external_domain.as_deref()),
                pick(self.internal_domain.as_deref(), file.internal_domain.as_deref()),
            ),
            dependent_service: pick(
                self.dependent_service.as_deref(),
                file.dependent_service.as_deref(),
            )
            .unwrap_or_else(|| defaults::DEPENDENT_SERVICE.to_string()),
            no_cache: !self.use_cache,
            interactive: !self.yes && std::io::stdin().is_terminal(),
        }
    }

    fn compose_command(&self, file: &DeployFile) -> String {
        pick(self.compose_command.as_deref(), file.compose_command.as_deref())
            .unwrap_or_else(|| defaults::COMPOSE_COMMAND.to_string())
    }
}

/// Execute the `deploy` command.
pub fn execute(args: DeployArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let file = match &args.config {
        Some(path) => config::from_file(path)?,
        None => DeployFile::default(),
    };
    let request = args.request(&file);

    println!(
        "{}",
        out.status(
            Status::Info,
            &format!(
                "Deploying {} (profiles: {})",
                if request.host.is_empty() { "?" } else { request.host.as_str() },
                request.profiles
            )
        )
    );

    let provisioner = Provisioner::new(args.credentials.credentials(), &args.compose_command(&file))?;
    let summary = provisioner.run(request)?;

    println!(
        "{}",
        out.status(Status::Ok, &format!("Stack {} is up", summary.project))
    );
    println!("{}", out.detail("directory", &summary.workdir.display().to_string()));
    println!("{}", out.detail("env file", &summary.env_file.display().to_string()));
    for fetched in &summary.fetched {
        println!(
            "{}",
            out.detail(
                "fetched",
                &format!("{} ({} bytes)", fetched.path.display(), fetched.bytes)
            )
        );
    }
    if !summary.removed_containers.is_empty() {
        println!(
            "{}",
            out.detail("removed", &summary.removed_containers.join(", "))
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: DeployArgs,
    }

    #[test]
    fn test_flags_override_deploy_file() {
        let file = config::parse(
            "project_name: from-file\nprofiles: [ddns-go]\nsources:\n  config: https://file/app.yaml\n  compose: https://file/dc.yml\n",
        )
        .unwrap();
        let harness = Harness::try_parse_from([
            "deploy",
            "--host",
            "node35.example.com",
            "--config-src",
            "https://cli/app.yaml",
            "--deploy-dir",
            "/srv/hostprov",
            "--yes",
        ])
        .unwrap();
        let request = harness.args.request(&file);

        assert_eq!(request.sources.config.as_deref(), Some("https://cli/app.yaml"));
        assert_eq!(request.sources.compose.as_deref(), Some("https://file/dc.yml"));
        assert_eq!(request.project.as_deref(), Some("from-file"));
        assert!(request.profiles.contains("ddns-go"));
        assert!(request.no_cache);
        assert!(!request.interactive);
        assert_eq!(request.dependent_service, "coturn");
    }
}
