//! # Provisioning Orchestrator
//!
//! Turns a host identifier and a profile set into a running service stack.
//!
//! ## Stages
//!
//! The run is a strictly linear sequence; each stage takes the
//! [`DeployContext`] produced by the previous one and returns an updated
//! context or an error:
//!
//! 1. **validate-inputs**: required variables, profile-dependent inputs,
//!    source spec syntax and required tools. Nothing is fetched or changed
//!    before this stage passes.
//! 2. **fetch-primary-config**
//! 3. **fetch-compose-manifest**: also checks that both address
//!    placeholders are supplied when the dependent service is declared.
//! 4. **fetch-optional-artifacts**: the env template and whatever the active
//!    profiles require, each validated as it lands.
//! 5. **reconcile-container-names**: declared `container_name`s that already
//!    exist are removed after confirmation (automatically when
//!    non-interactive).
//! 6. **validate-compose**: `config` pass; failure means the manifest is
//!    invalid.
//! 7. **build-images**
//! 8. **generate-env**: template + well-known keys, written to `.env`.
//! 9. **start-stack**: `up` with forced recreation and orphan removal.
//!
//! Validate, build and up share one environment projection, so they observe
//! the same variable set.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::artifact::{self, Addresses};
use crate::compose::{ComposeDriver, ComposeInvocation, ContainerRuntime, DockerCli, DockerCompose};
use crate::envfile::EnvFile;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::profiles::{ArtifactKind, Input, ProfileSet};
use crate::resolver::{Credentials, FetchResult, Fetcher, SourceResolver};
use crate::source::SourceSpec;
use crate::suggestions;
use crate::tools::{PathLocator, ToolLocator};

pub const MANIFEST_FILE: &str = "docker-compose.yml";
pub const ENV_TEMPLATE_FILE: &str = ".env.template";
pub const ENV_FILE: &str = ".env";
pub const CONFIG_DIR: &str = "config";
const RUNTIME_PROGRAM: &str = "docker";

/// Source specs for every artifact the orchestrator may fetch.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub config: Option<String>,
    pub compose: Option<String>,
    pub env_template: Option<String>,
    pub stunnel_ca: Option<String>,
    pub stunnel_cert: Option<String>,
    pub stunnel_key: Option<String>,
    pub ddns_go: Option<String>,
}

impl Sources {
    /// The spec for a profile input, if supplied and non-blank.
    pub fn get(&self, input: Input) -> Option<&str> {
        let value = match input {
            Input::StunnelCa => &self.stunnel_ca,
            Input::StunnelCert => &self.stunnel_cert,
            Input::StunnelKey => &self.stunnel_key,
            Input::DdnsGoConfig => &self.ddns_go,
        };
        non_blank(value)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Everything the operator asked for.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub host: String,
    /// Explicit project name; derived from the host when absent.
    pub project: Option<String>,
    pub profiles: ProfileSet,
    /// Parent of per-project working directories.
    pub deploy_root: PathBuf,
    pub sources: Sources,
    pub addresses: Addresses,
    pub dependent_service: String,
    /// Bypass the image build cache.
    pub no_cache: bool,
    /// Ask before removing conflicting containers.
    pub interactive: bool,
}

/// Stages of a deployment, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateInputs,
    FetchPrimaryConfig,
    FetchComposeManifest,
    FetchOptionalArtifacts,
    ReconcileContainerNames,
    ValidateCompose,
    BuildImages,
    GenerateEnv,
    StartStack,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::ValidateInputs,
        Stage::FetchPrimaryConfig,
        Stage::FetchComposeManifest,
        Stage::FetchOptionalArtifacts,
        Stage::ReconcileContainerNames,
        Stage::ValidateCompose,
        Stage::BuildImages,
        Stage::GenerateEnv,
        Stage::StartStack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ValidateInputs => "validate-inputs",
            Stage::FetchPrimaryConfig => "fetch-primary-config",
            Stage::FetchComposeManifest => "fetch-compose-manifest",
            Stage::FetchOptionalArtifacts => "fetch-optional-artifacts",
            Stage::ReconcileContainerNames => "reconcile-container-names",
            Stage::ValidateCompose => "validate-compose-syntax",
            Stage::BuildImages => "build-images",
            Stage::GenerateEnv => "generate-env",
            Stage::StartStack => "start-stack",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One artifact to retrieve, decided during input validation.
#[derive(Debug, Clone)]
pub struct PlannedFetch {
    pub label: String,
    pub spec: SourceSpec,
    pub dest: PathBuf,
    pub kind: Option<ArtifactKind>,
}

/// The state of a run, threaded through every stage.
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub request: DeployRequest,
    pub stage: Stage,
    pub project: String,
    pub workdir: PathBuf,
    pub config: Option<PlannedFetch>,
    pub compose: Option<PlannedFetch>,
    pub env_template: Option<PlannedFetch>,
    pub artifacts: Vec<PlannedFetch>,
    pub environment: Vec<(String, String)>,
    pub manifest: Manifest,
    pub fetched: Vec<FetchResult>,
    pub removed_containers: Vec<String>,
    pub env_file: Option<PathBuf>,
}

impl DeployContext {
    pub fn new(request: DeployRequest) -> Self {
        let project = request
            .project
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derive_project_name(&request.host));
        let workdir = request.deploy_root.join(&project);
        Self {
            request,
            stage: Stage::ValidateInputs,
            project,
            workdir,
            config: None,
            compose: None,
            env_template: None,
            artifacts: Vec::new(),
            environment: Vec::new(),
            manifest: Manifest::default(),
            fetched: Vec::new(),
            removed_containers: Vec::new(),
            env_file: None,
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.workdir.join(MANIFEST_FILE)
    }

    /// The invocation shared by validate, build and up.
    pub fn invocation(&self) -> ComposeInvocation {
        ComposeInvocation {
            project: self.project.clone(),
            manifest: self.manifest_path(),
            env_file: self.env_template.as_ref().map(|t| t.dest.clone()),
            workdir: self.workdir.clone(),
            environment: self.environment.clone(),
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct DeploySummary {
    pub project: String,
    pub workdir: PathBuf,
    pub fetched: Vec<FetchResult>,
    pub removed_containers: Vec<String>,
    pub env_file: PathBuf,
}

/// Derive a compose project name from a host: the first DNS label,
/// lower-cased, with anything outside `[a-z0-9_-]` replaced by `-`.
pub fn derive_project_name(host: &str) -> String {
    let label = host.trim().split('.').next().unwrap_or_default();
    let name: String = label
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches('-').to_string();
    if name.is_empty() {
        "hostprov".to_string()
    } else {
        name
    }
}

/// Trait for operator confirmation - allows mocking in tests
pub trait Prompter {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Interactive confirmation on the terminal.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }
}

/// Drives a deployment through its stages.
pub struct Provisioner {
    fetcher: Box<dyn Fetcher>,
    compose: Box<dyn ComposeDriver>,
    runtime: Box<dyn ContainerRuntime>,
    prompter: Box<dyn Prompter>,
    tools: Box<dyn ToolLocator>,
    compose_program: String,
}

impl Provisioner {
    /// Creates a provisioner backed by the real transports and `docker`.
    pub fn new(credentials: Credentials, compose_command: &str) -> Result<Self> {
        let compose = DockerCompose::new(compose_command)?;
        let compose_program = compose.program().to_string();
        Ok(Self {
            fetcher: Box::new(SourceResolver::new(credentials)?),
            runtime: Box::new(DockerCli::new(RUNTIME_PROGRAM)),
            compose: Box::new(compose),
            prompter: Box::new(DialoguerPrompter),
            tools: Box::new(PathLocator),
            compose_program,
        })
    }

    /// Creates a provisioner with custom capability implementations.
    pub fn with_operations(
        fetcher: Box<dyn Fetcher>,
        compose: Box<dyn ComposeDriver>,
        runtime: Box<dyn ContainerRuntime>,
        prompter: Box<dyn Prompter>,
        tools: Box<dyn ToolLocator>,
        compose_program: &str,
    ) -> Self {
        Self {
            fetcher,
            compose,
            runtime,
            prompter,
            tools,
            compose_program: compose_program.to_string(),
        }
    }

    /// Run every stage in order.
    pub fn run(&self, request: DeployRequest) -> Result<DeploySummary> {
        let ctx = DeployContext::new(request);
        let ctx = self.validate_inputs(ctx)?;
        let ctx = self.fetch_primary_config(ctx)?;
        let ctx = self.fetch_compose_manifest(ctx)?;
        let ctx = self.fetch_optional_artifacts(ctx)?;
        let ctx = self.reconcile_container_names(ctx)?;
        let ctx = self.validate_compose(ctx)?;
        let ctx = self.build_images(ctx)?;
        let ctx = self.generate_env(ctx)?;
        let ctx = self.start_stack(ctx)?;

        Ok(DeploySummary {
            project: ctx.project,
            workdir: ctx.workdir,
            fetched: ctx.fetched,
            removed_containers: ctx.removed_containers,
            env_file: ctx.env_file.unwrap_or_default(),
        })
    }

    fn enter(&self, mut ctx: DeployContext, stage: Stage) -> DeployContext {
        let position = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0) + 1;
        info!("[{}/{}] {}", position, Stage::ALL.len(), stage);
        ctx.stage = stage;
        ctx
    }

    /// Check every precondition before anything is fetched or changed.
    pub fn validate_inputs(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::ValidateInputs);
        let request = ctx.request.clone();

        if request.host.trim().is_empty() {
            return Err(missing_variable("host", "DEPLOY_HOST"));
        }
        let config_src = non_blank(&request.sources.config)
            .ok_or_else(|| missing_variable("config-src", "CONFIG_SRC"))?;
        let compose_src = non_blank(&request.sources.compose)
            .ok_or_else(|| missing_variable("compose-src", "COMPOSE_SRC"))?;

        let rules = request.profiles.active_rules();
        for rule in &rules {
            let missing: Vec<String> = rule
                .required_inputs()
                .filter(|input| request.sources.get(*input).is_none())
                .map(|input| input.env_name().to_string())
                .collect();
            if !missing.is_empty() {
                return Err(Error::MissingProfileInput {
                    profile: rule.profile.to_string(),
                    missing,
                    hint: Some(suggestions::missing_profile_input(rule.profile)),
                });
            }
        }

        let config_spec = SourceSpec::parse(config_src)?;
        let config_dest = ctx
            .workdir
            .join(CONFIG_DIR)
            .join(config_spec.file_name()?);
        ctx.config = Some(PlannedFetch {
            label: "config".to_string(),
            spec: config_spec,
            dest: config_dest,
            kind: Some(ArtifactKind::Template),
        });
        ctx.compose = Some(PlannedFetch {
            label: "compose manifest".to_string(),
            spec: SourceSpec::parse(compose_src)?,
            dest: ctx.manifest_path(),
            kind: None,
        });
        if let Some(template_src) = non_blank(&request.sources.env_template) {
            ctx.env_template = Some(PlannedFetch {
                label: "env template".to_string(),
                spec: SourceSpec::parse(template_src)?,
                dest: ctx.workdir.join(ENV_TEMPLATE_FILE),
                kind: None,
            });
        }
        for rule in &rules {
            for artifact in rule.artifacts {
                let src = request.sources.get(artifact.input).unwrap_or_default();
                ctx.artifacts.push(PlannedFetch {
                    label: format!("{} {}", rule.profile, artifact.input.env_name()),
                    spec: SourceSpec::parse(src)?,
                    dest: ctx.workdir.join(artifact.dest),
                    kind: Some(artifact.kind),
                });
            }
        }

        self.require_tool(&self.compose_program)?;
        let needs_git = ctx
            .config
            .iter()
            .chain(ctx.compose.iter())
            .chain(ctx.env_template.iter())
            .chain(ctx.artifacts.iter())
            .any(|planned| planned.spec.is_git());
        if needs_git {
            self.require_tool("git")?;
        }

        ctx.environment = environment_projection(&ctx.project, &request);
        debug!(
            "Project {} in {}, profiles {}",
            ctx.project,
            ctx.workdir.display(),
            request.profiles
        );
        Ok(ctx)
    }

    fn require_tool(&self, tool: &str) -> Result<()> {
        match self.tools.locate(tool) {
            Some(path) => {
                debug!("Found {} at {}", tool, path.display());
                Ok(())
            }
            None => Err(Error::MissingTool {
                tool: tool.to_string(),
                message: "not found on PATH".to_string(),
            }),
        }
    }

    fn fetch_planned(&self, ctx: &mut DeployContext, planned: &PlannedFetch) -> Result<()> {
        info!("Fetching {} from {}", planned.label, planned.spec);
        let result = self.fetcher.fetch(&planned.spec, &planned.dest)?;
        if let Some(kind) = planned.kind {
            artifact::finalize(kind, &result.path, &ctx.request.addresses)?;
        }
        ctx.fetched.push(result);
        Ok(())
    }

    pub fn fetch_primary_config(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::FetchPrimaryConfig);
        fs::create_dir_all(&ctx.workdir)?;
        if let Some(planned) = ctx.config.clone() {
            self.fetch_planned(&mut ctx, &planned)?;
        }
        Ok(ctx)
    }

    pub fn fetch_compose_manifest(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::FetchComposeManifest);
        if let Some(planned) = ctx.compose.clone() {
            self.fetch_planned(&mut ctx, &planned)?;
        }
        ctx.manifest = Manifest::load(&ctx.manifest_path())?;

        let service = ctx.request.dependent_service.trim();
        if !service.is_empty()
            && ctx.manifest.declares(service)
            && !ctx.request.addresses.is_complete()
        {
            return Err(Error::MissingVariable {
                name: "EXTERNAL_DOMAIN and INTERNAL_DOMAIN".to_string(),
                hint: Some(suggestions::missing_addresses(service)),
            });
        }
        Ok(ctx)
    }

    pub fn fetch_optional_artifacts(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::FetchOptionalArtifacts);
        let planned: Vec<PlannedFetch> = ctx
            .env_template
            .iter()
            .chain(ctx.artifacts.iter())
            .cloned()
            .collect();
        if planned.is_empty() {
            info!("No optional artifacts for profiles {}", ctx.request.profiles);
        }
        for item in &planned {
            self.fetch_planned(&mut ctx, item)?;
        }
        Ok(ctx)
    }

    pub fn reconcile_container_names(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::ReconcileContainerNames);
        let declared = ctx.manifest.container_names();
        if declared.is_empty() {
            return Ok(ctx);
        }

        let existing = self.runtime.container_names()?;
        let conflicts = declared.conflicts(&existing);
        if conflicts.is_empty() {
            debug!("No container name conflicts");
            return Ok(ctx);
        }

        warn!("Existing containers conflict with the manifest: {}", conflicts.join(", "));
        if ctx.request.interactive {
            let prompt = format!(
                "Force-remove {} existing container(s): {}?",
                conflicts.len(),
                conflicts.join(", ")
            );
            if !self.prompter.confirm(&prompt)? {
                return Err(Error::Declined {
                    containers: conflicts,
                });
            }
        } else {
            info!("Non-interactive run; removing conflicting containers");
        }

        for name in &conflicts {
            match self.runtime.remove_container(name) {
                Ok(()) => info!("Removed container {}", name),
                Err(e) => warn!("Ignoring failure to remove {}: {}", name, e),
            }
        }
        ctx.removed_containers = conflicts;
        Ok(ctx)
    }

    pub fn validate_compose(&self, ctx: DeployContext) -> Result<DeployContext> {
        let ctx = self.enter(ctx, Stage::ValidateCompose);
        self.compose.validate_manifest(&ctx.invocation())?;
        Ok(ctx)
    }

    pub fn build_images(&self, ctx: DeployContext) -> Result<DeployContext> {
        let ctx = self.enter(ctx, Stage::BuildImages);
        self.compose
            .build(&ctx.invocation(), ctx.request.no_cache)?;
        Ok(ctx)
    }

    pub fn generate_env(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::GenerateEnv);
        let mut env = match &ctx.env_template {
            Some(template) => EnvFile::load(&template.dest)?,
            None => EnvFile::new(),
        };
        for (key, value) in env_overlay(&ctx.project, &ctx.request) {
            env.set(&key, &value);
        }
        let path = ctx.workdir.join(ENV_FILE);
        env.save(&path)?;
        info!("Wrote {}", path.display());
        ctx.env_file = Some(path);
        Ok(ctx)
    }

    pub fn start_stack(&self, ctx: DeployContext) -> Result<DeployContext> {
        let mut ctx = self.enter(ctx, Stage::StartStack);
        let env_file = ctx
            .env_file
            .clone()
            .unwrap_or_else(|| ctx.workdir.join(ENV_FILE));
        self.compose
            .up(&ctx.invocation().with_env_file(&env_file))?;
        ctx.stage = Stage::Done;
        Ok(ctx)
    }
}

fn missing_variable(flag: &str, env: &str) -> Error {
    Error::MissingVariable {
        name: env.to_string(),
        hint: Some(suggestions::missing_variable(flag, env)),
    }
}

/// Well-known keys written into the env file.
fn env_overlay(project: &str, request: &DeployRequest) -> Vec<(String, String)> {
    let mut overlay = vec![
        ("COMPOSE_PROJECT_NAME".to_string(), project.to_string()),
        ("HOSTNAME".to_string(), request.host.trim().to_string()),
    ];
    if let Some(external) = &request.addresses.external {
        overlay.push(("EXTERNAL_DOMAIN".to_string(), external.clone()));
    }
    if let Some(internal) = &request.addresses.internal {
        overlay.push(("INTERNAL_DOMAIN".to_string(), internal.clone()));
    }
    overlay
}

/// Variables exported to every compose stage.
fn environment_projection(project: &str, request: &DeployRequest) -> Vec<(String, String)> {
    let mut environment = env_overlay(project, request);
    if !request.profiles.is_empty() {
        let profiles: Vec<&str> = request.profiles.tokens().collect();
        environment.push(("COMPOSE_PROFILES".to_string(), profiles.join(",")));
    }
    environment
}
