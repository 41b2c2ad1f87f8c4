//! Gardener API command line
//!
//! Works with the Gardener API groups offline and against a cluster:
//! renders and installs CRDs, applies defaults, validates objects, lints
//! cloud profile versions, plans Shoot maintenance, generates the API
//! reference and serves the validating admission webhook.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use kube::ResourceExt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gardener_api::apis::core::v1beta1::{CloudProfile, ExpirableVersion, Shoot};
use gardener_api::docs::lint_files;
use gardener_api::install::{render_crds_yaml, CrdInstaller};
use gardener_api::versioning::{summarize, Severity};
use gardener_api::{
    all_crds, default_object, validate_object, ApiKind, Config, DefaultingContext,
    MaintenancePlanner, ReferenceGenerator, Result, Error, ValidationContext, WebhookServer,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Gardener API - typed objects, validation, version policy and admission
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, short, env = "GARDENER_API_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print all CustomResourceDefinitions as YAML
    Crds,

    /// Apply all CustomResourceDefinitions to the current cluster
    Install,

    /// Print an object with its defaults applied
    Default {
        /// Object manifest
        file: PathBuf,

        /// CloudProfile used to complete versions
        #[arg(long)]
        cloud_profile: Option<PathBuf>,
    },

    /// Validate an object, optionally as an update of `--old`
    Validate {
        /// Object manifest
        file: PathBuf,

        /// Previous state of the object
        #[arg(long)]
        old: Option<PathBuf>,

        /// CloudProfile referenced by a Shoot
        #[arg(long)]
        cloud_profile: Option<PathBuf>,

        /// Apply defaults before validating
        #[arg(long)]
        with_defaults: bool,
    },

    /// Classify the versions a CloudProfile offers and check its deprecation policy
    Classify {
        /// CloudProfile manifest
        file: PathBuf,

        /// Reference time (RFC 3339), now when omitted
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Plan and apply the maintenance of a Shoot
    Maintain {
        /// Shoot manifest
        shoot: PathBuf,

        /// CloudProfile referenced by the Shoot
        #[arg(long)]
        cloud_profile: PathBuf,

        /// Reference time (RFC 3339), now when omitted
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Plan updates even outside the maintenance window
        #[arg(long)]
        ignore_window: bool,

        /// Print the plan instead of the updated Shoot
        #[arg(long)]
        dry_run: bool,
    },

    /// API reference documentation
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },

    /// Serve the validating admission webhook
    Serve {
        /// Listen address, overrides the configuration file
        #[arg(long, env = "WEBHOOK_ADDR")]
        bind_address: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DocsCommand {
    /// Generate the API reference
    Generate {
        /// Output file, overrides the configuration file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check anchors and links of the generated reference
    Lint {
        /// Glob of files to check, overrides the configuration file
        pattern: Option<String>,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    let config = Config::load(args.config.as_deref())?;

    let result = run(args.command, config).await;
    if let Err(e) = &result {
        error!(error = %e, retryable = e.is_retryable(), "Command failed");
    }
    result
}

async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Crds => {
            print!("{}", render_crds_yaml(&all_crds()?)?);
        }

        Command::Install => {
            let client = kube::Client::try_default().await?;
            info!(field_manager = %config.install.field_manager, "Installing CRDs");
            let installed = CrdInstaller::new(client, config.install).install_all().await?;
            for name in installed {
                println!("{}", name);
            }
        }

        Command::Default { file, cloud_profile } => {
            let (kind, object) = read_object(&file)?;
            let profile = cloud_profile.as_deref().map(read_yaml::<CloudProfile>).transpose()?;
            let mut ctx = DefaultingContext::new(Utc::now());
            if let Some(profile) = &profile {
                ctx = ctx.with_cloud_profile(profile);
            }
            let defaulted = default_object(kind, object, &ctx)?;
            print!("{}", serde_yaml::to_string(&defaulted)?);
        }

        Command::Validate {
            file,
            old,
            cloud_profile,
            with_defaults,
        } => {
            let (kind, mut object) = read_object(&file)?;
            let old = match old {
                Some(path) => {
                    let (old_kind, old_object) = read_object(&path)?;
                    if old_kind != kind {
                        return Err(Error::Configuration(format!(
                            "{} is a {}, expected {}",
                            path.display(),
                            old_kind,
                            kind
                        )));
                    }
                    Some(old_object)
                }
                None => None,
            };
            let profile = cloud_profile.as_deref().map(read_yaml::<CloudProfile>).transpose()?;

            let now = Utc::now();
            if with_defaults {
                let mut defaults = DefaultingContext::new(now);
                if let Some(profile) = &profile {
                    defaults = defaults.with_cloud_profile(profile);
                }
                object = default_object(kind, object, &defaults)?;
            }

            let mut ctx = ValidationContext::new(now).with_policy(config.versioning.checker());
            if let Some(profile) = &profile {
                ctx = ctx.with_cloud_profile(profile);
            }

            let errors = validate_object(kind, &object, old.as_ref(), &ctx)?;
            if !errors.is_empty() {
                for e in errors.iter() {
                    eprintln!("{}", e);
                }
                return Err(Error::Validation(errors));
            }
            println!("{} {} is valid", kind, file.display());
        }

        Command::Classify { file, now } => {
            let profile: CloudProfile = read_yaml(&file)?;
            let now = now.unwrap_or_else(Utc::now);
            let checker = config.versioning.checker();

            let mut groups: Vec<(String, Vec<ExpirableVersion>)> =
                vec![("kubernetes".to_string(), profile.spec.kubernetes.versions.clone())];
            for image in &profile.spec.machine_images {
                let versions = image.versions.iter().map(|v| v.expirable.clone()).collect();
                groups.push((format!("image/{}", image.name), versions));
            }

            let mut policy_errors = 0;
            for (name, versions) in &groups {
                for (version, classification) in summarize(versions, now) {
                    println!("{}\t{}\t{}", name, version, classification);
                }
                for finding in checker.check(versions, now) {
                    if finding.severity == Severity::Error {
                        policy_errors += 1;
                    }
                    eprintln!("{}: {}", name, finding);
                }
            }

            if policy_errors > 0 {
                return Err(Error::Configuration(format!(
                    "CloudProfile {} violates the deprecation policy ({} error(s))",
                    profile.name_any(),
                    policy_errors
                )));
            }
        }

        Command::Maintain {
            shoot,
            cloud_profile,
            now,
            ignore_window,
            dry_run,
        } => {
            let mut shoot: Shoot = read_yaml(&shoot)?;
            let profile: CloudProfile = read_yaml(&cloud_profile)?;
            let planner = MaintenancePlanner::new(now.unwrap_or_else(Utc::now))
                .ignore_window(ignore_window || config.maintenance.ignore_window);

            let plan = planner.plan(&shoot, &profile)?;
            info!(
                shoot = %shoot.name_any(),
                due = plan.due,
                requested = plan.requested,
                "{}",
                plan.describe()
            );

            if dry_run || config.maintenance.dry_run {
                print!("{}", serde_yaml::to_string(&plan)?);
            } else {
                if !planner.apply(&mut shoot, &plan) {
                    info!(shoot = %shoot.name_any(), "Shoot unchanged");
                }
                print!("{}", serde_yaml::to_string(&shoot)?);
            }
            plan.ensure_succeeded(&shoot.name_any())?;
        }

        Command::Docs {
            command: DocsCommand::Generate { output },
        } => {
            let output = output.unwrap_or(config.docs.output);
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output, ReferenceGenerator::with_all_kinds().render())?;
            info!(output = %output.display(), "Generated API reference");
        }

        Command::Docs {
            command: DocsCommand::Lint { pattern },
        } => {
            let pattern = pattern.unwrap_or(config.docs.lint_pattern);
            let findings = lint_files(&pattern)?;
            for finding in &findings {
                eprintln!("{}", finding);
            }
            if !findings.is_empty() {
                return Err(Error::DocsLint {
                    count: findings.len(),
                });
            }
            info!(pattern = %pattern, "API reference is clean");
        }

        Command::Serve { bind_address } => {
            let mut webhook = config.webhook;
            if let Some(addr) = bind_address {
                webhook.bind_address = addr;
            }

            info!("Starting Gardener API admission webhook");
            info!("  Version: {}", gardener_api::VERSION);
            info!("  Address: {}", webhook.bind_address);
            info!("  Cloud profiles: {}", webhook.cloud_profiles.len());

            let server = WebhookServer::new(webhook, &config.versioning)?;
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                }
                signal.cancel();
            });

            server.run(shutdown).await?;
            info!("Webhook shutdown complete");
        }
    }
    Ok(())
}

// =============================================================================
// Input
// =============================================================================

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

/// Read a manifest and determine its kind from `apiVersion` and `kind`
fn read_object(path: &Path) -> Result<(ApiKind, serde_json::Value)> {
    let object: serde_json::Value = read_yaml(path)?;
    let api_version = object.get("apiVersion").and_then(|v| v.as_str()).unwrap_or_default();
    let kind = object.get("kind").and_then(|v| v.as_str()).unwrap_or_default();
    let kind = ApiKind::from_api_version(api_version, kind)?;
    Ok((kind, object))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn", "tower_http=info", "axum=info"] {
        let directive = directive
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid log directive {}: {}", directive, e)))?;
        filter = filter.add_directive(directive);
    }

    // Logs go to stderr so command output stays parseable
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
