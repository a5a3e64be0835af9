use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use specartifact::{
    ArtifactBuilder, ArtifactFetcher, BasicCredentials, BuildOptions, ClientOptions,
    RegistryClient, RuntimeSpec,
};

/// CLI for packaging runtime spec documents as registry artifacts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use plain HTTP instead of HTTPS
    #[arg(long)]
    plain_http: bool,

    /// Registry username for basic authentication
    #[arg(long)]
    username: Option<String>,

    /// Registry password for basic authentication
    #[arg(long, requires = "username")]
    password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an artifact from a spec file and push it to a registry
    Push {
        /// Path to the spec YAML file
        #[arg(long)]
        spec: PathBuf,

        /// Artifact reference (e.g. ghcr.io/myorg/myartifact:latest)
        #[arg(long)]
        reference: String,

        /// Description annotation for the artifact
        #[arg(long)]
        description: Option<String>,

        /// Source URL annotation for the artifact
        #[arg(long)]
        source: Option<String>,

        /// Spec version annotation (defaults to v1)
        #[arg(long)]
        spec_version: Option<String>,
    },

    /// Pull an artifact and print or write its spec document
    Pull {
        /// Artifact reference (e.g. ghcr.io/myorg/myartifact:latest)
        #[arg(long, conflicts_with_all = ["registry", "digest"])]
        reference: Option<String>,

        /// Registry URL, used together with --digest
        #[arg(long, requires = "digest")]
        registry: Option<String>,

        /// Artifact digest, used together with --registry
        #[arg(long, requires = "registry")]
        digest: Option<String>,

        /// Output file for the spec (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Structurally validate a local spec file
    Validate {
        /// Path to the spec YAML file
        spec: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let client = RegistryClient::new(ClientOptions {
        plain_http: cli.plain_http,
        credentials: match (cli.username, cli.password) {
            (Some(username), Some(password)) => Some(BasicCredentials { username, password }),
            _ => None,
        },
    });

    match cli.command {
        Commands::Push {
            spec,
            reference,
            description,
            source,
            spec_version,
        } => {
            let spec_content = std::fs::read(&spec)
                .with_context(|| format!("failed to read spec file {}", spec.display()))?;

            let parsed = RuntimeSpec::parse_yaml(&spec_content)
                .with_context(|| format!("failed to parse spec file {}", spec.display()))?;
            parsed.validate().context("spec failed validation")?;

            let mut builder = ArtifactBuilder::new(client);
            let digest = builder
                .build_and_push(
                    &spec_content,
                    &BuildOptions {
                        description,
                        source,
                        version: spec_version,
                        ..Default::default()
                    },
                    &reference,
                )
                .await
                .context("failed to build and push artifact")?;

            println!("Successfully pushed artifact to {reference}");
            println!("Digest: {digest}");
        }

        Commands::Pull {
            reference,
            registry,
            digest,
            output,
        } => {
            let fetcher = ArtifactFetcher::new(client);

            let artifact = match (reference, registry, digest) {
                (Some(reference), _, _) => {
                    println!("Pulling artifact from {reference}...");
                    fetcher.pull(&reference).await?
                }
                (None, Some(registry), Some(digest)) => {
                    println!("Pulling artifact from {registry}@{digest}...");
                    fetcher.pull_by_digest(&registry, &digest).await?
                }
                _ => anyhow::bail!("either --reference or both --registry and --digest are required"),
            };

            let spec_content = specartifact::fetcher::primary_spec_layer(&artifact)?;

            // Structural check of what came back; a pull is still usable even
            // if the document fails, so only warn.
            match RuntimeSpec::parse_yaml(&spec_content).and_then(|s| s.validate().map(|_| s)) {
                Ok(_) => {}
                Err(err) => warn!("pulled spec failed validation: {err}"),
            }

            if let Some(output) = output {
                std::fs::write(&output, &spec_content)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                println!("Spec written to {}", output.display());
            } else {
                println!("Spec content:");
                println!("{}", String::from_utf8_lossy(&spec_content));
            }
        }

        Commands::Validate { spec } => {
            let spec_content = std::fs::read(&spec)
                .with_context(|| format!("failed to read spec file {}", spec.display()))?;
            let parsed = RuntimeSpec::parse_yaml(&spec_content)
                .with_context(|| format!("failed to parse spec file {}", spec.display()))?;
            parsed.validate()?;
            println!("{} is structurally valid", spec.display());
        }
    }

    Ok(())
}
