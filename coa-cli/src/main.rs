//! COA CLI
//!
//! Command-line interface for the certificate resolution pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coa_core::types::{MediaPayload, NetworkConfig, ResolvedCertificate, RpcEndpoint};
use coa_gateway::GatewayClient;
use coa_resolver::CertificateResolver;
use coa_rpc::ManagerRegistry;

/// COA - certificate resolution pipeline
#[derive(Parser)]
#[command(name = "coa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Network {
    Mainnet,
    Testnet,
}

/// Options shared by the commands that talk to a chain.
#[derive(clap::Args)]
struct NetworkArgs {
    /// Which network preset to use
    #[arg(long, value_enum, default_value = "mainnet")]
    network: Network,

    /// Certificate contract address
    #[arg(long, env = "COA_CONTRACT_ADDRESS")]
    contract: String,

    /// Override the preset RPC endpoints with a single URL
    #[arg(long, env = "COA_RPC_URL")]
    rpc_url: Option<String>,

    /// Static metadata fallback base URL
    #[arg(long, env = "COA_METADATA_BASE_URL")]
    metadata_base_url: Option<String>,
}

impl NetworkArgs {
    fn config(&self) -> NetworkConfig {
        let mut config = match self.network {
            Network::Mainnet => NetworkConfig::mainnet(&self.contract),
            Network::Testnet => NetworkConfig::testnet(&self.contract),
        };
        if let Some(url) = &self.rpc_url {
            config = config.with_endpoints(vec![RpcEndpoint::new(url, 1, "Override")]);
        }
        if let Some(base) = &self.metadata_base_url {
            config = config.with_metadata_base_url(base);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a certificate identifier or token id to its metadata
    Resolve {
        /// Certificate identifier (e.g. b0229100) or numeric token id
        identifier: String,

        /// Password for protected certificates
        #[arg(short, long)]
        password: Option<String>,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Print the raw token URI stored on chain for a token id
    TokenUri {
        /// Numeric token id
        token_id: u64,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Probe the configured RPC endpoints and print their health
    Health {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Fetch a certificate image by URI or content-address reference
    Image {
        /// Image URI (ipfs://... or plain URL)
        uri: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Password when the image is encrypted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Decrypt an encrypted payload file
    Decrypt {
        /// Input file (packed envelope)
        input: PathBuf,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt a file into the envelope format (issuer-side)
    Seal {
        /// Input file (plaintext)
        input: PathBuf,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Resolve {
            identifier,
            password,
            network,
        } => cmd_resolve(&identifier, password.as_deref(), &network).await,
        Commands::TokenUri { token_id, network } => cmd_token_uri(token_id, &network).await,
        Commands::Health { network } => cmd_health(&network).await,
        Commands::Image {
            uri,
            output,
            password,
        } => cmd_image(&uri, &output, password.as_deref()).await,
        Commands::Decrypt {
            input,
            password,
            output,
        } => cmd_decrypt(&input, &password, output.as_deref()),
        Commands::Seal {
            input,
            password,
            output,
        } => cmd_seal(&input, &password, &output),
    }
}

/// Resolve a certificate and print it.
async fn cmd_resolve(
    identifier: &str,
    password: Option<&str>,
    network: &NetworkArgs,
) -> Result<()> {
    let config = network.config();
    println!(
        "{} {} on {}",
        "🔎 Resolving".cyan().bold(),
        identifier,
        config.name
    );

    let registry = ManagerRegistry::new();
    let resolver = CertificateResolver::new(config, &registry)?;

    let outcome = resolver.resolve_with_password(identifier, password).await;
    registry.shutdown().await;

    let cert = outcome.with_context(|| format!("could not resolve '{identifier}'"))?;
    print_certificate(&cert);

    if cert.requires_password && password.is_none() {
        println!(
            "\n{}",
            "🔒 This certificate is password-protected. Re-run with --password to unlock it."
                .yellow()
        );
    }

    Ok(())
}

fn print_certificate(cert: &ResolvedCertificate) {
    println!();
    if let Some(name) = &cert.metadata.name {
        println!("{}", name.green().bold());
    }
    if let Some(description) = &cert.metadata.description {
        println!("{description}");
    }
    println!();
    println!("  {:<18} {}", "Token ID".dimmed(), cert.token_id);
    println!("  {:<18} {}", "Token URI".dimmed(), cert.token_uri);
    println!("  {:<18} {}", "Resolved via".dimmed(), cert.provenance);
    if let Some(mint_date) = &cert.metadata.mint_date {
        // Issuers write RFC 3339 timestamps; show just the date when they do
        let display = chrono::DateTime::parse_from_rfc3339(mint_date)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| mint_date.clone());
        println!("  {:<18} {}", "Mint date".dimmed(), display);
    }
    if let Some(contract) = &cert.metadata.contract_address {
        println!("  {:<18} {}", "Contract".dimmed(), contract);
    }

    if !cert.metadata.attributes.is_empty() {
        println!("\n{}", "Attributes:".bold());
        for attr in &cert.metadata.attributes {
            let value = attr
                .value_text()
                .map(str::to_string)
                .unwrap_or_else(|| attr.value.to_string());
            println!("  {:<18} {}", attr.trait_type.dimmed(), value);
        }
    }

    if let Some(url) = &cert.metadata.verification_url {
        println!("\n{} {}", "Verify:".bold(), url);
    }
}

/// Print the on-chain token URI.
async fn cmd_token_uri(token_id: u64, network: &NetworkArgs) -> Result<()> {
    let registry = ManagerRegistry::new();
    let manager = registry.manager_for(&network.config())?;

    let outcome = manager.query_token_uri(token_id).await;
    registry.shutdown().await;

    println!("{}", outcome?);
    Ok(())
}

/// Probe every endpoint and print the sweep.
async fn cmd_health(network: &NetworkArgs) -> Result<()> {
    let config = network.config();
    println!("{} {}", "🏥 Probing endpoints on".cyan().bold(), config.name);

    let registry = ManagerRegistry::new();
    let manager = registry.manager_for(&config)?;

    let healthy = manager.probe_all().await;
    let stats = manager.stats();
    registry.shutdown().await;

    println!();
    for endpoint in &stats {
        let state = if endpoint.healthy {
            let ms = endpoint
                .response_time_ms
                .map(|ms| format!("{ms}ms"))
                .unwrap_or_else(|| "-".into());
            format!("✅ {ms}").green()
        } else {
            "❌ down".red()
        };
        println!("  {:<28} {}", endpoint.label, state);
    }
    println!(
        "\n{} {}/{} endpoints healthy",
        "📊".bold(),
        healthy,
        stats.len()
    );

    Ok(())
}

/// Fetch (and if needed decrypt) a certificate image.
async fn cmd_image(uri: &str, output: &PathBuf, password: Option<&str>) -> Result<()> {
    let client = GatewayClient::new();
    let payload = client.fetch_media(uri).await?;

    let bytes = match payload {
        MediaPayload::Bytes(bytes) => bytes,
        MediaPayload::Encrypted(bytes) => {
            let password = password
                .context("image is encrypted; supply --password to decrypt it")?;
            coa_crypto::decrypt_image(&bytes, password)?.bytes
        }
    };

    std::fs::write(output, &bytes)
        .with_context(|| format!("could not write {}", output.display()))?;
    println!(
        "{} {} ({} bytes)",
        "✅ Image saved to".green(),
        output.display(),
        bytes.len()
    );
    Ok(())
}

/// Decrypt an envelope file.
fn cmd_decrypt(input: &PathBuf, password: &str, output: Option<&std::path::Path>) -> Result<()> {
    let sealed =
        std::fs::read(input).with_context(|| format!("could not read {}", input.display()))?;

    if !coa_crypto::is_encrypted(&sealed) {
        println!(
            "{}",
            "⚠️  Input does not look like an encrypted envelope; attempting anyway".yellow()
        );
    }

    let plaintext = coa_crypto::decrypt(&sealed, password)?;

    match output {
        Some(path) => {
            std::fs::write(path, &plaintext)
                .with_context(|| format!("could not write {}", path.display()))?;
            println!("{} {}", "✅ Decrypted to".green(), path.display());
        }
        None => {
            let text = String::from_utf8_lossy(&plaintext);
            println!("{text}");
        }
    }
    Ok(())
}

/// Pack a plaintext file into the envelope format.
fn cmd_seal(input: &PathBuf, password: &str, output: &PathBuf) -> Result<()> {
    let plaintext =
        std::fs::read(input).with_context(|| format!("could not read {}", input.display()))?;

    let sealed = coa_crypto::seal(&plaintext, password)?;

    std::fs::write(output, &sealed)
        .with_context(|| format!("could not write {}", output.display()))?;
    println!(
        "{} {} ({} bytes)",
        "✅ Sealed to".green(),
        output.display(),
        sealed.len()
    );
    Ok(())
}
