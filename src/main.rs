//! engrave command-line entrypoint

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use engrave::{EncodeOutcome, EncodeRequest, EngraveConfig, logging};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "engrave",
    version,
    about = "Engrave page URLs into scannable SVG QR codes"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to engrave.{toml,yaml} in cwd/XDG config.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a URL into an SVG QR code
    Encode {
        /// Absolute URL to encode
        url: String,

        /// Write the SVG here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Allowed URL scheme (repeatable); overrides the configuration
        #[arg(long = "allow-scheme", value_name = "SCHEME")]
        allow_schemes: Vec<String>,

        /// Scan the rendered symbol back before accepting it
        #[arg(long)]
        verify: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = EngraveConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Encode {
            url,
            output,
            allow_schemes,
            verify,
        } => {
            if !allow_schemes.is_empty() {
                config.allowed_schemes = allow_schemes;
            }
            if verify {
                config.qr.verify = true;
            }
            encode(&config, &url, output, cli.json)
        }
    }
}

fn encode(
    config: &EngraveConfig,
    url: &str,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let request = EncodeRequest::with_schemes(url, &config.allowed_schemes);
    let image = match config.engraver().evaluate(&request) {
        EncodeOutcome::Image(image) => image,
        EncodeOutcome::Rejected(reason) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "url": url, "rejected": reason.to_string() }))?
                );
            }
            bail!("{url} was not engraved: {reason}");
        }
    };

    match output {
        Some(path) => {
            image
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(url, path = %path.display(), "Wrote QR code");
            if json {
                let summary = json!({
                    "url": url,
                    "path": path,
                    "bytes": image.as_bytes().len(),
                    "version": image.version(),
                    "modules": image.modules(),
                    "side_length": image.side_length(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("✓ QR code for {url} saved to {}", path.display());
            }
        }
        None => print!("{}", String::from_utf8_lossy(image.as_bytes())),
    }

    Ok(())
}

