use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use image_proxy::config::EndpointConfig;
use image_proxy::proxy::LocalUrls;
use image_proxy::ImageRole;

#[derive(Parser)]
#[command(name = "image-proxy-cli")]
#[command(about = "Management CLI for the image proxy", long_about = None)]
struct Cli {
    /// Public base URL of the proxy.
    #[arg(short, long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Image endpoint path relative to the base URL.
    #[arg(short, long, default_value = "/Image")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy status
    Health,
    /// Print the proxy-local URL for a source image
    Wrap {
        url: String,
        /// Image role (cover, backdrop, thumb, banner, logo, art)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },
    /// Fetch an image through the proxy and save it
    Fetch {
        url: String,
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let urls = LocalUrls::new(&cli.base_url, &cli.endpoint)?;
    let client = reqwest::Client::builder()
        .user_agent(EndpointConfig::default().user_agent)
        .build()?;

    match cli.command {
        Commands::Health => {
            let res = client
                .get(format!("{}/health", cli.base_url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Wrap { url, kind } => {
            let role = ImageRole::parse_or_default(kind.as_deref());
            println!("{}", urls.local_url(&url, role, true));
        }
        Commands::Fetch { url, kind, output } => {
            let role = ImageRole::parse_or_default(kind.as_deref());
            let target = urls.local_url(&url, role, true);
            let res = client.get(&target).send().await?;

            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: proxy returned status {}", status);
                if let Ok(text) = res.text().await {
                    eprintln!("Response: {}", text);
                }
                std::process::exit(1);
            }

            let content_type = res
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            let body = res.bytes().await?;
            tokio::fs::write(&output, &body).await?;
            println!(
                "Saved {} bytes ({}) to {}",
                body.len(),
                content_type,
                output.display()
            );
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
