use std::env;
use std::error::Error;

use checkout::FilesystemCheckoutProvider;
use llm_adapter::LlmClient;
use reviewer::config::ReviewConfig;
use reviewer::{PullRequestRef, run_review};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file.
    // Fails if .env file not found, not readable or invalid.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ReviewConfig::load_from_env_or_default()?;

    let base_dir = env::var("REVIEW_BASE_DIR").unwrap_or_else(|_| "base".to_string());
    let head_dir = env::var("REVIEW_HEAD_DIR").unwrap_or_else(|_| "head".to_string());
    let provider = FilesystemCheckoutProvider::new(base_dir, head_dir, config.supported_languages.clone());

    let llm = LlmClient::build(config.llm.clone());
    let pr = PullRequestRef {
        base: env::var("REVIEW_BASE_REF").unwrap_or_else(|_| "base".to_string()),
        head: env::var("REVIEW_HEAD_REF").unwrap_or_else(|_| "head".to_string()),
    };

    let output = run_review(&provider, &llm, &pr, &config).await;

    println!("status: {:?}", output.status);
    println!("{}", output.summary);
    for finding in &output.findings {
        println!(
            "[{:?}/{:?}] {}:{:?} {}",
            finding.severity, finding.category, finding.location_file, finding.location_line_start, finding.message
        );
    }

    Ok(())
}
