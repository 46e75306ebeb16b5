use clap::Args;
use serde_json::Value;

use crate::cli::{
    utils::{output_error, output_success, resolve_base_url},
    OutputFormat,
};

#[derive(Args)]
pub struct HealthArgs {
    #[arg(long, help = "Server base URL (defaults to APIDON_BASE_URL or http://localhost:3000)")]
    pub base_url: Option<String>,
}

pub async fn handle(args: HealthArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let base_url = resolve_base_url(args.base_url);
    let url = format!("{}/health", base_url);

    let response = match reqwest::get(&url).await {
        Ok(response) => response,
        Err(e) => {
            output_error(&output_format, &format!("{} is unreachable: {}", base_url, e), Some("UNREACHABLE"))?;
            anyhow::bail!("server unreachable");
        }
    };

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        output_success(&output_format, &format!("{} is healthy", base_url), Some(body))
    } else {
        output_error(
            &output_format,
            &format!("{} is unhealthy (HTTP {})", base_url, status.as_u16()),
            Some("UNHEALTHY"),
        )?;
        anyhow::bail!("server unhealthy")
    }
}
