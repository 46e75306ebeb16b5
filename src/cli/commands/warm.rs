use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Deserialize;
use serde_json::json;

use crate::cli::{
    utils::{output_error, output_success, resolve_base_url},
    OutputFormat,
};
use crate::config::{config, WarmTarget};
use crate::warmer::warm;

#[derive(Args)]
pub struct WarmArgs {
    #[arg(long, help = "Server base URL (defaults to APIDON_BASE_URL or http://localhost:3000)")]
    pub base_url: Option<String>,

    #[arg(long, help = "YAML file listing targets (defaults to WARMER_TARGETS)")]
    pub targets: Option<PathBuf>,

    #[arg(long, env = "APIDON_TOKEN", help = "Bearer token forwarded to protected endpoints")]
    pub token: Option<String>,
}

/// ```yaml
/// targets:
///   - path: /health
///     method: GET
///   - path: /api/notifications/list
/// ```
#[derive(Debug, Deserialize)]
struct TargetsFile {
    targets: Vec<WarmTarget>,
}

pub fn load_targets(path: &PathBuf) -> anyhow::Result<Vec<WarmTarget>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: TargetsFile =
        serde_yaml::from_str(&raw).with_context(|| format!("invalid targets file {}", path.display()))?;
    Ok(file.targets)
}

pub async fn handle(args: WarmArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let base_url = resolve_base_url(args.base_url);
    let targets = match &args.targets {
        Some(path) => load_targets(path)?,
        None => config().warmer.targets.clone(),
    };

    if targets.is_empty() {
        output_error(&output_format, "No warm targets configured", Some("NO_TARGETS"))?;
        return Ok(());
    }

    let http = reqwest::Client::new();
    let report = warm(&http, &base_url, &targets, args.token.as_deref()).await;

    if report.failed.is_empty() {
        output_success(
            &output_format,
            &format!("Warmed {} endpoints on {}", report.warmed, base_url),
            Some(json!({ "warmed": report.warmed, "failed": report.failed })),
        )
    } else {
        for path in &report.failed {
            output_error(&output_format, &format!("{} did not respond", path), Some("WARM_FAILED"))?;
        }
        anyhow::bail!("{} of {} targets failed", report.failed.len(), report.failed.len() + report.warmed)
    }
}
