//! Pings a fixed list of endpoints so a cold deployment spins up its
//! handlers before real traffic arrives.

use futures::future::join_all;
use serde::Serialize;

use crate::config::{WarmMethod, WarmTarget};

/// The warmer's own route; never pinged to avoid recursion
pub const WARMER_PATH: &str = "/api/serverWarmer";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub warmed: usize,
    pub failed: Vec<String>,
}

/// Any response below 500 counts as warm: the handler was reached.
pub async fn warm(
    http: &reqwest::Client,
    base_url: &str,
    targets: &[WarmTarget],
    bearer: Option<&str>,
) -> WarmReport {
    let base = base_url.trim_end_matches('/');

    let pings = targets
        .iter()
        .filter(|target| target.path != WARMER_PATH)
        .map(|target| async move {
            let url = format!("{}{}", base, target.path);
            let mut request = match target.method {
                WarmMethod::Get => http.get(&url),
                WarmMethod::Post => http.post(&url).json(&serde_json::json!({})),
            };
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let ok = match request.send().await {
                Ok(response) if !response.status().is_server_error() => true,
                Ok(response) => {
                    tracing::warn!(%url, status = %response.status(), "warm-up ping returned server error");
                    false
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "warm-up ping failed");
                    false
                }
            };
            (target.path.clone(), ok)
        });

    let mut report = WarmReport::default();
    for (path, ok) in join_all(pings).await {
        if ok {
            report.warmed += 1;
        } else {
            report.failed.push(path);
        }
    }

    tracing::info!(warmed = report.warmed, failed = report.failed.len(), "warm-up finished");
    report
}
