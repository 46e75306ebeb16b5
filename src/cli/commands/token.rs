use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(help = "Username placed in the token subject")]
    pub username: String,

    #[arg(long, help = "Lifetime in hours (defaults to the configured expiry)")]
    pub hours: Option<u64>,
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    if security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET is not set");
    }

    let hours = args.hours.unwrap_or(security.jwt_expiry_hours);
    let claims = Claims::new(&args.username, hours);
    let token = generate_jwt(&claims, &security.jwt_secret)?;

    match output_format {
        OutputFormat::Text => println!("{}", token),
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Token issued for {}", args.username),
            Some(json!({ "token": token, "expires_at": claims.exp })),
        )?,
    }
    Ok(())
}
