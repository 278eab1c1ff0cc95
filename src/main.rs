//! Wiretrail demo client.
//!
//! Loads configuration, initializes the application context, performs the
//! two Graph calls, and shuts down.

use std::path::PathBuf;

use clap::Parser;
use uuid::Uuid;

use wiretrail::config::{load_config, AppConfig};
use wiretrail::graph::{ApiApplication, ApplicationRegistration, PermissionScope};
use wiretrail::AppContext;

#[derive(Debug, Parser)]
#[command(name = "wiretrail", version, about = "Trace Graph calls into remote append logs")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    let context = AppContext::initialize(config).await?;
    tracing::info!("wiretrail v{} starting", env!("CARGO_PKG_VERSION"));

    get_me(&context).await;
    create_application(&context).await;

    context.shutdown().await;
    Ok(())
}

async fn get_me(context: &AppContext) {
    match context.graph.get_me().await {
        Ok(user) => tracing::info!(
            display_name = user.display_name.as_deref().unwrap_or("-"),
            "Signed-in user retrieved"
        ),
        Err(e) => {
            tracing::error!("Error calling get_me");
            tracing::error!(error = %e, "Graph call failed");
        }
    }
}

async fn create_application(context: &AppContext) {
    match context.graph.create_application(&sample_registration()).await {
        Ok(app) => tracing::info!(
            app_id = app.app_id.as_deref().unwrap_or("-"),
            "Application registered"
        ),
        Err(e) => {
            tracing::error!("Error calling create_application");
            tracing::error!(error = %e, "Graph call failed");
        }
    }
}

fn sample_registration() -> ApplicationRegistration {
    ApplicationRegistration {
        display_name: "POC_WebApi4".to_string(),
        sign_in_audience: "AzureADMyOrg".to_string(),
        identifier_uris: vec!["https://localhost:8080/api4".to_string()],
        api: ApiApplication {
            oauth2_permission_scopes: vec![PermissionScope {
                id: Uuid::new_v4(),
                value: "user_impersonation".to_string(),
                kind: "User".to_string(),
                admin_consent_display_name: "display name".to_string(),
                admin_consent_description: "xxx".to_string(),
                user_consent_display_name: None,
                user_consent_description: Some("display name".to_string()),
                is_enabled: true,
            }],
        },
    }
}
