//! Periodo API Server
//!
//! Main entry point for the fiscal period lifecycle service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use periodo_api::{AppState, create_router};
use periodo_core::fiscal::{Clock, SystemClock};
use periodo_shared::{AppConfig, JwtConfig, JwtService};
use periodo_store::{DEMO_USER_ID, InMemoryPeriodStore, seed_demo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "periodo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .context("access_token_expiry_secs out of range")?,
    };
    let jwt_service = Arc::new(JwtService::new(jwt_config));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryPeriodStore::with_clock(Arc::clone(&clock)));

    if config.store.seed_demo {
        let seeded = seed_demo(&store, clock.today()).await?;
        info!(
            previous = %seeded.previous,
            current = %seeded.current,
            "Demo data loaded"
        );
        match jwt_service.generate_access_token(DEMO_USER_ID, None) {
            Ok(token) => info!(user_id = %DEMO_USER_ID, %token, "Demo access token"),
            Err(e) => warn!(error = %e, "Could not mint demo access token"),
        }
    }

    let state = AppState::new(jwt_service, store, clock);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
