mod config;
mod error;
mod gateway;
mod models;
mod poll;
mod services;
mod store;
mod token;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::{AuthService, OrderService, ProfileService};
use crate::store::{OrderStore, SessionStore};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::ApiConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let tokens = Arc::new(token::TokenStore::new(config.token_file.clone()));
    let gateway = Arc::new(gateway::Gateway::new(config.clone(), tokens.clone())?);

    let auth = AuthService::new(gateway.clone(), tokens.clone());
    let profiles = ProfileService::new(gateway.clone());
    let orders = OrderService::new(gateway);

    let session = Arc::new(SessionStore::new(auth, profiles.clone(), tokens));
    let order_store = Arc::new(OrderStore::new(orders, profiles));

    session.initialize().await;

    if !session.is_authenticated() {
        let (Some(email), Some(password)) =
            (config.courier_email.clone(), config.courier_password.clone())
        else {
            return Err(error::AppError::Config(
                "no stored session; set COURIER_EMAIL and COURIER_PASSWORD to log in".to_string(),
            ));
        };

        if !session.login(&email, &password).await {
            let reason = session
                .error()
                .unwrap_or_else(|| "no error reported".to_string());
            return Err(error::AppError::Auth(reason));
        }
    }

    if let Some(user) = session.user() {
        tracing::info!(
            courier_id = %user.id,
            availability = %user.availability,
            "courier online"
        );
    }

    order_store.refresh_all().await;
    tracing::info!(
        pending = order_store.pending().len(),
        assigned = order_store.assigned().len(),
        "initial order snapshot"
    );

    tokio::spawn(poll::run_order_refresh(
        order_store.clone(),
        config.refresh_interval,
    ));

    // Device GPS is out of scope; the loop runs against a stub source until a
    // real one is wired in.
    tokio::spawn(poll::run_location_tracking(
        session.clone(),
        || None,
        config.tracking_interval,
    ));

    shutdown_signal().await;
    tracing::info!("shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
