//! # nexa-sim
//!
//! Headless driver for the Nexa CRM data layer.
//!
//! Opens the on-disk store (seeding it on first run), logs in, prints the
//! dashboard figures, then keeps the busiest visible conversation selected so
//! the inbound simulator runs until Ctrl+C. Every notification is logged.

mod config;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nexa_client::{AppState, ClientSettings};
use nexa_shared::constants::APP_NAME;
use nexa_shared::types::ConversationStatus;
use nexa_store::{Database, Storage};

use crate::config::SimConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nexa_client=debug,nexa_store=info")),
        )
        .init();

    info!("Starting {} simulator v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration and open the store
    // -----------------------------------------------------------------------
    let config = SimConfig::from_env();
    info!(?config, "Loaded configuration");

    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Opened store");

    let settings = ClientSettings {
        simulator: config.simulator.clone(),
        ..ClientSettings::default()
    };
    let app = AppState::new(Storage::sqlite(db), settings);

    // -----------------------------------------------------------------------
    // 3. Log every notification
    // -----------------------------------------------------------------------
    let mut notifications = app.notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(n) => info!(kind = ?n.kind, "{}", n.text),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Notification log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // -----------------------------------------------------------------------
    // 4. Initialize, log in, report
    // -----------------------------------------------------------------------
    app.initialize()?;
    let user = app.login(&config.login_email, "")?;

    let summary = app.dashboard();
    info!(
        user = %user.name,
        role = ?user.role,
        conversations = summary.total_conversations,
        unread = summary.unread_messages,
        pending_tasks = summary.pending_tasks,
        pipeline = %summary.total_deal_value,
        "Dashboard"
    );

    // -----------------------------------------------------------------------
    // 5. Select a conversation and run until Ctrl+C
    // -----------------------------------------------------------------------
    let visible = app.conversations.conversations();
    let target = visible
        .iter()
        .filter(|c| c.status == ConversationStatus::Active)
        .max_by_key(|c| c.unread_count)
        .or_else(|| visible.first());

    let Some(target) = target else {
        warn!(user = %user.name, "No visible conversations, nothing to simulate");
        return Ok(());
    };
    info!(contact = %target.contact_name, conversation_id = %target.id, "Watching conversation");
    app.conversations.select_conversation(Some(&target.id));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    app.shutdown();

    Ok(())
}
