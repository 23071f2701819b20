use std::sync::Arc;

use tracing::info;

use crate::args::ServeArgs;
use crate::config::types::ConfigFile;
use crate::config::{CliOverrides, process_env, resolve_settings};
use crate::control::{self, ControlState};
use crate::dispatch::Dispatcher;
use crate::error::AppResult;
use crate::shutdown::{setup_signal_shutdown_handler, shutdown_channel};
use crate::store::{ResultStore, SqliteStore};

use super::pipeline::RunContext;

/// Opens the store and serves the control surface until a shutdown signal.
pub(crate) async fn serve(args: &ServeArgs, config: Option<&ConfigFile>) -> AppResult<()> {
    let overrides = CliOverrides {
        listen: args.listen.clone(),
        db_path: args.db.clone(),
        notify_to: args.notify_to.clone(),
        health_emails: args.health_emails,
        ..CliOverrides::default()
    };
    let settings = resolve_settings(config, process_env, &overrides)?;

    let store = SqliteStore::open(&settings.db_path).await?;
    info!("Connected to database at {}", store.path().display());
    let store: Arc<dyn ResultStore> = Arc::new(store);

    let runs = RunContext::new(Dispatcher::new(&settings.client)?)
        .with_store(Arc::clone(&store))
        .with_mailer_from(&settings);
    let state = Arc::new(ControlState::new(Arc::new(runs), store, settings.health_emails));

    let listener = control::bind(&settings.listen).await?;
    info!("Control server listening on {}", listener.local_addr()?);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    control::serve(listener, state, shutdown_rx).await;
    drop(shutdown_tx.send(()));
    drop(signal_handle.await);
    info!("Control server stopped.");
    Ok(())
}
