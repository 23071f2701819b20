use std::sync::Arc;

use crate::args::RunArgs;
use crate::config::types::ConfigFile;
use crate::config::{CliOverrides, process_env, resolve_settings};
use crate::dispatch::{Dispatcher, TestSpec};
use crate::error::AppResult;
use crate::store::SqliteStore;

use super::pipeline::{RunContext, execute_run};
use super::summary::print_summary;

/// Runs a single burst in the foreground and prints its summary.
///
/// Failed requests are reported, not returned as errors.
pub(crate) async fn run_once(args: &RunArgs, config: Option<&ConfigFile>) -> AppResult<()> {
    let overrides = CliOverrides {
        db_path: args.db.clone(),
        notify_to: args.notify_to.clone(),
        connect_timeout: args.connect_timeout,
        response_header_timeout: args.response_header_timeout,
        request_timeout: args.request_timeout,
        ..CliOverrides::default()
    };
    let settings = resolve_settings(config, process_env, &overrides)?;

    let mut ctx = RunContext::new(Dispatcher::new(&settings.client)?).with_mailer_from(&settings);
    if args.db.is_some() {
        let store = SqliteStore::open(&settings.db_path).await?;
        ctx = ctx.with_store(Arc::new(store));
    }

    let spec = TestSpec::new(args.url.as_str(), args.count.get(), args.concurrency);
    let result = execute_run(&ctx, &spec).await;
    print_summary(&spec, &result, args.json)
}
