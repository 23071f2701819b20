use crate::args::HistoryArgs;
use crate::config::types::ConfigFile;
use crate::config::{CliOverrides, process_env, resolve_settings};
use crate::error::AppResult;
use crate::store::{SqliteStore, StoredRun};

pub(crate) async fn show_history(args: &HistoryArgs, config: Option<&ConfigFile>) -> AppResult<()> {
    let overrides = CliOverrides {
        db_path: args.db.clone(),
        ..CliOverrides::default()
    };
    let settings = resolve_settings(config, process_env, &overrides)?;
    let store = SqliteStore::open(&settings.db_path).await?;
    let runs = store.recent(args.limit.get()).await?;

    if runs.is_empty() {
        println!("No recorded runs in {}", store.path().display());
        return Ok(());
    }
    for run in &runs {
        println!("{}", history_line(run));
    }
    Ok(())
}

pub(super) fn history_line(run: &StoredRun) -> String {
    let record = &run.record;
    format!(
        "#{} {} {} count={} concurrency={} success={} duration={}ms",
        run.id,
        record.created_at,
        record.url,
        record.count,
        record.concurrency,
        record.success_count,
        record.duration_ms
    )
}
