use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use quizwatch_core::{Config, EventSelector, StaticEventFetcher};

use super::{parse_date, parse_offset, resolve_now, resolve_subscriptions, runtime, CliResult};

#[derive(Args)]
pub struct SelectArgs {
    /// JSON file mapping subscription id to an array of quiz records
    #[arg(long)]
    events: PathBuf,
    /// Local date to select for (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<String>,
    /// UTC offset the date is read in (e.g. "+05:30"); defaults to local
    #[arg(long)]
    offset: Option<String>,
    /// Subscription id; repeatable. Defaults to the configured
    /// subscriptions, then to every subscription in the file
    #[arg(long = "subscription")]
    subscriptions: Vec<String>,
}

pub fn run(args: SelectArgs) -> CliResult {
    let config = Config::load()?;
    let fetcher = StaticEventFetcher::from_json_file(&args.events)?;
    let now = resolve_now(None)?;
    let offset = match args.offset.as_deref() {
        Some(raw) => parse_offset(raw)?,
        None => *now.offset(),
    };
    let date = match args.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => now.with_timezone(&offset).date_naive(),
    };

    let mut subscriptions = resolve_subscriptions(&args.subscriptions, &config);
    if subscriptions.is_empty() {
        subscriptions = fetcher.subscriptions();
    }

    let selector = EventSelector::new(Arc::new(fetcher));
    let selection = runtime()?.block_on(selector.select_for_day(&subscriptions, date, &offset));

    let result = serde_json::json!({
        "date": date.to_string(),
        "selected": selection.selected,
        "failures": selection.failures,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
