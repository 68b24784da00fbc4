use clap::Args;
use quizwatch_core::countdown::is_last_day_of_month;
use quizwatch_core::Config;

use super::{parse_date, resolve_now, resolve_subscriptions, CliResult};

#[derive(Args)]
pub struct GateArgs {
    /// Local date to check (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<String>,
    /// Subscription id; repeatable. Defaults to the configured subscriptions
    #[arg(long = "subscription")]
    subscriptions: Vec<String>,
}

pub fn run(args: GateArgs) -> CliResult {
    let config = Config::load()?;
    let date = match args.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => resolve_now(None)?.date_naive(),
    };
    let subscriptions = resolve_subscriptions(&args.subscriptions, &config);
    let policy = config.gate_policy();

    let result = serde_json::json!({
        "date": date.to_string(),
        "last_day_of_month": is_last_day_of_month(date),
        "qualifying_day": policy.is_qualifying_day(date),
        "subscriptions": subscriptions.len(),
        "active": policy.should_activate(&subscriptions, date),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
