use clap::Args;
use quizwatch_core::event::parse_timestamp;
use quizwatch_core::{compute_phase, format_remaining, CandidateEvent, Config, SelectedEvent};

use super::{resolve_now, CliResult};

#[derive(Args)]
pub struct PhaseArgs {
    /// Scheduled timestamp of the event (RFC 3339, or local if no offset)
    #[arg(long)]
    scheduled: String,
    /// Instant to evaluate at; defaults to now
    #[arg(long)]
    now: Option<String>,
}

pub fn run(args: PhaseArgs) -> CliResult {
    let config = Config::load()?;
    let window = config.window()?;
    let now = resolve_now(args.now.as_deref())?;
    let scheduled_at = parse_timestamp(&args.scheduled, now.offset())
        .ok_or_else(|| format!("invalid timestamp: {}", args.scheduled))?;

    let selected = SelectedEvent {
        event: CandidateEvent::new("cli", "cli", args.scheduled.clone()),
        scheduled_at,
    };
    let reading = compute_phase(&selected, now, &window);

    let result = serde_json::json!({
        "phase": reading.phase,
        "remaining_secs": reading.remaining_secs(),
        "remaining": format_remaining(reading.remaining),
        "opens_at": window.opens(&scheduled_at).to_rfc3339(),
        "closes_at": window.closes(&scheduled_at).to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
