//! Up command - apply pending migrations

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use stepwise_core::ProgressEvent;

use super::{get_context, get_runner, GlobalOpts};

pub fn run(opts: &GlobalOpts, json: bool) -> Result<()> {
    let mut ctx = get_context(opts)?;

    let bar = if json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% {msg}")?
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    };

    let reporter_bar = bar.clone();
    let result = get_runner(&mut ctx, json)
        .with_reporter(move |event: &ProgressEvent| {
            reporter_bar.set_position(u64::from(event.percent));
            match &event.migration {
                Some(name) => reporter_bar.set_message(format!("applied {}", name)),
                None => reporter_bar.set_message(event.message.clone()),
            }
        })
        .initialise();

    let outcome = match result {
        Ok(outcome) => {
            bar.finish_and_clear();
            outcome
        }
        Err(e) => {
            bar.abandon();
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.is_noop() {
        println!("{}", "Nothing to migrate".green());
    } else {
        println!(
            "{}",
            format!("Applied {} migration(s)", outcome.applied.len()).green()
        );
        for version in &outcome.applied {
            println!("  • {:03}", version);
        }
    }

    let elapsed = outcome.finished_at - outcome.started_at;
    println!(
        "Schema version: {} -> {} ({} ms)",
        outcome.initial_version,
        outcome.final_version,
        elapsed.num_milliseconds()
    );

    Ok(())
}
