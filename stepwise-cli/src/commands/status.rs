//! Status command - show schema version and pending migrations

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use super::{get_context, get_runner, GlobalOpts};
use crate::output;

/// JSON output structure
#[derive(Serialize)]
struct StatusOutput {
    database: String,
    migrations_dir: String,
    current_version: u32,
    blank: bool,
    tables: usize,
    pending: Vec<PendingOutput>,
}

#[derive(Serialize)]
struct PendingOutput {
    version: u32,
    name: String,
}

pub fn run(opts: &GlobalOpts, json: bool) -> Result<()> {
    let mut ctx = get_context(opts)?;
    let database = ctx.config.database.display().to_string();
    let migrations_dir = ctx.config.migrations_dir.display().to_string();

    let runner = get_runner(&mut ctx, json);
    let current_version = runner.current_version()?;
    let blank = runner.is_blank_database()?;
    let tables = runner.table_names()?.len();
    let pending: Vec<PendingOutput> = runner
        .pending()?
        .iter()
        .map(|d| PendingOutput {
            version: d.version(),
            name: d.name().to_string(),
        })
        .collect();

    if json {
        let status = StatusOutput {
            database,
            migrations_dir,
            current_version,
            blank,
            tables,
            pending,
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Database Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Database", &database]);
    table.add_row(vec!["Migrations", &migrations_dir]);
    table.add_row(vec!["Schema version", &current_version.to_string()]);
    table.add_row(vec!["Tables", &tables.to_string()]);
    println!("{}", table);
    println!();

    if blank {
        println!("{}", "Database is blank".cyan());
    }

    if pending.is_empty() {
        output::success("Up to date");
    } else {
        println!("{}", format!("{} pending migration(s)", pending.len()).bold());
        for p in &pending {
            println!("  • {:03} {}", p.version, p.name);
        }
    }

    Ok(())
}
