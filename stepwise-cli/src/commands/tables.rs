//! Tables command - list tables in the database

use anyhow::Result;

use super::{get_context, GlobalOpts};
use crate::output;

pub fn run(opts: &GlobalOpts, json: bool) -> Result<()> {
    let mut ctx = get_context(opts)?;
    let tables = ctx.runner().tables()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    if tables.is_empty() {
        output::warning("No tables found");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Root page", "SQL"]);
    for t in &tables {
        table.add_row(vec![
            t.name.clone(),
            t.rootpage.to_string(),
            t.sql.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    Ok(())
}
