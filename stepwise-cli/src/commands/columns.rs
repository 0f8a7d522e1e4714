//! Columns command - list columns of a table

use anyhow::{bail, Result};

use super::{get_context, GlobalOpts};
use crate::output;

pub fn run(opts: &GlobalOpts, table_name: &str, json: bool) -> Result<()> {
    let mut ctx = get_context(opts)?;
    let columns = ctx.runner().columns(table_name)?;

    if columns.is_empty() {
        bail!("Table not found: {}", table_name);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["#", "Name", "Type", "Not null", "Default", "PK"]);
    for c in &columns {
        table.add_row(vec![
            c.cid.to_string(),
            c.name.clone(),
            c.col_type.clone(),
            if c.notnull { "yes" } else { "" }.to_string(),
            c.dflt_value.clone().unwrap_or_default(),
            if c.pk > 0 { c.pk.to_string() } else { String::new() },
        ]);
    }
    println!("{}", table);

    Ok(())
}
