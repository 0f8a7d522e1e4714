//! New command - create the next numbered migration file

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::Input;
use stepwise_core::domain::parse_version;
use stepwise_core::domain::version::MAX_VERSION;

use super::{get_config, GlobalOpts};

const TEMPLATE: &str = "\
-- stepwise:pre
-- Copy aside data that the schema change would destroy.

-- stepwise:migrate
-- Change the schema here.

-- stepwise:post
-- Restore or reshape preserved data, then clean up.

-- stepwise:seed
-- Populate data. Keep it idempotent (INSERT OR IGNORE, ...).
";

/// Turn a free-form description into a file-name friendly slug
fn slugify(description: &str) -> String {
    let mut slug = String::new();
    for ch in description.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

/// Highest version among the existing `*.sql` files, ignoring misnamed ones
fn latest_version(dir: &Path) -> Result<u32> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut latest = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        if let Some(version) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| parse_version(stem).ok())
        {
            latest = latest.max(version);
        }
    }
    Ok(latest)
}

/// File name for the migration after `latest`
fn next_file_name(slug: &str, latest: u32) -> Result<String> {
    let next = latest + 1;
    if next > MAX_VERSION {
        bail!("Migration versions are exhausted (latest is {})", latest);
    }
    Ok(format!("{}_{:03}.sql", slug, next))
}

pub fn run(opts: &GlobalOpts, description: Option<String>) -> Result<()> {
    let config = get_config(opts)?;

    let description = match description {
        Some(d) => d,
        None => Input::new()
            .with_prompt("Migration description")
            .interact_text()?,
    };

    let slug = slugify(&description);
    if slug.is_empty() {
        bail!("Description must contain at least one letter or digit");
    }

    let dir = &config.migrations_dir;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create migrations directory: {}", dir.display()))?;

    let file_name = next_file_name(&slug, latest_version(dir)?)?;
    let path = dir.join(&file_name);
    fs::write(&path, TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add people table"), "add_people_table");
        assert_eq!(slugify("  drop--legacy!! "), "drop_legacy");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_latest_version_ignores_misnamed_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("init_001.sql"), "").unwrap();
        fs::write(dir.path().join("people_004.sql"), "").unwrap();
        fs::write(dir.path().join("notes_009.txt"), "").unwrap();
        fs::write(dir.path().join("draft.sql"), "").unwrap();

        assert_eq!(latest_version(dir.path()).unwrap(), 4);
    }

    #[test]
    fn test_next_file_name() {
        assert_eq!(next_file_name("init", 0).unwrap(), "init_001.sql");
        assert_eq!(next_file_name("more", 41).unwrap(), "more_042.sql");
        assert!(next_file_name("full", 999).is_err());
    }

    #[test]
    fn test_template_is_valid_migration_body() {
        let sections = stepwise_core::adapters::SqlSections::parse("init_001", TEMPLATE).unwrap();
        assert!(sections.migrate.contains("Change the schema"));
    }
}
