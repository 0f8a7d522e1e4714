//! CLI command implementations

pub mod columns;
pub mod new;
pub mod status;
pub mod tables;
pub mod up;

use std::path::PathBuf;

use anyhow::{Context, Result};
use stepwise_core::config::Config;
use stepwise_core::{MigrationDescriptor, MigrationRunner, StepwiseContext};

use crate::output;

/// Options shared by every command
pub struct GlobalOpts {
    pub database: Option<PathBuf>,
    pub migrations_dir: Option<PathBuf>,
    pub project_dir: PathBuf,
}

/// Load configuration, applying command-line overrides
pub fn get_config(opts: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load(&opts.project_dir).with_context(|| {
        format!("Failed to load configuration from {}", opts.project_dir.display())
    })?;

    if let Some(database) = &opts.database {
        config.database = database.clone();
    }
    if let Some(dir) = &opts.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    Ok(config)
}

/// Open the configured database
pub fn get_context(opts: &GlobalOpts) -> Result<StepwiseContext> {
    let config = get_config(opts)?;
    StepwiseContext::open(config).context("Failed to initialize stepwise context")
}

/// Runner over the configured migrations directory.
///
/// A project without the directory yet has nothing to apply, so it gets an
/// empty source and a hint instead of an IO error.
pub fn get_runner(ctx: &mut StepwiseContext, quiet: bool) -> MigrationRunner<'_> {
    if ctx.config.migrations_dir.is_dir() {
        return ctx.runner();
    }

    if !quiet {
        output::warning(&format!(
            "No migrations directory at {}. Run `stepwise new <description>` to create the first migration.",
            ctx.config.migrations_dir.display()
        ));
    }
    ctx.runner_with(Vec::<MigrationDescriptor>::new())
}
