//! Migration versions derived from identifying names
//!
//! A migration's name must end in three decimal digits (`Migration001`,
//! `201_add_people`). Those digits are its version and the only thing used to
//! order it against other migrations.

use std::sync::OnceLock;

use regex::Regex;

use super::result::{Error, Result};

/// Number of trailing digits that carry the version
pub const VERSION_DIGITS: usize = 3;

/// Highest version expressible with three digits
pub const MAX_VERSION: u32 = 999;

fn version_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]{3})$").expect("static regex is valid"))
}

/// Parse the version encoded in the last three characters of `name`.
///
/// Fails with a configuration error instead of falling back to 0: a
/// migration without a usable version can't be ordered.
pub fn parse_version(name: &str) -> Result<u32> {
    let digits = version_suffix()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            Error::configuration(format!(
                "Migration {} does not have a valid version number as the last {} characters",
                name, VERSION_DIGITS
            ))
        })?;

    // Three ASCII digits always fit in a u32
    let version: u32 = digits
        .as_str()
        .parse()
        .map_err(|_| Error::configuration(format!("Migration {} has an unparseable version", name)))?;

    if version == 0 {
        return Err(Error::configuration(format!(
            "Migration {} uses version 000, which is reserved for unmigrated databases",
            name
        )));
    }

    Ok(version)
}
