use clap::ArgMatches;
use libnip::{operation, Session};

use crate::Result;

pub fn cmd_clean(_matches: &ArgMatches, session: &Session) -> Result<()> {
    let removed = operation::clean_cache(session)?;
    println!("removed {} cached package(s)", removed);
    Ok(())
}
