use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_upgrade(_matches: &ArgMatches, session: &Session, full: bool) -> Result<()> {
    let ui = cui::attach(session);
    let result = operation::upgrade(session, full);
    cui::detach(session, ui);

    result?;
    Ok(())
}
