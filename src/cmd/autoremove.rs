use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_autoremove(_matches: &ArgMatches, session: &Session) -> Result<()> {
    let ui = cui::attach(session);
    let result = operation::autoremove(session);
    cui::detach(session, ui);

    result?;
    Ok(())
}
