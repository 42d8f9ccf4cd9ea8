use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_remove(matches: &ArgMatches, session: &Session) -> Result<()> {
    let packages: Vec<String> = matches
        .get_many::<String>("package")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    let ui = cui::attach(session);
    let result = operation::remove(session, &packages);
    cui::detach(session, ui);

    result?;
    Ok(())
}
