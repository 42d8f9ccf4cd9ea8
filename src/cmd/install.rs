use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_install(matches: &ArgMatches, session: &Session) -> Result<()> {
    let packages: Vec<String> = matches
        .get_many::<String>("package")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    let ui = cui::attach(session);
    let result = operation::install(session, &packages);
    cui::detach(session, ui);

    result?;
    Ok(())
}
