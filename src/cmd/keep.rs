use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

fn packages(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("package")
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

pub fn cmd_keep(matches: &ArgMatches, session: &Session) -> Result<()> {
    let args = packages(matches);

    let ui = cui::attach(session);
    let result = operation::keep(session, &args, true);
    cui::detach(session, ui);

    for full in result? {
        println!("marking {} as non auto-removable", full);
    }
    Ok(())
}

pub fn cmd_unkeep(matches: &ArgMatches, session: &Session) -> Result<()> {
    let args = packages(matches);

    let ui = cui::attach(session);
    let result = operation::keep(session, &args, false);
    cui::detach(session, ui);

    for full in result? {
        println!("marking {} as auto-removable", full);
    }
    Ok(())
}

pub fn cmd_show_keep(_matches: &ArgMatches, session: &Session) -> Result<()> {
    for pkg in operation::show_keep(session)? {
        println!("{} is marked as non auto-removable", pkg.full);
    }
    Ok(())
}

pub fn cmd_show_no_keep(_matches: &ArgMatches, session: &Session) -> Result<()> {
    for pkg in operation::show_no_keep(session)? {
        println!("{} is marked as auto-removable", pkg.full);
    }
    Ok(())
}
