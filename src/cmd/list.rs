use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_list(matches: &ArgMatches, session: &Session) -> Result<()> {
    let limit = matches
        .get_one::<String>("limit")
        .and_then(|s| s.chars().next());

    let ui = cui::attach(session);
    let result = operation::list_local(session, limit);
    cui::detach(session, ui);

    for entry in result? {
        match entry.status {
            Some(status) => {
                let tagged = format!("{} {}", entry.full, status);
                println!("{:<20} {}", tagged, entry.comment);
            }
            None => println!("{:<20} {}", entry.full, entry.comment),
        }
    }
    Ok(())
}

pub fn cmd_avail(_matches: &ArgMatches, session: &Session) -> Result<()> {
    let ui = cui::attach(session);
    let result = operation::avail(session);
    cui::detach(session, ui);

    for entry in result? {
        println!("{:<20} {}", entry.full, entry.comment);
    }
    Ok(())
}
