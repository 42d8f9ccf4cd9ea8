use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_search(matches: &ArgMatches, session: &Session) -> Result<()> {
    let query = matches
        .get_one::<String>("query")
        .cloned()
        .unwrap_or_default();

    let ui = cui::attach(session);
    let result = operation::search(session, &query);
    cui::detach(session, ui);

    let hits = result?;
    for entry in &hits {
        let status = entry.status.unwrap_or(' ');
        println!("{} {:<18} {}", status, entry.full, entry.comment);
    }
    if !hits.is_empty() {
        println!();
        println!("=: package is installed and up-to-date");
        println!("<: package is installed but newer version is available");
        println!(">: installed package has a greater version than available package");
    }
    Ok(())
}
