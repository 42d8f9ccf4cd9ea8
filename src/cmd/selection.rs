use std::path::Path;

use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

pub fn cmd_export(_matches: &ArgMatches, session: &Session) -> Result<()> {
    for pkgpath in operation::export_keep(session)? {
        println!("{}", pkgpath);
    }
    Ok(())
}

pub fn cmd_import(matches: &ArgMatches, session: &Session) -> Result<()> {
    let files: Vec<String> = matches
        .get_many::<String>("file")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    let ui = cui::attach(session);
    let mut result = Ok(());
    for file in &files {
        result = operation::import_keep(session, Path::new(file));
        if result.is_err() {
            break;
        }
    }
    cui::detach(session, ui);

    result?;
    Ok(())
}
