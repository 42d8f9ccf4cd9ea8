use clap::ArgMatches;
use libnip::{operation, Session};

use crate::cui;
use crate::Result;

fn package_arg(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("package")
        .cloned()
        .unwrap_or_default()
}

pub fn cmd_show_deps(matches: &ArgMatches, session: &Session) -> Result<()> {
    let arg = package_arg(matches);

    let ui = cui::attach(session);
    let result = operation::show_direct_deps(session, &arg);
    cui::detach(session, ui);

    let (full, deps) = result?;
    println!("direct dependencies for {}", full);
    for dep in deps {
        println!("\t{}", dep);
    }
    Ok(())
}

pub fn cmd_show_full_deps(matches: &ArgMatches, session: &Session) -> Result<()> {
    let arg = package_arg(matches);

    let ui = cui::attach(session);
    let result = operation::show_full_deps(session, &arg);
    cui::detach(session, ui);

    let (full, deps) = result?;
    println!("full dependency tree for {}", full);
    for dep in deps {
        println!("\t{}", dep);
    }
    Ok(())
}

pub fn cmd_show_rev_deps(matches: &ArgMatches, session: &Session) -> Result<()> {
    let arg = package_arg(matches);

    let ui = cui::attach(session);
    let result = operation::show_rev_deps(session, &arg);
    cui::detach(session, ui);

    let (full, deps) = result?;
    println!("local reverse dependency tree for {}", full);
    for dep in deps {
        println!("\t{}", dep);
    }
    Ok(())
}
