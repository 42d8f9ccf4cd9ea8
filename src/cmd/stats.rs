use clap::ArgMatches;
use indicatif::HumanBytes;
use libnip::{operation, Session};

use crate::Result;

pub fn cmd_stats(_matches: &ArgMatches, session: &Session) -> Result<()> {
    let (stats, repositories) = operation::stats(session)?;

    println!("local package database:");
    println!("\tinstalled packages: {}", stats.local_count);
    println!(
        "\tdisk space occupied: {}",
        HumanBytes(stats.local_size.max(0) as u64)
    );
    println!();
    println!("remote package database:");
    println!("\tnumber of repositories: {}", repositories.len());
    for url in &repositories {
        println!("\t\t{}", url);
    }
    println!("\tavailable packages: {}", stats.remote_count);
    println!(
        "\ttotal size of packages: {}",
        HumanBytes(stats.remote_size.max(0) as u64)
    );
    Ok(())
}
