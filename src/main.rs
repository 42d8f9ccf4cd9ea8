use std::fs::File;
use std::sync::Mutex;

use libnip::Session;
use tracing_subscriber::EnvFilter;

mod clap_app;
mod cmd;
mod cui;

pub type Result<T> = anyhow::Result<T>;

fn main() -> Result<()> {
    let matches = clap_app::build().get_matches();

    let verbose = matches.get_flag("verbose");
    init_logger(verbose, matches.get_one::<String>("trace"))?;

    // enter the chroot before anything touches the filesystem
    if let Some(path) = matches.get_one::<String>("chroot") {
        enter_chroot(path)?;
    }

    let session = Session::new()?;
    {
        let mut config = session.config_mut()?;
        config.flags.assume = if matches.get_flag("assume-yes") {
            Some(true)
        } else if matches.get_flag("assume-no") {
            Some(false)
        } else {
            None
        };
        config.flags.force_update = matches.get_flag("force-update");
        config.flags.force_reinstall = matches.get_flag("force-reinstall");
        config.flags.verbose = verbose;
        config.flags.download_only = matches.get_flag("download-only");
        config.flags.package_version = matches.get_flag("package-version");
    }

    match matches.subcommand() {
        Some(("list", m)) => cmd::cmd_list(m, &session),
        Some(("avail", m)) => cmd::cmd_avail(m, &session),
        Some(("install", m)) => cmd::cmd_install(m, &session),
        Some(("update", m)) => cmd::cmd_update(m, &session),
        Some(("remove", m)) => cmd::cmd_remove(m, &session),
        Some(("upgrade", m)) => cmd::cmd_upgrade(m, &session, false),
        Some(("full-upgrade", m)) => cmd::cmd_upgrade(m, &session, true),
        Some(("show-deps", m)) => cmd::cmd_show_deps(m, &session),
        Some(("show-full-deps", m)) => cmd::cmd_show_full_deps(m, &session),
        Some(("show-rev-deps", m)) => cmd::cmd_show_rev_deps(m, &session),
        Some(("keep", m)) => cmd::cmd_keep(m, &session),
        Some(("unkeep", m)) => cmd::cmd_unkeep(m, &session),
        Some(("show-keep", m)) => cmd::cmd_show_keep(m, &session),
        Some(("show-no-keep", m)) => cmd::cmd_show_no_keep(m, &session),
        Some(("search", m)) => cmd::cmd_search(m, &session),
        Some(("clean", m)) => cmd::cmd_clean(m, &session),
        Some(("autoremove", m)) => cmd::cmd_autoremove(m, &session),
        Some(("export", m)) => cmd::cmd_export(m, &session),
        Some(("import", m)) => cmd::cmd_import(m, &session),
        Some(("stats", m)) => cmd::cmd_stats(m, &session),
        _ => unreachable!(),
    }
}

/// Route tracing output to stderr, or to the trace file when one is given.
fn init_logger(verbose: bool, trace: Option<&String>) -> Result<()> {
    match trace {
        Some(path) => {
            let file = File::create(path)?;
            let filter =
                EnvFilter::try_from_env("NIP_LOG").unwrap_or_else(|_| EnvFilter::new("trace"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            let level = if verbose { "debug" } else { "warn" };
            let filter =
                EnvFilter::try_from_env("NIP_LOG").unwrap_or_else(|_| EnvFilter::new(level));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[cfg(unix)]
fn enter_chroot(path: &str) -> Result<()> {
    std::os::unix::fs::chroot(path)?;
    std::env::set_current_dir("/")?;
    Ok(())
}

#[cfg(not(unix))]
fn enter_chroot(_path: &str) -> Result<()> {
    anyhow::bail!("chroot is not supported on this platform")
}
