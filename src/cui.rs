//! Console frontend for the planner's event bus.
//!
//! Every operation runs with an attached event loop thread that renders
//! progress, answers prompts from stdin, and winds down when the backend
//! signals termination.

use std::io::Write;
use std::thread::JoinHandle;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use libnip::flume::Sender;
use libnip::{Event, Session, TransactionSummary};

/// Spawn the event loop for a session. Callers must pair this with
/// [`detach`] once the operation returns.
pub fn attach(session: &Session) -> JoinHandle<()> {
    let rx = session.event_bus().receiver();
    let tx = session.event_bus().sender();

    std::thread::spawn(move || {
        let mut bar: Option<(String, ProgressBar)> = None;

        while let Ok(event) = rx.recv() {
            match event {
                Event::LocalSyncStarted => println!("reading local summary..."),
                Event::LocalSyncFinished(count) => {
                    println!("processed {} local packages", count)
                }

                Event::RepoSyncStarted(url) => println!("processing {}", url),
                Event::RepoSyncUpToDate(url) => {
                    println!("database for {} is up-to-date", url)
                }
                Event::RepoSyncImported { url, packages } => {
                    println!("imported {} packages from {}", packages, url)
                }
                Event::RepoSyncFailed { url, error } => {
                    eprintln!("could not refresh {}: {}", url, error)
                }
                Event::RepoRetired(url) => {
                    println!("cleaning database from {} entries", url)
                }

                Event::ResolveStarted => println!("calculating dependencies..."),
                Event::ResolveFinished => {}

                Event::PackageNotAvailable(name) => {
                    eprintln!("{} is not available in the repositories", name)
                }
                Event::PackageNotInstalled(name) => {
                    eprintln!("{} is not installed", name)
                }
                Event::PackagePreferredMismatch { name, pin } => {
                    eprintln!("{} is preferred as {}, no candidate matches", name, pin)
                }
                Event::EmptyFileSize(name) => {
                    eprintln!("{}: empty FILE_SIZE in the catalog", name)
                }
                Event::RequirementMissing { path, needed_by } => {
                    eprintln!("{}, needed by {}, is not present", path, needed_by)
                }
                Event::RequirementSoftMissing { path, needed_by } => {
                    eprintln!("warning: {} required by {} is not provided", path, needed_by)
                }

                Event::PromptTransaction(summary) => {
                    print_transaction(&summary);
                    answer(&tx, "proceed ?", false);
                }
                Event::PromptArchMismatch { found, expected } => {
                    println!(
                        "catalog architecture is {} while this machine is {}",
                        found, expected
                    );
                    answer(&tx, "import anyway ?", false);
                }
                Event::PromptConflict {
                    package,
                    conflicting,
                } => {
                    println!("{} conflicts with installed {}", package, conflicting);
                    answer(&tx, "continue ?", false);
                }
                Event::PromptDowngrade {
                    installed,
                    candidate,
                } => {
                    println!(
                        "{} is newer than the available {}",
                        installed, candidate
                    );
                    answer(&tx, "downgrade ?", false);
                }
                Event::PromptDownloadFailed(name) => {
                    println!("{} could not be fetched", name);
                    answer(&tx, "continue without it ?", false);
                }
                Event::PromptSelfUpgrade(name) => {
                    println!("{} is the installer toolchain itself", name);
                    answer(&tx, "force-upgrade it ?", false);
                }
                Event::PromptAutoremove(packages) => {
                    println!(
                        "in order to remove packages in the keep list, use the unkeep command"
                    );
                    println!(
                        "{} package(s) to delete:\n  {}",
                        packages.len(),
                        packages.join(" ")
                    );
                    answer(&tx, "proceed ?", true);
                }
                Event::PromptResult(_) => {}

                Event::DownloadStarted { files, bytes } => {
                    if bytes > 0 {
                        println!(
                            "downloading {} file(s), {} total",
                            files,
                            HumanBytes(bytes)
                        );
                    }
                }
                Event::DownloadProgress(progress) => {
                    let stale = bar
                        .as_ref()
                        .map(|(name, _)| name != &progress.name)
                        .unwrap_or(true);
                    if stale {
                        if let Some((_, old)) = bar.take() {
                            old.finish_and_clear();
                        }
                        let pb = ProgressBar::new(progress.total);
                        pb.set_style(
                            ProgressStyle::with_template(
                                "{msg:<30} {bytes:>9}/{total_bytes:>9} {bytes_per_sec:>11} [{bar:25}]",
                            )
                            .expect("static template")
                            .progress_chars("=> "),
                        );
                        pb.set_message(progress.name.clone());
                        bar = Some((progress.name.clone(), pb));
                    }
                    if let Some((_, pb)) = bar.as_ref() {
                        pb.set_position(progress.bytes);
                    }
                }
                Event::DownloadCached(name) => {
                    println!("{} is already in the cache", name)
                }
                Event::DownloadFinished(_) => {
                    if let Some((_, pb)) = bar.take() {
                        pb.finish();
                    }
                }
                Event::DownloadAllDone => {
                    if let Some((_, pb)) = bar.take() {
                        pb.finish_and_clear();
                    }
                }

                Event::LoggingTo(path) => {
                    println!("logging subprocess errors to {}", path.display())
                }
                Event::Removing(name) => println!("removing {}...", name),
                Event::Installing(name) => println!("installing {}...", name),
                Event::NotRemoving(name) => {
                    println!("not removing {}, the installer needs it", name)
                }
                Event::InstallerFailed { package, phase } => {
                    eprintln!("{} of {} failed, see the error log", phase, package)
                }

                Event::NothingToDo => println!("nothing to do."),
                Event::SessionTerminated => break,
                _ => {}
            }
        }
    })
}

/// Flush the event queue and join the loop.
pub fn detach(session: &Session, handle: JoinHandle<()>) {
    session.event_bus().terminate();
    let _ = handle.join();
}

fn print_transaction(summary: &TransactionSummary) {
    if !summary.remove.is_empty() {
        println!(
            "{} package(s) to remove:\n  {}\n",
            summary.remove.len(),
            summary.remove.join(" ")
        );
    }
    if !summary.upgrade.is_empty() {
        println!(
            "{} package(s) to upgrade:\n  {}\n",
            summary.upgrade.len(),
            summary.upgrade.join(" ")
        );
    }
    if !summary.install.is_empty() {
        println!(
            "{} package(s) to install ({} to download, {} to install):\n  {}\n",
            summary.install.len() + summary.upgrade.len(),
            HumanBytes(summary.download_bytes),
            HumanBytes(summary.install_bytes.max(0) as u64),
            summary.install.join(" ")
        );
    }
}

/// Ask a yes/no question on the terminal and send the answer back.
fn answer(tx: &Sender<Event>, question: &str, default: bool) {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {} ", question, hint);
    let _ = std::io::stdout().flush();

    let mut input = String::new();
    let answer = match std::io::stdin().read_line(&mut input) {
        Ok(_) => match input.trim().chars().next() {
            Some('y') | Some('Y') => true,
            Some('n') | Some('N') => false,
            _ => default,
        },
        Err(_) => default,
    };

    let _ = tx.send(Event::PromptResult(answer));
}
