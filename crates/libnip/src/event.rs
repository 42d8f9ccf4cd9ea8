//! Events transmitted between the planner backend and the caller frontend.
//!
//! The core never prints or prompts. Progress is emitted as events, and
//! every interactive decision is a `Prompt*` event the frontend answers
//! with [`Event::PromptResult`] on the inbound half of the bus. Operations
//! running with assume-yes or assume-no never emit prompts at all.

use flume::{Receiver, Sender};
use std::path::PathBuf;

use crate::download::DownloadProgress;
use crate::operation::TransactionSummary;

#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Event {
    /// Reading the installed-package database into the local universe.
    LocalSyncStarted,
    LocalSyncFinished(usize),

    /// Remote catalog refresh, one sequence per repository.
    RepoSyncStarted(String),
    RepoSyncUpToDate(String),
    RepoSyncImported { url: String, packages: usize },
    RepoSyncFailed { url: String, error: String },
    /// A repository present in the catalog but no longer configured had its
    /// rows cascaded away.
    RepoRetired(String),

    /// Dependency resolution progress.
    ResolveStarted,
    ResolveFinished,

    /// A requested or depended-upon package has no installation candidate.
    PackageNotAvailable(String),
    /// A package named on the command line is not installed.
    PackageNotInstalled(String),
    /// Candidates exist but every one of them is rejected by a pin.
    PackagePreferredMismatch { name: String, pin: String },
    /// The catalog advertises a zero FILE_SIZE for this package.
    EmptyFileSize(String),
    /// A prefix-internal requirement is not satisfied by any PROVIDES.
    RequirementSoftMissing { path: String, needed_by: String },
    /// An absolute-path requirement is missing from the filesystem.
    RequirementMissing { path: String, needed_by: String },

    /// The computed transaction, awaiting confirmation.
    PromptTransaction(TransactionSummary),
    /// The remote catalog was built for a different machine architecture.
    PromptArchMismatch { found: String, expected: String },
    /// Installing `package` conflicts with the installed `conflicting`.
    PromptConflict { package: String, conflicting: String },
    /// The only remote candidate is older than the installed package.
    PromptDowngrade { installed: String, candidate: String },
    /// An archive could not be fetched; continuing skips the package.
    PromptDownloadFailed(String),
    /// The installer toolchain itself is part of the upgrade.
    PromptSelfUpgrade(String),
    /// Orphans were found, removal awaits confirmation.
    PromptAutoremove(Vec<String>),
    /// Frontend answer to the most recent prompt event.
    PromptResult(bool),

    DownloadStarted { files: usize, bytes: u64 },
    DownloadProgress(DownloadProgress),
    DownloadCached(String),
    DownloadFinished(String),
    DownloadAllDone,

    /// Subprocess stderr is being appended to this log file.
    LoggingTo(PathBuf),
    Removing(String),
    Installing(String),
    /// The installer toolchain refuses to delete itself.
    NotRemoving(String),
    /// One installer subprocess exited nonzero.
    InstallerFailed { package: String, phase: &'static str },

    /// Nothing to do for the requested operation.
    NothingToDo,

    /// The frontend event loop may shut down.
    SessionTerminated,
}

/// Full duplex channel pair for event transmission back and forth.
#[derive(Debug)]
pub struct EventBus {
    outbound_tx: Sender<Event>,
    outbound_rx: Receiver<Event>,
    inbound_tx: Sender<Event>,
    inbound_rx: Receiver<Event>,
}

impl EventBus {
    pub fn new() -> EventBus {
        let (outbound_tx, outbound_rx) = flume::unbounded();
        let (inbound_tx, inbound_rx) = flume::unbounded();
        EventBus {
            outbound_tx,
            outbound_rx,
            inbound_tx,
            inbound_rx,
        }
    }

    /// Receiver end for the frontend to consume backend events.
    pub fn receiver(&self) -> Receiver<Event> {
        self.outbound_rx.clone()
    }

    /// Sender end for the frontend to answer prompts.
    pub fn sender(&self) -> Sender<Event> {
        self.inbound_tx.clone()
    }

    /// Backend side: emit an event to the frontend.
    pub(crate) fn inner_sender(&self) -> Sender<Event> {
        self.outbound_tx.clone()
    }

    /// Tell the frontend event loop to wind down once the queue drains.
    pub fn terminate(&self) {
        let _ = self.outbound_tx.send(Event::SessionTerminated);
    }

    /// Backend side: receive prompt answers from the frontend.
    pub(crate) fn inner_receiver(&self) -> Receiver<Event> {
        self.inbound_rx.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
