use std::path::PathBuf;

pub type Fallible<T> = Result<T, Error>;

/// Error that may occur during performing operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Thrown when the user refused a confirmation prompt that gates the
    /// rest of the transaction.
    #[error("transaction aborted")]
    Aborted,

    #[error("{0}")]
    Custom(String),

    #[error("{message}")]
    Db {
        message: String,
        source: rusqlite::Error,
    },

    /// Thrown when the cache or install-prefix filesystem does not have
    /// enough room for the pending transaction.
    #[error("not enough room in {} ({needed} bytes needed)", path.display())]
    DiskSpace { path: PathBuf, needed: u64 },

    #[error("http {message}")]
    Http {
        message: String,
        source: Option<Box<ureq::Error>>,
    },

    /// Wrapped [std I/O error][1]. Thrown when doing I/O operations, such as
    /// reading or writing files or directories.
    ///
    /// [1]: std::io::Error
    #[error("{message}")]
    Io {
        message: String,
        source: std::io::Error,
    },

    /// Thrown when one of the installer subprocesses returned a nonzero exit
    /// status during the install phase. The remaining plan has already been
    /// driven to completion when this is raised.
    #[error("{0} package(s) failed to install")]
    InstallFailures(usize),

    /// Thrown when the pkg_install toolchain cannot be found or executed.
    #[error("cannot execute '{}'", .0.display())]
    InstallerNotFound(PathBuf),

    #[error("there is no available package catalog, run the update command")]
    EmptyRemoteCatalog,

    #[error("local package database is empty")]
    EmptyLocalCatalog,

    #[error("empty import list")]
    EmptyImportList,

    #[error("missing repositories, set PKG_REPOS or populate {}", .0.display())]
    MissingRepositories(PathBuf),

    /// Thrown when the installed-package database location cannot be
    /// determined from the installer toolchain.
    #[error("could not determine the installed-package database directory")]
    PkgDbDirUnknown,

    #[error("package '{0}' is not installed")]
    PackageNotInstalled(String),

    #[error("package '{0}' is not available in the repositories")]
    PackageNotAvailable(String),

    /// Thrown when an absolute-path requirement of a package scheduled for
    /// installation is missing from the filesystem.
    #[error("missing system requirements, aborting")]
    RequirementsUnmet,

    #[error("bad regular expression, {0}")]
    Regex(#[from] regex::Error),
}

pub(crate) trait Context<T> {
    fn with_context<F>(self, f: F) -> Fallible<T>
    where
        F: FnOnce() -> String;
}

impl<T> Context<T> for std::io::Result<T> {
    fn with_context<F>(self, f: F) -> Fallible<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| Error::Io {
            message: f(),
            source,
        })
    }
}

impl<T> Context<T> for Result<T, ureq::Error> {
    fn with_context<F>(self, f: F) -> Fallible<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| Error::Http {
            message: f(),
            source: Some(Box::new(source)),
        })
    }
}

impl<T> Context<T> for Result<T, rusqlite::Error> {
    fn with_context<F>(self, f: F) -> Fallible<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| Error::Db {
            message: f(),
            source,
        })
    }
}

impl From<rusqlite::Error> for Error {
    fn from(source: rusqlite::Error) -> Self {
        Error::Db {
            message: "catalog query failed".to_owned(),
            source,
        }
    }
}
