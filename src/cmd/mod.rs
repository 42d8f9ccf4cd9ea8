mod autoremove;
mod clean;
mod install;
mod keep;
mod list;
mod remove;
mod search;
mod selection;
mod show;
mod stats;
mod update;
mod upgrade;

pub use autoremove::cmd_autoremove;
pub use clean::cmd_clean;
pub use install::cmd_install;
pub use keep::{cmd_keep, cmd_show_keep, cmd_show_no_keep, cmd_unkeep};
pub use list::{cmd_avail, cmd_list};
pub use remove::cmd_remove;
pub use search::cmd_search;
pub use selection::{cmd_export, cmd_import};
pub use show::{cmd_show_deps, cmd_show_full_deps, cmd_show_rev_deps};
pub use stats::cmd_stats;
pub use update::cmd_update;
pub use upgrade::cmd_upgrade;
