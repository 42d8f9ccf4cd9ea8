use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, Command};

pub fn build() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .after_help(format!(
            "Type '{} help <command>' to get help for a specific command.",
            crate_name!()
        ))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .max_term_width(100)
        .arg(
            Arg::new("assume-yes")
                .help("Assume yes to all prompts and run non-interactively")
                .short('y')
                .long("yes")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("assume-no"),
        )
        .arg(
            Arg::new("assume-no")
                .help("Assume no to all prompts")
                .short('n')
                .long("no")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force-update")
                .help("Force the catalog refresh, ignoring stored timestamps")
                .short('f')
                .long("force-update")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force-reinstall")
                .help("Reinstall packages even when already up to date")
                .short('F')
                .long("force-reinstall")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .help("Verbose output, kept for installer subprocesses too")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("download-only")
                .help("Download packages without installing them")
                .short('d')
                .long("download-only")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("limit")
                .help("Limit list output to the status character (=, < or >)")
                .short('l')
                .long("limit")
                .global(true)
                .value_name("c"),
        )
        .arg(
            Arg::new("chroot")
                .help("Chroot to this path before operating")
                .short('c')
                .long("chroot")
                .global(true)
                .value_name("path"),
        )
        .arg(
            Arg::new("trace")
                .help("Write a trace log to this file")
                .short('t')
                .long("trace")
                .global(true)
                .value_name("file"),
        )
        .arg(
            Arg::new("package-version")
                .help("Display dependencies as resolved package names")
                .short('P')
                .long("package-version")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("list").about("List installed packages").alias("ls"))
        .subcommand(
            Command::new("avail")
                .about("List packages available in the repositories")
                .alias("av"),
        )
        .subcommand(
            Command::new("install")
                .about("Install or upgrade packages")
                .alias("in")
                .arg_required_else_help(true)
                .arg(
                    Arg::new("package")
                        .help("The package(s) to install")
                        .required(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Create and populate the package catalog")
                .alias("up"),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove packages and every package depending on them")
                .alias("rm")
                .arg_required_else_help(true)
                .arg(
                    Arg::new("package")
                        .help("The package(s) to remove")
                        .required(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("upgrade")
                .about("Upgrade keep packages to their newer versions")
                .alias("ug"),
        )
        .subcommand(
            Command::new("full-upgrade")
                .about("Upgrade all packages to their newer versions")
                .alias("fug"),
        )
        .subcommand(
            Command::new("show-deps")
                .about("Display the direct dependencies of a package")
                .alias("sd")
                .arg_required_else_help(true)
                .arg(Arg::new("package").help("The package name").required(true)),
        )
        .subcommand(
            Command::new("show-full-deps")
                .about("Display the dependencies of a package, recursively")
                .alias("sfd")
                .arg_required_else_help(true)
                .arg(Arg::new("package").help("The package name").required(true)),
        )
        .subcommand(
            Command::new("show-rev-deps")
                .about("Display the reverse dependencies of a package, recursively")
                .alias("srd")
                .arg_required_else_help(true)
                .arg(Arg::new("package").help("The package name").required(true)),
        )
        .subcommand(
            Command::new("keep")
                .about("Mark packages as non auto-removable")
                .alias("ke")
                .arg_required_else_help(true)
                .arg(
                    Arg::new("package")
                        .help("The package(s) to keep")
                        .required(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("unkeep")
                .about("Mark packages as auto-removable")
                .alias("uk")
                .arg_required_else_help(true)
                .arg(
                    Arg::new("package")
                        .help("The package(s) to unkeep")
                        .required(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("show-keep")
                .about("Display non auto-removable packages")
                .alias("sk"),
        )
        .subcommand(
            Command::new("show-no-keep")
                .about("Display auto-removable packages")
                .alias("snk"),
        )
        .subcommand(
            Command::new("search")
                .about("Search the remote catalog (regex supported)")
                .alias("se")
                .arg_required_else_help(true)
                .arg(Arg::new("query").help("The query string").required(true)),
        )
        .subcommand(
            Command::new("clean")
                .about("Clean the package cache")
                .alias("cl"),
        )
        .subcommand(
            Command::new("autoremove")
                .about("Remove orphaned dependencies")
                .alias("ar"),
        )
        .subcommand(
            Command::new("export")
                .about("Export the list of non auto-removable packages to stdout")
                .alias("ex"),
        )
        .subcommand(
            Command::new("import")
                .about("Import a package list and install it")
                .alias("im")
                .arg_required_else_help(true)
                .arg(
                    Arg::new("file")
                        .help("File(s) holding one package or PKGPATH per line")
                        .required(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Display catalog statistics")
                .alias("st"),
        )
}
