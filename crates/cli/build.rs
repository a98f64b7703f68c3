use std::{env, fs, path::PathBuf};

use clap::{Arg, ArgAction, Command, arg, value_parser};

fn page_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(--html <FILE> "Parse a saved page instead of fetching")
            .required(false)
            .value_parser(value_parser!(PathBuf)),
    )
    .arg(arg!(--json "Print JSON instead of text"))
    .arg(
        arg!(-o --output <FILE> "Output file (default: stdout)")
            .required(false)
            .value_parser(value_parser!(PathBuf)),
    )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = Command::new("tebeo")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Search tebeosfera.com and tag comic archives with ComicInfo.xml")
        .arg(arg!(--base_url <URL> "Site root to query").global(true).required(false))
        .arg(arg!(--timeout <SECS> "HTTP timeout in seconds").global(true).default_value("30"))
        .arg(arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").global(true).required(false))
        .arg(arg!(--delay_ms <MS> "Minimum delay between requests in milliseconds").global(true).default_value("1500"))
        .arg(arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(page_args(
            Command::new("search")
                .about("Search the catalog for issues, collections and sagas")
                .arg(Arg::new("query").value_name("QUERY").required(true).action(ArgAction::Append)),
        ))
        .subcommand(page_args(
            Command::new("series")
                .about("List the issues of a collection")
                .arg(arg!([SLUG] "Collection slug")),
        ))
        .subcommand(page_args(
            Command::new("issue")
                .about("Show the full record of one issue")
                .arg(arg!([SLUG] "Issue slug")),
        ))
        .subcommand(
            Command::new("xml")
                .about("Print the ComicInfo.xml document for one issue")
                .arg(arg!([SLUG] "Issue slug"))
                .arg(arg!(--html <FILE> "Parse a saved issue page instead of fetching").required(false))
                .arg(arg!(--no_language "Leave out the LanguageISO element"))
                .arg(arg!(-o --output <FILE> "Output file (default: stdout)").required(false)),
        )
        .subcommand(
            Command::new("inject")
                .about("Write ComicInfo.xml into a zip-based comic archive (.cbz)")
                .arg(arg!(<ARCHIVE> "Archive to tag").value_parser(value_parser!(PathBuf)))
                .arg(arg!([SLUG] "Issue slug to fetch metadata for"))
                .arg(arg!(--html <FILE> "Parse a saved issue page instead of fetching").required(false))
                .arg(arg!(--xml <FILE> "Inject an existing ComicInfo.xml document as is").required(false))
                .arg(arg!(--no_language "Leave out the LanguageISO element")),
        );

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "tebeo", &completions_dir).unwrap();
    }

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
