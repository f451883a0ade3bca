use clap::{App, AppSettings, Arg, SubCommand};
use electa::{Config, Datatype, GroupParameters};
use log::LevelFilter;
use num_enum::TryFromPrimitive;

mod command_e2e;
mod command_inspect;
mod command_keygen;
mod command_params;
mod command_verify;

use command_e2e::command_e2e;
use command_inspect::command_inspect;
use command_keygen::command_keygen;
use command_params::command_params;
use command_verify::command_verify_ballot;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Silent => LevelFilter::Off,
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

fn main() {
    let group_arg = Arg::with_name("group")
        .long("group")
        .takes_value(true)
        .possible_values(&["default", "rfc3526", "testing"])
        .help("Group parameters to use - defaults to ELECTA_GROUP or the 2048-bit election group");

    let matches = App::new("Electa CLI")
        .version("0.1")
        .about("Works with electa elections, keys and ballots")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .global(true)
                .help("Silence all log output"),
        )
        .subcommand(
            SubCommand::with_name("params")
                .about("Print group parameters")
                .arg(group_arg.clone())
                .arg(
                    Arg::with_name("validate")
                        .long("validate")
                        .help("Check the parameters before printing them"),
                ),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate a trustee key share with its proof of possession")
                .arg(group_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("inspect")
                .about("Decode a tagged record and print it as JSON")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Record file in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("upgrade")
                        .long("upgrade")
                        .help("Convert legacy records to their current form"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify-ballot")
                .about("Verify an encrypted vote against an election")
                .arg(
                    Arg::with_name("ELECTION")
                        .index(1)
                        .required(true)
                        .help("Election record in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("VOTE")
                        .index(2)
                        .required(true)
                        .help("Encrypted vote record in JSON or CBOR format"),
                ),
        )
        .subcommand(
            SubCommand::with_name("e2e")
                .about("Run a complete election in memory and print the result")
                .arg(group_arg)
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("10")
                        .help("Number of voters casting a random ballot"),
                )
                .arg(
                    Arg::with_name("trustees")
                        .long("trustees")
                        .takes_value(true)
                        .default_value("2")
                        .help("Number of trustees in addition to the platform trustee"),
                )
                .arg(
                    Arg::with_name("answers")
                        .long("answers")
                        .takes_value(true)
                        .default_value("Alice,Bob,Carol")
                        .help("Comma separated answers to the single question"),
                ),
        )
        .get_matches();

    let verbosity = if matches.is_present("quiet") {
        Verbosity::Silent
    } else {
        let level = 2 + matches.occurrences_of("v").min(2);
        Verbosity::try_from_primitive(level as u8).unwrap_or(Verbosity::Debug)
    };

    env_logger::Builder::new()
        .filter_level(verbosity.into())
        .parse_default_env()
        .init();

    // Subcommands
    match matches.subcommand() {
        ("params", Some(matches)) => command_params(matches),
        ("keygen", Some(matches)) => command_keygen(matches),
        ("inspect", Some(matches)) => command_inspect(matches),
        ("verify-ballot", Some(matches)) => command_verify_ballot(matches),
        ("e2e", Some(matches)) => command_e2e(matches),
        _ => {}
    }
}

/// Expand `~` and environment variables in an argument
pub fn expand(input: &str) -> String {
    match shellexpand::full(input) {
        Ok(expanded) => expanded.to_string(),
        Err(e) => {
            eprintln!("electa: unable to expand {}: {}", input, e);
            std::process::exit(1);
        }
    }
}

/// Configuration from the environment, with the group overridden by `--group`
pub fn config(matches: &clap::ArgMatches) -> Config {
    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    if let Some(group) = matches.value_of("group") {
        config.params = match group {
            "rfc3526" => GroupParameters::rfc3526_2048(),
            "testing" => GroupParameters::testing(),
            _ => GroupParameters::default(),
        };
    }
    config
}

/// Read a tagged record from a JSON or CBOR file
pub fn read_datatype(command: &str, filename: &str) -> Datatype {
    use content_inspector::ContentType;

    let filename = expand(filename);
    let file_bytes = match std::fs::read(&filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("electa {}: unable to read {}: {}", command, filename, e);
            std::process::exit(1);
        }
    };

    let record = match content_inspector::inspect(&file_bytes) {
        ContentType::UTF_8 => Datatype::from_json(&String::from_utf8_lossy(&file_bytes)),
        ContentType::BINARY => Datatype::from_bytes(&file_bytes),
        _ => {
            eprintln!("electa {}: invalid file format for {}", command, filename);
            std::process::exit(1);
        }
    };

    record.unwrap_or_else(|e| {
        eprintln!("electa {}: unable to decode {}: {}", command, filename, e);
        std::process::exit(1);
    })
}
