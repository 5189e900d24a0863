use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Options shared by every `hashtag` subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    pub data_shards: usize,
    pub parity_shards: usize,
    /// 0 leaves the rayon default in place
    pub threads: usize,
    pub quiet: bool,
}

impl CodecOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            data_shards: matches.get_one::<usize>("data").copied().unwrap_or(5),
            parity_shards: matches.get_one::<usize>("par").copied().unwrap_or(2),
            threads: matches.get_one::<usize>("threads").copied().unwrap_or(0),
            quiet: matches.get_flag("quiet"),
        }
    }
}

fn codec_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("data")
                .short('k')
                .long("data")
                .help("Number of data shards")
                .value_name("K")
                .value_parser(value_parser!(usize))
                .default_value("5"),
        )
        .arg(
            Arg::new("par")
                .short('m')
                .long("par")
                .help("Number of parity shards")
                .value_name("M")
                .value_parser(value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of CPU threads for computation (0 = auto-detect)")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Quiet mode - minimal output")
                .action(ArgAction::SetTrue),
        )
}

pub fn build_cli() -> Command {
    Command::new("hashtag")
        .version(env!("CARGO_PKG_VERSION"))
        .about("HashTag erasure coding: split files into shards and rebuild them")
        .arg_required_else_help(true)
        .subcommand(codec_args(
            Command::new("split")
                .visible_alias("s")
                .about("Split a file into data and parity shards")
                .arg(
                    Arg::new("file")
                        .help("File to encode")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .index(1),
                ),
        ))
        .subcommand(codec_args(
            Command::new("decode")
                .visible_alias("d")
                .about("Repair missing shards and reassemble the original file")
                .arg(
                    Arg::new("basefile")
                        .help("Original file name the shards were written for")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .index(1),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("Output file (default: <name>_Reconstructed.<ext>)")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf)),
                ),
        ))
}

pub fn parse_args() -> ArgMatches {
    build_cli().get_matches()
}
