//! Document the command line interface
use std::collections::HashMap;
use std::env;
use std::error;
use std::fmt;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use log::debug;
use structopt::StructOpt;

use crate::commands::check;
use crate::ParserOptions;

#[derive(Debug, StructOpt)]
enum Command {
    /// Parse a journal and report every problem found
    Check(CommonOpts),
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Plain text accounting journal checker",
version = env ! ("CARGO_PKG_VERSION"),
author = env ! ("CARGO_PKG_AUTHORS"),
name = "tally"
)]
struct Opt {
    #[structopt(subcommand)]
    cmd: Command,
}

/// Command line options
#[derive(Debug, StructOpt, Clone)]
pub struct CommonOpts {
    /// Input file
    #[structopt(name = "FILE", short = "f", long = "file", parse(from_os_str))]
    pub input_file: PathBuf,

    // Both init file flags are acted on in `init_paths`, before the arguments are parsed
    /// Ignore init file if it exists
    #[allow(dead_code)]
    #[structopt(long = "args-only")]
    args_only: bool,

    /// Init file
    #[allow(dead_code)]
    #[structopt(long = "init-file", parse(from_os_str))]
    init_file: Option<PathBuf>,

    /// Report every bad transaction rather than stopping at the first one
    #[structopt(long = "keep-going")]
    pub keep_going: bool,

    /// Parse included files one after the other
    #[structopt(long = "sequential")]
    pub sequential: bool,

    /// Transactions buffered between the parser and the report
    #[structopt(long = "channel-capacity", default_value = "100")]
    pub channel_capacity: usize,

    /// Print the transactions as they are understood
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,

    #[structopt(long = "force-color")]
    pub force_color: bool,
}

impl CommonOpts {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            channel_capacity: self.channel_capacity,
            concurrent_includes: !self.sequential,
        }
    }
}

/// A line of the init file that is neither an option nor a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitFileError {
    pub file: PathBuf,
    pub line: String,
}

impl error::Error for InitFileError {}
impl fmt::Display for InitFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bad config file {:?}\n{}", self.file, self.line)
    }
}

const INIT_FILE_FLAG: &str = "--init-file";
const NO_INIT_FILE_FLAG: &str = "--args-only";
const INIT_PATH_UNDER_HOME: &str = "~/.tallyrc";
const INIT_PATH: &str = ".tallyrc";

fn init_paths(args: &[String]) -> Vec<String> {
    let mut possible_paths: Vec<String> = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if arg == NO_INIT_FILE_FLAG {
            return vec![];
        } else if arg == INIT_FILE_FLAG {
            if let Some(path) = args.get(i + 1) {
                possible_paths.push(path.clone());
            }
        }
    }
    possible_paths.push(shellexpand::tilde(INIT_PATH_UNDER_HOME).to_string());
    possible_paths.push(INIT_PATH.to_string());
    possible_paths
}

/// Adds the options of an init file that are not already in the arguments
fn read_init_file(file: &Path, args: &mut Vec<String>) -> Result<(), Box<dyn error::Error>> {
    let mut aliases = HashMap::new();
    aliases.insert("-f", "--file");
    aliases.insert("-v", "--verbose");

    let contents = read_to_string(file)?;
    for line in contents.lines() {
        let option = line.trim_start();
        match option.chars().next() {
            Some('-') => {
                if !option.starts_with("--") {
                    return Err(bad_line(file, line));
                }
                let mut iter = option.split_whitespace();
                let name = match iter.next() {
                    Some(name) => name,
                    None => return Err(bad_line(file, line)),
                };
                let given = args
                    .iter()
                    .any(|x| x == name || aliases.get(x.as_str()) == Some(&name));
                if !given {
                    args.push(name.to_string());
                    let rest: Vec<&str> = iter.collect();
                    if !rest.is_empty() {
                        args.push(rest.join(" "));
                    }
                }
            }
            Some(';') | Some('#') | Some('!') | Some('%') => (), // a comment
            Some(_) => return Err(bad_line(file, line)),
            None => (),
        }
    }
    Ok(())
}

fn bad_line(file: &Path, line: &str) -> Box<dyn error::Error> {
    Box::new(InitFileError {
        file: file.to_path_buf(),
        line: line.to_string(),
    })
}

/// Entry point for the command line app
///
/// Load the options from one of the init files, add them to the supplied command line options
/// and call the command accordingly.
pub fn run_app(mut args: Vec<String>) -> Result<(), Box<dyn error::Error>> {
    let config_file = init_paths(&args)
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists());
    if let Some(file) = config_file {
        debug!("Reading options from {:?}", file);
        read_init_file(&file, &mut args)?;
    }

    // Build options from the argument vector
    let opt: Opt = Opt::from_iter(args.iter());

    match opt.cmd {
        Command::Check(options) => {
            if options.force_color {
                env::set_var("CLICOLOR_FORCE", "1");
            }
            check::execute(&options)?;
        }
    }
    Ok(())
}
