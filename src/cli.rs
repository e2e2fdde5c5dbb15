use anyhow::{Result, bail};
use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

use fanout::RunOptions;

const EXAMPLES: &str = "\
Examples:
  runin ~/src/* -- git pull
  runin -p -j 4 group:work -- make test
  runin -d ~/dev/refs/* -- git status -sb
  runin -s ./services/* -- 'cargo build 2>&1 | tail -n 1'";

#[derive(Parser, Debug)]
#[command(name = "runin")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Run a command in many directories", long_about = None)]
#[command(override_usage = "runin [OPTIONS] <TARGETS>... -- <COMMAND> [ARGS]...")]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Directories, glob patterns, or group:<name> references
    #[arg(value_name = "TARGETS")]
    pub targets: Vec<String>,

    /// Command to run in each directory (after --)
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// Run commands concurrently
    #[arg(short, long)]
    pub parallel: bool,

    /// Max parallel jobs
    #[arg(short, long, default_value_t = fanout::default_jobs())]
    pub jobs: usize,

    /// Print what would run without running it
    #[arg(short = 'n', long, visible_alias = "dry")]
    pub dry_run: bool,

    /// Only target git repos with uncommitted or unpushed work
    #[arg(short, long)]
    pub dirty: bool,

    /// Config file with group definitions
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Wrap the command in the platform shell (sh -c / cmd /C)
    #[arg(short, long)]
    pub shell: bool,

    /// Suppress status lines, only show command output
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Runtime options handed to the engine and runner
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            parallel: self.parallel,
            jobs: self.jobs.max(1),
            dry_run: self.dry_run,
            shell: self.shell,
            quiet: self.quiet,
            color: !self.no_color,
        }
    }

    /// The command to run, or a usage error.
    ///
    /// clap accepts `runin a b` with no `--`, so the caller says whether the
    /// separator was present on the raw command line.
    pub fn command_line(&self, saw_separator: bool) -> Result<Vec<String>> {
        if self.targets.is_empty() {
            bail!("no targets given");
        }
        if !saw_separator {
            bail!("missing '--' before command");
        }
        if self.command.is_empty() {
            bail!("no command given after '--'");
        }
        Ok(self.command.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("runin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_targets_and_command_split_on_separator() {
        let cli = parse(&["a", "b/*", "group:x", "--", "git", "status", "-sb"]);
        assert_eq!(cli.targets, vec!["a", "b/*", "group:x"]);
        assert_eq!(cli.command, vec!["git", "status", "-sb"]);
        assert_eq!(cli.command_line(true).unwrap(), vec!["git", "status", "-sb"]);
    }

    #[test]
    fn test_command_flags_are_not_runin_flags() {
        let cli = parse(&["a", "--", "ls", "-p", "--dirty"]);
        assert!(!cli.parallel);
        assert!(!cli.dirty);
        assert_eq!(cli.command, vec!["ls", "-p", "--dirty"]);
    }

    #[test]
    fn test_flags() {
        let cli = parse(&[
            "-p", "-j", "3", "--dry", "-d", "-s", "-q", "-vv", "--no-color", "-c", "g.json",
            "a", "--", "true",
        ]);
        assert!(cli.parallel && cli.dry_run && cli.dirty && cli.shell && cli.quiet);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("g.json")));

        let options = cli.run_options();
        assert_eq!(options.jobs, 3);
        assert!(!options.color);
        assert_eq!(options.mode_label(), "parallel, 3 workers");
    }

    #[test]
    fn test_dry_run_long_form() {
        assert!(parse(&["-n", "a", "--", "x"]).dry_run);
        assert!(parse(&["--dry-run", "a", "--", "x"]).dry_run);
    }

    #[test]
    fn test_jobs_zero_becomes_one() {
        let cli = parse(&["-p", "-j", "0", "a", "--", "x"]);
        assert_eq!(cli.run_options().jobs, 1);
    }

    #[test]
    fn test_default_jobs_is_cpu_count() {
        let cli = parse(&["a", "--", "x"]);
        assert_eq!(cli.jobs, fanout::default_jobs());
        assert!(!cli.run_options().parallel);
    }

    #[test]
    fn test_missing_separator() {
        let cli = parse(&["a", "b", "ls"]);
        let err = cli.command_line(false).unwrap_err();
        assert_eq!(err.to_string(), "missing '--' before command");
    }

    #[test]
    fn test_empty_command() {
        let cli = parse(&["a", "--"]);
        let err = cli.command_line(true).unwrap_err();
        assert_eq!(err.to_string(), "no command given after '--'");
    }

    #[test]
    fn test_no_targets() {
        let cli = parse(&["--", "ls"]);
        assert!(cli.command_line(true).is_err());
    }

    #[test]
    fn test_completions_need_no_targets() {
        let cli = parse(&["--completions", "bash"]);
        assert_eq!(cli.completions, Some(Shell::Bash));
    }
}
