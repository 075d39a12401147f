//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Containme - container-based build orchestrator
///
/// Runs a build spec's stages as a chain of committed containers,
/// reusing stage checkpoints from earlier builds.
#[derive(Parser, Debug)]
#[command(name = "containme")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Build spec file (defaults to ./containme.yaml)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Working tree mounted into the build (defaults to current directory)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CONTAINME_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the build pipeline
    Run(RunArgs),

    /// Run a one-off command in the build environment
    Exec(ExecArgs),

    /// Print version information
    Version,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Rebuild the environment stage even if a checkpoint exists
    #[arg(long)]
    pub no_env_cache: bool,

    /// Rebuild the dependencies stage even if a checkpoint exists
    #[arg(long)]
    pub no_deps_cache: bool,

    /// Remove the build's cache volumes when it finishes. Volumes are created
    /// per build and are otherwise left behind
    #[arg(long)]
    pub clean_volumes: bool,
}

/// Arguments for the exec command
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Rebuild the environment stage even if a checkpoint exists
    #[arg(long)]
    pub no_env_cache: bool,

    /// Command and arguments to run, each passed to the shell as one word
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run() {
        let cli = Cli::parse_from(["containme", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert!(!args.no_env_cache);
                assert!(!args.no_deps_cache);
                assert!(!args.clean_volumes);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "containme",
            "run",
            "--no-env-cache",
            "--no-deps-cache",
            "--clean-volumes",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.no_env_cache);
                assert!(args.no_deps_cache);
                assert!(args.clean_volumes);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_exec() {
        let cli = Cli::parse_from(["containme", "exec", "--", "ls", "-la"]);
        match cli.command {
            Commands::Exec(args) => assert_eq!(args.command, vec!["ls", "-la"]),
            _ => panic!("expected Exec command"),
        }
    }

    #[test]
    fn exec_requires_command() {
        assert!(Cli::try_parse_from(["containme", "exec"]).is_err());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "containme",
            "-vv",
            "run",
            "-f",
            "build.yaml",
            "-w",
            "/tmp/app",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.file, Some(PathBuf::from("build.yaml")));
        assert_eq!(cli.workdir, Some(PathBuf::from("/tmp/app")));
    }

    #[test]
    fn cli_parses_version() {
        let cli = Cli::parse_from(["containme", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::parse_from(["containme", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(args) => {
                assert!(matches!(args.action, Some(ConfigAction::Init { force: true })))
            }
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn clean_volumes_help_mentions_leftover_volumes() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let run = cli.find_subcommand("run").unwrap();
        let arg = run
            .get_arguments()
            .find(|a| a.get_id() == "clean_volumes")
            .unwrap();
        let help = arg.get_help().unwrap().to_string();
        assert!(help.contains("left behind"));
    }
}
