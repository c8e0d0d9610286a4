//! `agentloop`: run a coding agent against a workspace until its verification
//! command passes or a loop limit is hit.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agentloop::exit_codes;
use agentloop::io::command_engine::CommandEngine;
use agentloop::io::config::{
    AgentConfig, DEFAULT_CONFIG_FILE, load_config, render_config, write_config,
};
use agentloop::io::confirm::ConfirmStrategy;
use agentloop::io::engine::ReasoningEngine;
use agentloop::io::http_engine::HttpEngine;
use agentloop::io::interrupt::InterruptFlag;
use agentloop::io::reporter::ConsoleReporter;
use agentloop::io::run_report::{RunReport, write_report};
use agentloop::io::verifier::ShellVerifier;
use agentloop::logging;
use agentloop::orchestrator::{RunConfig, run_agent};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

const DEFAULT_REQUEST: &str = "List all Python files in the workspace";

#[derive(Parser)]
#[command(
    name = "agentloop",
    version,
    about = "Plan, act, verify and observe coding agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent on one request.
    Run(RunArgs),
    /// Print the effective configuration as TOML.
    Config {
        /// Config file (default: `agentloop.toml` in the current directory).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the effective configuration back to the config file,
        /// filling in every default.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// What the agent should do.
    #[arg(default_value = DEFAULT_REQUEST)]
    request: String,

    /// Workspace directory; created if missing.
    #[arg(short, long, default_value = "./workspace")]
    workspace: PathBuf,

    /// Node executions allowed per run (at least 7).
    #[arg(long)]
    recursion_limit: Option<u32>,

    /// Plan/act/verify loops before stopping unverified.
    #[arg(long)]
    max_loops: Option<u32>,

    /// Shell command that verifies the workspace.
    #[arg(long)]
    verify_command: Option<String>,

    /// Config file (default: `agentloop.toml` in the current directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reasoning engine backend.
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Command for the `command` engine (implies `--engine command`).
    #[arg(long)]
    engine_command: Option<String>,

    /// Approve every change without prompting.
    #[arg(short, long, conflicts_with = "confirm")]
    yes: bool,

    /// How changes are confirmed.
    #[arg(long, value_enum)]
    confirm: Option<ConfirmStrategy>,

    /// Exit with status 2 when verification never passed.
    #[arg(long)]
    strict_exit: bool,

    /// Write a JSON report of the run to this path.
    #[arg(long)]
    trajectory_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// OpenAI-compatible chat completions endpoint.
    Http,
    /// External command speaking JSON on stdin/stdout.
    Command,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Config { config, write } => cmd_config(config.as_deref(), write),
    }
}

fn cmd_config(config: Option<&Path>, write: bool) -> Result<i32> {
    if write {
        let path = config.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let cfg = load_config(path)?;
        write_config(path, &cfg)?;
        println!("wrote {}", path.display());
        return Ok(exit_codes::OK);
    }
    let cfg = load_effective_config(config)?;
    print!("{}", render_config(&cfg)?);
    Ok(exit_codes::OK)
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let mut cfg = load_effective_config(args.config.as_deref())?;
    apply_overrides(&mut cfg, &args);
    cfg.validate()?;

    fs::create_dir_all(&args.workspace)
        .with_context(|| format!("create workspace {}", args.workspace.display()))?;

    let engine = build_engine(&cfg, &args)?;
    let verifier = ShellVerifier::new(cfg.verify_command.clone(), cfg.sandbox());
    let strategy = if args.yes {
        ConfirmStrategy::Approve
    } else {
        args.confirm.unwrap_or(ConfirmStrategy::Tty)
    };
    let interrupt = InterruptFlag::new();
    if matches!(strategy, ConfirmStrategy::Tty | ConfirmStrategy::Stdin) {
        interrupt.install()?;
    }
    let confirmer = strategy.build(&interrupt)?;
    let reporter = ConsoleReporter::stdout();

    let outcome = run_agent(
        &args.request,
        &args.workspace,
        &RunConfig::from(&cfg),
        &engine,
        &verifier,
        &confirmer,
        &reporter,
    )?;

    if let Some(path) = &args.trajectory_out {
        write_report(path, &RunReport::new(&outcome.state, &outcome.stop))?;
        info!(path = %path.display(), "wrote run report");
    }

    if args.strict_exit && !outcome.verified() {
        return Ok(exit_codes::UNVERIFIED);
    }
    Ok(exit_codes::OK)
}

fn load_effective_config(path: Option<&Path>) -> Result<AgentConfig> {
    match path {
        Some(path) if !path.exists() => bail!("config file not found: {}", path.display()),
        Some(path) => load_config(path),
        None => load_config(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

fn apply_overrides(cfg: &mut AgentConfig, args: &RunArgs) {
    if let Some(limit) = args.recursion_limit {
        cfg.recursion_limit = limit;
    }
    if let Some(max_loops) = args.max_loops {
        cfg.max_loops = max_loops;
    }
    if let Some(command) = &args.verify_command {
        cfg.verify_command = command.clone();
    }
    if let Some(command) = &args.engine_command {
        cfg.engine.command = Some(command.clone());
    }
}

fn build_engine(cfg: &AgentConfig, args: &RunArgs) -> Result<Box<dyn ReasoningEngine>> {
    let kind = args.engine.unwrap_or(if args.engine_command.is_some() {
        EngineKind::Command
    } else {
        EngineKind::Http
    });
    match kind {
        EngineKind::Http => Ok(Box::new(HttpEngine::from_config(&cfg.engine)?)),
        EngineKind::Command => {
            let command = cfg
                .engine
                .command
                .clone()
                .ok_or_else(|| anyhow!("--engine command requires --engine-command or engine.command"))?;
            Ok(Box::new(CommandEngine {
                command,
                workdir: args.workspace.clone(),
                timeout: Duration::from_secs(cfg.engine.timeout_secs),
                output_limit_bytes: cfg.output_limit_bytes,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["agentloop", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.request, DEFAULT_REQUEST);
        assert_eq!(args.workspace, PathBuf::from("./workspace"));
        assert!(!args.yes);
        assert!(!args.strict_exit);
        assert_eq!(args.confirm, None);
    }

    #[test]
    fn parse_run_flags() {
        let cli = Cli::parse_from([
            "agentloop",
            "run",
            "rename greet",
            "-w",
            "ws",
            "--recursion-limit",
            "30",
            "--engine",
            "command",
            "--engine-command",
            "./engine.sh",
            "--confirm",
            "reject",
            "--strict-exit",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.request, "rename greet");
        assert_eq!(args.recursion_limit, Some(30));
        assert_eq!(args.engine, Some(EngineKind::Command));
        assert_eq!(args.confirm, Some(ConfirmStrategy::Reject));
        assert!(args.strict_exit);
    }

    #[test]
    fn yes_conflicts_with_confirm() {
        let result = Cli::try_parse_from(["agentloop", "run", "--yes", "--confirm", "tty"]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let cli = Cli::parse_from([
            "agentloop",
            "run",
            "--max-loops",
            "3",
            "--verify-command",
            "exit 0",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut cfg = AgentConfig::default();
        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.max_loops, 3);
        assert_eq!(cfg.verify_command, "exit 0");
        assert_eq!(cfg.recursion_limit, 20);
    }
}
