use botflow::commands::CommandRegistry;
use botflow::config::Config;
use botflow::engine::{
    ConsoleHost, Engine, EngineEvent, ErrorPolicy, ScriptFinishedEvent, ScriptResult,
};
use botflow::error::BotflowError;
use botflow::script::{Script, ScriptSource};
use botflow::variables::Variable;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

/// Run automation scripts
#[derive(Parser)]
#[command(name = "botflow")]
#[command(about = "Botflow - run JSON and YAML automation scripts", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script
    Run(RunArgs),
    /// Load and compile a script without running it
    Validate {
        /// Script file (.json, .yaml or .yml)
        script: PathBuf,
    },
    /// List the commands scripts can use
    Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Script file (.json, .yaml or .yml)
    script: PathBuf,

    /// Set a variable before the script starts (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Path to configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log failing lines and keep going
    #[arg(long)]
    continue_on_error: bool,

    /// Delay between commands in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Do not evaluate arithmetic in resolved text
    #[arg(long)]
    no_auto_calc: bool,

    /// Honour pause points and ask before failing on an error
    #[arg(short, long)]
    interactive: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim().trim_start_matches('{').trim_end_matches('}');
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        2 => "trace",
        _ => "trace,tokio=debug", // -vvv shows everything including dependencies
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("Botflow started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run(args) => run_script(args).await,
        Commands::Validate { script } => validate_script(script).await,
        Commands::Commands => list_commands(),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e}");
            let code = e
                .downcast_ref::<BotflowError>()
                .map(BotflowError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run_script(args: RunArgs) -> anyhow::Result<i32> {
    let mut config = Config::load(args.config.as_deref()).await?;
    config.merge_env_vars();

    let mut settings = config.engine;
    if let Some(delay) = args.delay {
        settings.delay_between_commands_ms = delay;
    }
    if args.no_auto_calc {
        settings.auto_calculate_variables = false;
    }
    if args.interactive {
        settings.debug_mode = true;
    }
    let interactive = settings.debug_mode;

    let variables = args
        .vars
        .into_iter()
        .map(|(name, value)| Variable::new(name, value))
        .collect();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut engine = Engine::new(settings)
        .with_registry(Arc::new(CommandRegistry::with_defaults()))
        .with_events(tx)
        .with_variables(variables);
    if args.continue_on_error {
        engine = engine.with_error_policy(ErrorPolicy::ContinueProcessing);
    }
    if interactive {
        engine = engine.with_host(Arc::new(ConsoleHost::new()));
    }

    let control = engine.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            control.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                EngineEvent::Progress(message) => println!("{message}"),
                EngineEvent::LineNumberChanged(line) => trace!("Line {}", line),
                EngineEvent::ScriptFinished(finished) => print_finished(&finished),
            }
        }
    });

    let outcome = engine.spawn(ScriptSource::File(args.script)).await?;
    printer.await?;

    for failure in &outcome.errors {
        debug!("Line {}: {}", failure.line_number, failure.stack_trace);
    }

    Ok(match outcome.finished.result {
        ScriptResult::Successful => 0,
        ScriptResult::Errored => 1,
        ScriptResult::Cancelled => 130, // Standard exit code for SIGINT
    })
}

fn print_finished(finished: &ScriptFinishedEvent) {
    let elapsed = format!("{:.2?}", finished.duration);
    match (&finished.result, &finished.error) {
        (ScriptResult::Errored, Some(error)) => {
            eprintln!("Script failed after {elapsed}: {error}");
        }
        (result, _) => println!("{:?}: {} ({elapsed})", result, finished.summary),
    }
}

async fn validate_script(script: PathBuf) -> anyhow::Result<i32> {
    let registry = CommandRegistry::with_defaults();
    let compiled = Script::load(&script, &registry).await?;
    println!(
        "{} is valid: {} commands, {} variables, {} elements",
        script.display(),
        compiled.node_count(),
        compiled.variables.len(),
        compiled.elements.len()
    );
    Ok(0)
}

fn list_commands() -> anyhow::Result<i32> {
    let registry = CommandRegistry::with_defaults();
    for (name, description) in registry.list() {
        println!("{name:<24} {description}");
    }
    Ok(0)
}
