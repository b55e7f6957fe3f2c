use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cmd::commands;
use cmd::config::{load_config_from_file, CliConfig};
use cmd::logger::setup_logger;
use tracing::debug;

use nm_ruleset::expr_rule::{compile_expr_rules, read_expr_rules_from_file};

#[derive(Parser, Debug)]
#[command(about = "IPv4 CIDR membership checks and expression rules")]
struct Cli {
    #[clap(short, global = true)]
    config_file: Option<String>,
    /// Print results as JSON
    #[clap(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether an address belongs to a CIDR network
    Check { ip: String, network: String },
    /// Evaluate an expression with the builtins registered
    Eval { expr: String },
    /// Match addresses against a rules file
    Match {
        #[clap(short)]
        ruleset_file: String,
        #[clap(required = true)]
        ips: Vec<String>,
    },
    /// List the registered builtins
    Functions,
}

async fn run(cli: Cli, config: CliConfig) -> Result<String, Box<dyn std::error::Error>> {
    let engine = config.engine.engine();
    let output = match cli.command {
        Command::Check { ip, network } => commands::check(&ip, &network, cli.json)?,
        Command::Eval { expr } => commands::eval(&engine.register(), &expr, cli.json)?,
        Command::Match { ruleset_file, ips } => {
            let raw_rs = read_expr_rules_from_file(&ruleset_file).await?;
            debug!("{:?}", raw_rs);
            let rs = compile_expr_rules(raw_rs, Arc::new(engine.register()))?;
            commands::match_ips(&rs, &ips, cli.json)?
        }
        Command::Functions => commands::list_functions(cli.json)?,
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI
    let cli = Cli::parse();

    // Load config file
    let config = match &cli.config_file {
        Some(path) => match load_config_from_file(path).await {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config file: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => CliConfig::default(),
    };

    // Setup logger
    if let Err(e) = setup_logger(&config.log) {
        eprintln!("failed to setup logger: {}", e);
        return ExitCode::FAILURE;
    }
    debug!("{:?}", config);

    match run(cli, config).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
