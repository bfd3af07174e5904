//! Atlas CLI - tier-aware 8D root cause analysis
//!
//! Main entry point for the atlas command-line tool.

use atlas::cli::{self, RunArgs};
use atlas::router::{CostMode, Provider};
use atlas::{version_info, AtlasError, ProblemMode, SecurityTier};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Atlas - tier-aware 8D root cause analysis for fab problems", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file to use instead of ~/.atlas and ./.atlas
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full RCA workflow
    Run {
        /// Problem mode: excursion, improvement, operations
        #[arg(short, long)]
        mode: ProblemMode,

        /// Security tier: general_llm, confidential_fab, top_secret
        #[arg(short, long)]
        tier: SecurityTier,

        /// Cost mode: dev, runtime (default from config)
        #[arg(long)]
        cost_mode: Option<CostMode>,

        /// Force a provider: anthropic, factory, onprem
        #[arg(long)]
        provider: Option<Provider>,

        /// File holding the problem narrative (default: stdin)
        #[arg(short, long)]
        narrative_file: Option<PathBuf>,

        /// JSON file of question -> answer (default: ask interactively)
        #[arg(short, long)]
        answers: Option<PathBuf>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tools a tier may use
    Tools {
        #[arg(short, long)]
        tier: SecurityTier,
    },

    /// Show the model routing table
    Routes {
        #[arg(long)]
        cost_mode: Option<CostMode>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli::load_config(cli.config.as_deref()).await?;
    cli::init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            mode,
            tier,
            cost_mode,
            provider,
            narrative_file,
            answers,
            json,
        } => {
            let args = RunArgs {
                mode,
                tier,
                cost_mode,
                provider,
                narrative_file,
                answers_file: answers,
                json,
            };
            match cli::handle_run(&config, args).await {
                Ok(_) => Ok(()),
                Err(AtlasError::SecurityViolation(violation)) => {
                    eprintln!("{}", "✗ Run blocked by security tier".red().bold());
                    eprintln!();
                    eprintln!("{}", violation.to_markdown());
                    std::process::exit(2);
                }
                Err(e) => {
                    eprintln!("{} {}", "✗".red(), e);
                    Err(e.into())
                }
            }
        }
        Commands::Tools { tier } => {
            cli::handle_tools(tier);
            Ok(())
        }
        Commands::Routes { cost_mode } => {
            cli::handle_routes(cost_mode);
            Ok(())
        }
        Commands::Version => {
            println!("{}", version_info());
            Ok(())
        }
    }
}
