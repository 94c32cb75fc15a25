use anyhow::Result;
use servicecut::cli::{self, Cli, Commands};
use servicecut::commands::{self, ClusterConfig, EvaluateConfig, RescoreConfig};
use servicecut::progress::ProgressConfig;

fn main() -> Result<()> {
    let cli = cli::parse_args();
    cli::init_logging(cli.verbosity);
    cli::configure_thread_pool(cli.jobs);
    tracing::debug!(workers = cli::get_worker_count(cli.jobs), "thread pool ready");

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let progress = ProgressConfig::from_env(cli.quiet);
    match cli.command {
        Commands::Cluster {
            classes,
            overrides,
            config,
            output,
            summary,
        } => {
            commands::run_cluster(ClusterConfig {
                classes,
                config,
                overrides,
                output,
                summary,
                progress,
            })?;
        }
        Commands::Evaluate {
            classes,
            ground_truth,
            metrics,
            output,
        } => {
            commands::run_evaluate(EvaluateConfig {
                classes,
                ground_truth,
                metrics,
                output,
            })?;
        }
        Commands::Rescore {
            classes,
            report,
            ground_truth,
            metrics,
            sr_k,
            output,
        } => {
            commands::run_rescore(RescoreConfig {
                classes,
                report,
                ground_truth,
                metrics,
                sr_k,
                output,
            })?;
        }
        Commands::Init { force } => commands::init_config(force)?,
    }
    Ok(())
}
