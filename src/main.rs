use allctx::config::Config;
use allctx::exec::KubectlExecutor;
use allctx::logging;
use allctx::orchestrator::Orchestrator;
use allctx::output::Sinks;
use allctx::provider::KubectlContexts;
use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const PATTERN_HELP: &str = "\
Patterns can be used to match contexts in kubeconfig:
      (empty): matches all contexts
      PATTERN: matches context with exact name
    /PATTERN/: matches context with regular expression
     ^PATTERN: removes results from matched contexts

Environment:
    ALLCTX_DISABLE_PROMPTS  skip the confirmation prompt when non-empty
    ALLCTX_KUBECTL          kubectl executable to use (default: kubectl)";

#[derive(Parser)]
#[command(name = "kubectl-allctx")]
#[command(version, about = "Run a kubectl command in many contexts in parallel")]
#[command(override_usage = "kubectl allctx [OPTIONS] [PATTERN]... -- [KUBECTL_ARGS]...")]
#[command(after_help = PATTERN_HELP)]
pub struct Cli {
    /// Limit parallel executions (default: as many as matched contexts)
    #[arg(short = 'c', value_name = "NUM", default_value_t = 0, allow_negative_numbers = true)]
    pub concurrency: i64,

    /// Accept the confirmation prompt
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Replace VAL occurring in KUBECTL_ARGS with the context name
    #[arg(short = 'I', value_name = "VAL")]
    pub replace: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Context patterns
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Arguments passed to kubectl for every context
    #[arg(last = true, value_name = "KUBECTL_ARGS")]
    pub kubectl_args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
    {
        Ok(rt) => rt,
        Err(e) => return report(&e),
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    };
    // A stdin read abandoned by a cancelled prompt may still be blocked.
    runtime.shutdown_background();
    code
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env(cli.concurrency, cli.replace, cli.quiet, cli.verbose)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", style("received exit signal").dim().for_stderr());
                cancel.cancel();
            }
        }
    });

    let provider = KubectlContexts::new(config.kubectl_cmd.clone());
    let executor = Arc::new(KubectlExecutor::new(config.kubectl_cmd.clone()));
    let orchestrator = Orchestrator::new(config, provider, executor);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    orchestrator
        .run(&cli.patterns, cli.kubectl_args, stdin, &Sinks::stdio(), &cancel)
        .await?;
    Ok(())
}

fn report(err: &anyhow::Error) -> ExitCode {
    eprintln!("{}{:#}", style("error: ").red().for_stderr(), err);
    ExitCode::FAILURE
}
