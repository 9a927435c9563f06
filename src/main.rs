use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use config_relay::cli::{Args, Commands};
use config_relay::config::{load_or_default, TransportConfig};
use config_relay::policy::PolicyResolver;
use config_relay::transport::{
    send_bounded_parallel, BatchStrategy, Transport, TransportFactory, TransportMetrics,
    TransportResult,
};
use config_relay::utils::input::read_artifacts;
use config_relay::utils::summary::create_run_summary;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    let factory = TransportFactory::with_builtin_transports();

    match &args.command {
        Commands::InitConfig { path } => {
            info!("Creating example configuration file at {}", path.display());
            TransportConfig::create_example_config_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
        Commands::ListTransports => {
            for name in factory.available() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Policies => {
            let config = load_or_default(args.config.as_deref())?;
            print_policies(&config)
        }
        Commands::Resolve { input } => {
            let config = load_or_default(args.config.as_deref())?;
            resolve_artifacts(&config, input)
        }
        Commands::Health { transport } => {
            let config = load_or_default(args.config.as_deref())?;
            let transport = create_transport(&factory, &config, transport.as_deref())?;
            check_health(transport)
        }
        Commands::Send { input, transport, parallel, summary } => {
            let config = load_or_default(args.config.as_deref())?;
            let transport = create_transport(&factory, &config, transport.as_deref())?;
            send_artifacts(transport, &config, input, *parallel, summary.as_deref())
        }
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

fn create_transport(
    factory: &TransportFactory,
    config: &TransportConfig,
    requested: Option<&str>,
) -> Result<Arc<dyn Transport>> {
    let name = requested.unwrap_or(&config.transport);
    let transport = factory
        .create(name, config)
        .context(format!("Failed to create transport '{}'", name))?;
    info!("Using transport '{}'", transport.name());
    Ok(transport)
}

fn check_health(transport: Arc<dyn Transport>) -> Result<()> {
    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
    let healthy = runtime.block_on(transport.health_check());

    if healthy {
        println!("{}: healthy", transport.name());
        Ok(())
    } else {
        println!("{}: unreachable", transport.name());
        Err(anyhow!("Transport '{}' failed its health check", transport.name()))
    }
}

fn print_policies(config: &TransportConfig) -> Result<()> {
    let policies = config.policy_scanner.as_ref().map(|s| s.policies.clone()).unwrap_or_default();
    let resolver = PolicyResolver::new(&policies);

    println!("default policy: {}", resolver.default_policy());
    let tree = serde_json::to_string_pretty(&resolver.lookup().describe())
        .context("Failed to render policy hierarchy")?;
    println!("{}", tree);
    Ok(())
}

fn resolve_artifacts(config: &TransportConfig, input: &Path) -> Result<()> {
    let artifacts = read_artifacts(input)?;
    let policies = config.policy_scanner.as_ref().map(|s| s.policies.clone()).unwrap_or_default();
    let resolver = PolicyResolver::new(&policies);

    for artifact in &artifacts {
        let (policy, level) = resolver.resolve_with_level(artifact);
        let labels = serde_json::to_string(&resolver.labels_for(artifact))
            .context("Failed to render labels")?;
        println!("{}\t{}\t{}\t{}", artifact.artifact_id(), policy, level, labels);
    }
    Ok(())
}

fn send_artifacts(
    transport: Arc<dyn Transport>,
    config: &TransportConfig,
    input: &Path,
    parallel: Option<usize>,
    summary_path: Option<&Path>,
) -> Result<()> {
    let artifacts = read_artifacts(input)?;
    if artifacts.is_empty() {
        warn!("No artifacts found in {}", input.display());
        return Ok(());
    }
    info!("Sending {} artifacts via {}", artifacts.len(), transport.name());

    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
    let results = runtime.block_on(async {
        if !transport.connect().await {
            warn!("{} is not reachable, attempting delivery anyway", transport.name());
        }

        let results = match (parallel, config.batch) {
            (Some(max_concurrent), _) => {
                send_bounded_parallel(transport.as_ref(), &artifacts, max_concurrent).await
            }
            (None, BatchStrategy::Sequential) => transport.send_batch(&artifacts).await,
            (None, strategy) => strategy.send_batch(transport.as_ref(), &artifacts).await,
        };

        transport.disconnect().await;
        results
    });

    report_results(&results);

    let metrics = transport.get_metrics();
    info!(
        "Delivered {}/{} artifacts ({:.1}% success, {} retries)",
        metrics.total_success,
        metrics.total_sent,
        metrics.success_rate(),
        metrics.total_retries
    );

    if let Some(path) = summary_path {
        write_summary(path, transport.name(), &results, &metrics)?;
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        return Err(anyhow!("{} of {} artifacts were not delivered", failed, results.len()));
    }
    Ok(())
}

fn report_results(results: &[TransportResult]) {
    for result in results {
        match &result.error {
            None => info!("{}: {}", result.artifact_id, result.status),
            Some(error) => error!("{}: {} ({})", result.artifact_id, result.status, error),
        }
    }
}

fn write_summary(
    path: &Path,
    transport: &str,
    results: &[TransportResult],
    metrics: &TransportMetrics,
) -> Result<()> {
    let hostname = hostname::get()
        .map_err(|e| anyhow!("Failed to get hostname: {}", e))?
        .to_string_lossy()
        .to_string();

    let summary = create_run_summary(&hostname, transport, results, metrics)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .context(format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, summary).context(format!("Failed to write summary to {}", path.display()))?;
    info!("Run summary written to {}", path.display());
    Ok(())
}
