//! Employer Incentives - earnings recalculation runner
//!
//! Loads configuration, wires the command pipeline and recalculates earnings
//! for a batch of incentives, one pipeline call per incentive.
//!
//! # Running
//!
//! ```bash
//! # Development: in-memory locks, debug logging
//! cargo run --bin employer-incentives
//!
//! # With a TOML override and Redis locks
//! REDIS_URL=redis://127.0.0.1:6379 cargo run --bin employer-incentives -- incentives.toml
//! ```
//!
//! Persistence is out of scope for this service, so incentives, the collection
//! calendar and the account store are the in-memory implementations, seeded
//! with a sample batch. Those come from the testing crate, which is only linked
//! with the `demo` feature (on by default); building with
//! `--no-default-features` leaves the binary out.

mod seed;

use anyhow::Context;
use employer_incentives_core::services::DistributedLockProvider;
use employer_incentives_core::CancellationToken;
use employer_incentives_redis::{RedisLockProvider, RedisLockSettings};
use employer_incentives_runtime::config::LockConfig;
use employer_incentives_runtime::metrics::MetricsServer;
use employer_incentives_runtime::{
    CalculateEarningsCommand, CalculateEarningsHandler, CommandError, ConfiguredPaymentProfiles,
    IncentivesConfig, PipelineBuilder, TracingDispatcher,
};
use employer_incentives_testing::{
    InMemoryCalendarService, InMemoryIncentiveRepository, InMemoryLockProvider,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config);

    info!(environment = %config.environment, "Starting earnings recalculation");

    let mut metrics = None;
    if config.observability.metrics_enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        let mut server = MetricsServer::new(addr);
        server.start().context("failed to start metrics recorder")?;
        metrics = Some(server);
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, cancelling in-flight commands");
            shutdown.cancel();
        }
    });

    let locks = lock_provider(&config.lock)?;
    let dispatcher = Arc::new(TracingDispatcher::new().with_source("earnings-recalculation"));
    let repository = Arc::new(InMemoryIncentiveRepository::new().with_dispatcher(dispatcher));
    let calendar = Arc::new(InMemoryCalendarService::new(seed::calendar()));
    let profiles = Arc::new(ConfiguredPaymentProfiles::from_config(&config));

    let commands = seed::incentives(&repository);

    let pipeline = PipelineBuilder::standard(config.retry.policy(), Arc::clone(&locks)).build(
        CalculateEarningsHandler::new(Arc::clone(&repository), calendar, profiles)
            .with_window(config.eligibility.window()),
    );

    let mut succeeded = 0_usize;
    let mut failed = 0_usize;
    for command in &commands {
        match pipeline.handle(command, &cancel).await {
            Ok(()) => {
                succeeded += 1;
                report(&repository, command);
            }
            Err(CommandError::Cancelled) => {
                warn!("Recalculation cancelled");
                break;
            }
            Err(err) => {
                failed += 1;
                error!(
                    apprenticeship_incentive_id = %command.apprenticeship_incentive_id,
                    error = %err,
                    "Recalculation failed"
                );
            }
        }
    }

    locks.stop().await.context("failed to stop lock provider")?;

    info!(
        total = commands.len(),
        succeeded, failed, "Earnings recalculation finished"
    );

    if let Some(body) = metrics.as_ref().and_then(MetricsServer::render) {
        tracing::debug!(metrics = %body, "Final metrics");
    }

    Ok(())
}

/// Loads `IncentivesConfig` from the TOML file named on the command line, or
/// from `CONFIG_ENV` when none is given.
fn load_config() -> anyhow::Result<IncentivesConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let document = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            IncentivesConfig::from_toml(&document)
                .with_context(|| format!("invalid config file {path}"))
        }
        None => IncentivesConfig::from_env().context("invalid configuration"),
    }
}

fn init_tracing(config: &IncentivesConfig) {
    let default_filter = format!(
        "employer_incentives={level},employer_incentives_runtime={level},employer_incentives_redis={level}",
        level = config.observability.log_level
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Redis when `REDIS_URL` is set, otherwise an in-process lock table.
fn lock_provider(config: &LockConfig) -> anyhow::Result<Arc<dyn DistributedLockProvider>> {
    match &config.redis_url {
        Some(url) => {
            let settings = RedisLockSettings {
                key_prefix: config.key_prefix.clone(),
                ttl: config.ttl(),
                acquire_timeout: config.acquire_timeout(),
                poll_interval: config.poll_interval(),
            };
            let provider =
                RedisLockProvider::new(url, settings).context("invalid REDIS_URL")?;
            info!("Using Redis lock provider");
            Ok(Arc::new(provider))
        }
        None => {
            warn!("REDIS_URL not set; locks only serialize commands within this process");
            Ok(Arc::new(InMemoryLockProvider::new()))
        }
    }
}

fn report(repository: &InMemoryIncentiveRepository, command: &CalculateEarningsCommand) {
    let Some(incentive) = repository.get(command.apprenticeship_incentive_id) else {
        return;
    };
    let view = incentive.payments_view();
    info!(
        apprenticeship_incentive_id = %command.apprenticeship_incentive_id,
        pending_payments = view.outstanding().count(),
        clawbacks = view.clawback_payments.len(),
        "Earnings recalculated"
    );
}
