use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use distributor::{
    config,
    distributor::{CycleOutcome, Distributor},
    retry::RetryBillingUseCase,
    scheduler,
};
use domain::{
    repositories::{kv::KeyValueStore, subscriptions::SubscriptionRepository},
    value_objects::enums::billing_cycles::BillingCycle,
};
use infra::db::{
    postgres_connection,
    repositories::{
        cards::CardPostgres, catalog::BillingCatalogPostgres, invoices::InvoicePostgres,
        subscriptions::SubscriptionPostgres, workspaces::WorkspacePostgres,
    },
};
use infra::kv::redis_store::RedisStore;
use infra::queue::rabbitmq::RabbitMqTaskPublisher;
use payments::charger::GatewayCharger;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Billing distributor exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    observability::init_observability("billing-distributor")?;

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let redis = Arc::new(RedisStore::connect(&dotenvy_env.redis.url).await?);
    info!("Redis connection has been established");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");
    let db_pool_arc = Arc::new(postgres_pool);

    let distributor = Arc::new(Distributor::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::clone(&redis),
    ));

    let retry_usecase = Arc::new(RetryBillingUseCase::new(
        Arc::new(InvoicePostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(WorkspacePostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(BillingCatalogPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(CardPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(GatewayCharger::new(
            dotenvy_env.billing.deployment_domain.clone(),
        )),
    ));

    let monthly = tokio::spawn(cycle_loop(
        "monthly-billing",
        scheduler::MONTHLY_SCHEDULE,
        BillingCycle::Monthly,
        Arc::clone(&distributor),
        dotenvy_env.queue.url.clone(),
    ));

    let annual = tokio::spawn(cycle_loop(
        "annual-billing",
        scheduler::ANNUAL_SCHEDULE,
        BillingCycle::Annual,
        Arc::clone(&distributor),
        dotenvy_env.queue.url.clone(),
    ));

    let debug_handle = dotenvy_env.debug_trigger.then(|| {
        info!("debug trigger enabled; distributing every minute");
        tokio::spawn(cycle_loop(
            "debug-billing",
            scheduler::DEBUG_SCHEDULE,
            BillingCycle::MonthlyDebug,
            Arc::clone(&distributor),
            dotenvy_env.queue.url.clone(),
        ))
    });

    let retry = tokio::spawn(async move {
        scheduler::run_cron_loop("billing-retry", scheduler::RETRY_SCHEDULE, move || {
            let usecase = Arc::clone(&retry_usecase);
            async move {
                if let Err(err) = usecase.retry_incomplete_invoices().await {
                    error!(error = %err, "retry pass aborted");
                }
            }
        })
        .await
    });

    info!("Billing task distributor started");

    tokio::select! {
        result = monthly => result??,
        result = annual => result??,
        result = retry => result??,
        result = async {
            match debug_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => result??,
    };

    Ok(())
}

async fn cycle_loop<S, K>(
    name: &'static str,
    expression: &'static str,
    cycle: BillingCycle,
    distributor: Arc<Distributor<S, K>>,
    queue_url: String,
) -> Result<()>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    scheduler::run_cron_loop(name, expression, move || {
        let distributor = Arc::clone(&distributor);
        let queue_url = queue_url.clone();
        async move {
            let open_publisher = || async { RabbitMqTaskPublisher::connect(&queue_url).await };
            match distributor.run_cycle(cycle, Utc::now(), open_publisher).await {
                Ok(CycleOutcome::Completed(report)) => {
                    info!(
                        job = name,
                        published = report.published,
                        skipped_dedup = report.skipped_dedup,
                        failed_publishes = report.failed_publishes,
                        "billing cycle completed"
                    );
                }
                Ok(CycleOutcome::LockHeld) => {}
                Err(err) => {
                    error!(job = name, error = %err, "billing cycle aborted; next trigger retries");
                }
            }
        }
    })
    .await
}
