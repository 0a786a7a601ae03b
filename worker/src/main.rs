use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use infra::db::{
    postgres_connection,
    repositories::{
        cards::CardPostgres, catalog::BillingCatalogPostgres, invoices::InvoicePostgres,
        subscriptions::SubscriptionPostgres, usage::UsagePostgres, workspaces::WorkspacePostgres,
    },
};
use infra::queue::rabbitmq;
use worker::{
    config,
    consumer,
    usecases::billing::{BillingUseCase, GatewayCharger},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Billing worker exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    observability::init_observability("billing-worker")?;

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");
    let db_pool_arc = Arc::new(postgres_pool);

    let queue_connection = rabbitmq::connect(&dotenvy_env.queue.url).await?;
    info!("Broker connection has been established");

    let event_publisher = Arc::new(rabbitmq::RabbitMqEventPublisher::new(&queue_connection).await?);

    let usecase = Arc::new(BillingUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(WorkspacePostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(BillingCatalogPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(UsagePostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(InvoicePostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(CardPostgres::new(Arc::clone(&db_pool_arc))),
        event_publisher,
        Arc::new(GatewayCharger::new(
            dotenvy_env.billing.deployment_domain.clone(),
        )),
    ));

    let consumer_tag = format!("billing-worker-{}", uuid::Uuid::new_v4().simple());
    let task_consumer = rabbitmq::billing_task_consumer(&queue_connection, &consumer_tag).await?;

    consumer::run(task_consumer, usecase).await
}
