use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer,
    options::{
        BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions,
        QueueDeclareOptions,
    },
    publisher_confirm::Confirmation,
    types::FieldTable,
};
use tracing::warn;

use domain::{
    repositories::{
        events::BillingEventPublisher,
        tasks::{BillingTaskPublisher, PublishOutcome},
    },
    value_objects::{
        billing_events::{FailedPaymentEvent, PaymentReceiptEvent},
        billing_tasks::BillingTask,
    },
};

pub const BILLING_TASKS_QUEUE: &str = "billing_tasks";
pub const PAYMENT_RECEIPTS_QUEUE: &str = "payment_receipts";
pub const FAILED_PAYMENTS_QUEUE: &str = "failed_payments";

/// How long a publisher waits for the broker's confirm before treating the
/// message as not queued.
const PUBLISH_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(queue_url: &str) -> Result<Connection> {
    Connection::connect(queue_url, ConnectionProperties::default())
        .await
        .context("failed to connect to the message broker")
}

async fn declare_durable(channel: &Channel, queue: &str) -> Result<()> {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("failed to declare queue {queue}"))?;
    Ok(())
}

fn persistent_json() -> BasicProperties {
    BasicProperties::default()
        .with_delivery_mode(2)
        .with_content_type("application/json".into())
}

/// Confirmed publisher for `billing_tasks`. The channel runs in
/// publisher-confirm mode; a task only counts as queued once the broker acks
/// it within the confirm window. Owns its connection so a distributor cycle
/// can open and drop one as a unit.
pub struct RabbitMqTaskPublisher {
    _connection: Connection,
    channel: Channel,
}

impl RabbitMqTaskPublisher {
    pub async fn connect(queue_url: &str) -> Result<Self> {
        let connection = connect(queue_url).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .context("failed to enable publisher confirms")?;
        declare_durable(&channel, BILLING_TASKS_QUEUE).await?;
        Ok(Self {
            _connection: connection,
            channel,
        })
    }
}

#[async_trait]
impl BillingTaskPublisher for RabbitMqTaskPublisher {
    async fn publish(&self, task: &BillingTask) -> Result<PublishOutcome> {
        let body = serde_json::to_vec(task)?;

        let confirm = self
            .channel
            .basic_publish(
                "",
                BILLING_TASKS_QUEUE,
                BasicPublishOptions::default(),
                &body,
                persistent_json(),
            )
            .await?;

        match tokio::time::timeout(PUBLISH_CONFIRM_TIMEOUT, confirm).await {
            Ok(Ok(Confirmation::Ack(_))) => Ok(PublishOutcome::Confirmed),
            Ok(Ok(Confirmation::Nack(_))) => Ok(PublishOutcome::Rejected),
            Ok(Ok(Confirmation::NotRequested)) => {
                // Should not happen once confirm_select has run.
                warn!("publish resolved without a requested confirm");
                Ok(PublishOutcome::Rejected)
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Ok(PublishOutcome::TimedOut),
        }
    }
}

/// Publisher for the outbound receipt/failure streams consumed by the email
/// and ledger systems.
pub struct RabbitMqEventPublisher {
    channel: Channel,
}

impl RabbitMqEventPublisher {
    pub async fn new(connection: &Connection) -> Result<Self> {
        let channel = connection.create_channel().await?;
        declare_durable(&channel, PAYMENT_RECEIPTS_QUEUE).await?;
        declare_durable(&channel, FAILED_PAYMENTS_QUEUE).await?;
        Ok(Self { channel })
    }

    async fn publish_json(&self, queue: &str, body: Vec<u8>) -> Result<()> {
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &body,
                persistent_json(),
            )
            .await?
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BillingEventPublisher for RabbitMqEventPublisher {
    async fn publish_receipt(&self, event: &PaymentReceiptEvent) -> Result<()> {
        self.publish_json(PAYMENT_RECEIPTS_QUEUE, serde_json::to_vec(event)?)
            .await
    }

    async fn publish_failure(&self, event: &FailedPaymentEvent) -> Result<()> {
        self.publish_json(FAILED_PAYMENTS_QUEUE, serde_json::to_vec(event)?)
            .await
    }
}

/// Opens the worker's consumer channel: prefetch 1 so a replica never holds
/// more than one unacked task, manual ack.
pub async fn billing_task_consumer(connection: &Connection, consumer_tag: &str) -> Result<Consumer> {
    let channel = connection.create_channel().await?;
    channel
        .basic_qos(1, BasicQosOptions::default())
        .await
        .context("failed to set prefetch")?;
    declare_durable(&channel, BILLING_TASKS_QUEUE).await?;

    let consumer = channel
        .basic_consume(
            BILLING_TASKS_QUEUE,
            consumer_tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("failed to start consuming billing tasks")?;

    Ok(consumer)
}
