use std::sync::Arc;

use anyhow::{Context, Result};
use futures_lite::StreamExt;
use lapin::{
    Consumer,
    options::{BasicAckOptions, BasicNackOptions},
};
use tracing::{error, info, warn};

use domain::value_objects::billing_tasks::BillingTask;

use crate::usecases::billing::TaskProcessor;

/// Consumer loop over `billing_tasks`. One unacked task at a time
/// (prefetch 1); terminal task outcomes and task-fatal errors ack, while
/// infrastructure errors nack with requeue so another replica retries.
pub async fn run(mut consumer: Consumer, processor: Arc<dyn TaskProcessor>) -> Result<()> {
    info!("billing worker ready; waiting for tasks");

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery.context("billing task delivery failed")?;

        let task: BillingTask = match serde_json::from_slice(&delivery.data) {
            Ok(task) => task,
            Err(err) => {
                error!(error = %err, "discarding malformed billing task payload");
                delivery
                    .ack(BasicAckOptions::default())
                    .await
                    .context("failed to ack malformed task")?;
                continue;
            }
        };

        info!(
            workspace_id = task.workspace_id,
            subscription_id = task.subscription_id,
            run_id = %task.run_id,
            "processing billing task"
        );

        match processor.process(&task).await {
            Ok(outcome) => {
                info!(workspace_id = task.workspace_id, outcome = ?outcome, "billing task settled");
                delivery
                    .ack(BasicAckOptions::default())
                    .await
                    .context("failed to ack billing task")?;
            }
            Err(err) if err.is_task_fatal() => {
                warn!(
                    workspace_id = task.workspace_id,
                    error = %err,
                    "billing task failed terminally; not requeueing"
                );
                delivery
                    .ack(BasicAckOptions::default())
                    .await
                    .context("failed to ack failed billing task")?;
            }
            Err(err) => {
                error!(
                    workspace_id = task.workspace_id,
                    error = %err,
                    "infrastructure error; requeueing billing task"
                );
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await
                    .context("failed to nack billing task")?;
            }
        }
    }

    Ok(())
}
