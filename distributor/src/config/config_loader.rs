use anyhow::{Context, Result};

use super::config_model::{Billing, Database, DotEnvyConfig, Queue, Redis};

pub fn load() -> Result<DotEnvyConfig> {
    if std::env::var("USE_DOTENV").as_deref() != Ok("off") {
        dotenvy::dotenv().ok();
    }

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
    };

    let queue = Queue {
        url: std::env::var("QUEUE_URL").context("QUEUE_URL is invalid")?,
    };

    let redis = Redis {
        url: std::env::var("REDIS_URL").context("REDIS_URL is invalid")?,
    };

    let billing = Billing {
        deployment_domain: std::env::var("DEPLOYMENT_DOMAIN")
            .context("DEPLOYMENT_DOMAIN is invalid")?,
    };

    let debug_trigger = std::env::var("DISTRIBUTOR_DEBUG").as_deref() == Ok("1");

    Ok(DotEnvyConfig {
        database,
        queue,
        redis,
        billing,
        debug_trigger,
    })
}
