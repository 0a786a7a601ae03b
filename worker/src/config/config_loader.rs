use anyhow::{Context, Result};

use super::config_model::{Billing, Database, DotEnvyConfig, Queue};

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

    let billing = Billing {
        deployment_domain: std::env::var("DEPLOYMENT_DOMAIN")
            .context("DEPLOYMENT_DOMAIN is invalid")?,
    };

    Ok(DotEnvyConfig {
        database,
        queue,
        billing,
    })
}
