#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub queue: Queue,
    pub redis: Redis,
    pub billing: Billing,
    /// Adds the per-minute debug trigger when set.
    pub debug_trigger: bool,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Queue {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Redis {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Billing {
    pub deployment_domain: String,
}
