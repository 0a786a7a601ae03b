#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub queue: Queue,
    pub billing: Billing,
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
pub struct Billing {
    pub deployment_domain: String,
}
