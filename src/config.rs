use std::env;

/// Upper bound for `JWT_TTL_HOURS`.
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub page_size: i64,
    pub shopping_list_filename: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(24)
            .min(MAX_JWT_TTL_HOURS);
        let page_size = env::var("PAGINATION_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(6)
            .clamp(1, 100);
        let shopping_list_filename = env::var("SHOPPING_LIST_FILENAME")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "shopping_list.txt".to_string());
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
            page_size,
            shopping_list_filename,
        })
    }
}
