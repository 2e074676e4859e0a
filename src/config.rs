use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::orders::Order;
use crate::payments::providers::icepay::IcepaySettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub event: EventConfig,
    pub icepay: IcepaySettings,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

/// The event the shop sells tickets for
#[derive(Debug, Clone)]
pub struct EventConfig {
    pub slug: String,
    pub name: String,
    /// ISO 4217 currency code
    pub currency: String,
    /// Public base URL of the event shop, used to build return URLs
    pub public_url: String,
    /// Seats available; `None` means unlimited
    pub quota: Option<usize>,
    /// JSON file with orders to preload into the store
    pub orders_file: Option<PathBuf>,
}

impl EventConfig {
    /// Absolute URL of `path` below the shop's base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn index_url(&self) -> String {
        self.url("")
    }

    /// Order detail page, reachable with the order's secret
    pub fn order_url(&self, order: &Order) -> String {
        self.url(&format!("order/{}/{}/", order.code, order.secret))
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .context("PORT not set")?
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let quota = match env::var("EVENT_QUOTA") {
            Ok(raw) => Some(
                raw.trim()
                    .parse()
                    .context("EVENT_QUOTA must be a valid number")?,
            ),
            Err(_) => None,
        };

        let event = EventConfig {
            slug: env::var("EVENT_SLUG").context("EVENT_SLUG not set")?,
            name: env::var("EVENT_NAME").context("EVENT_NAME not set")?,
            currency: env::var("EVENT_CURRENCY").unwrap_or_else(|_| "EUR".to_string()),
            public_url: env::var("PUBLIC_URL").context("PUBLIC_URL not set")?,
            quota,
            orders_file: env::var("ORDERS_FILE").ok().map(PathBuf::from),
        };

        let icepay = IcepaySettings::from_env().map_err(|e| anyhow!("{}", e))?;

        let config = Config {
            server,
            event,
            icepay,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.event.slug.trim().is_empty() {
            return Err(anyhow!("EVENT_SLUG cannot be empty"));
        }

        if self.event.currency.len() != 3
            || !self.event.currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(anyhow!(
                "EVENT_CURRENCY must be a three-letter code, got {}",
                self.event.currency
            ));
        }

        if !self.event.public_url.starts_with("http://")
            && !self.event.public_url.starts_with("https://")
        {
            return Err(anyhow!(
                "PUBLIC_URL must be an absolute http(s) URL, got {}",
                self.event.public_url
            ));
        }

        if self.event.quota == Some(0) {
            return Err(anyhow!("EVENT_QUOTA must be greater than 0"));
        }

        self.icepay.validate().map_err(|e| anyhow!("{}", e))?;

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                environment: "development".to_string(),
            },
            event: EventConfig {
                slug: "conf".to_string(),
                name: "Conference".to_string(),
                currency: "EUR".to_string(),
                public_url: "https://tickets.example/conf/".to_string(),
                quota: None,
                orders_file: None,
            },
            icepay: IcepaySettings {
                merchant_id: "10000".to_string(),
                secret_code: "s3cr3t".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut low_port = config();
        low_port.server.port = 80;
        assert!(low_port.validate().is_err());

        let mut bad_env = config();
        bad_env.server.environment = "prod".to_string();
        assert!(bad_env.validate().is_err());

        let mut bad_currency = config();
        bad_currency.event.currency = "EURO".to_string();
        assert!(bad_currency.validate().is_err());

        let mut relative_url = config();
        relative_url.event.public_url = "/conf".to_string();
        assert!(relative_url.validate().is_err());

        let mut no_secret = config();
        no_secret.icepay.secret_code.clear();
        assert!(no_secret.validate().is_err());
    }

    #[test]
    fn test_event_urls() {
        let config = config();
        let order = Order::pending(7, "ABC12", "s3cr3t", "10.00");
        assert_eq!(config.event.index_url(), "https://tickets.example/conf/");
        assert_eq!(
            config.event.url("/icepay/result"),
            "https://tickets.example/conf/icepay/result"
        );
        assert_eq!(
            config.event.order_url(&order),
            "https://tickets.example/conf/order/ABC12/s3cr3t/"
        );
    }
}
