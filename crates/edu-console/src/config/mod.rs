use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the console.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub billing: BillingConfig,
    pub issuer: IssuerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let invoice_prefix = env::var("APP_INVOICE_PREFIX")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "INV".to_string());
        let tax_rate_bps = match env::var("APP_TAX_RATE_BPS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|bps| *bps <= 10_000)
                .ok_or(ConfigError::InvalidTaxRate { value: raw })?,
            Err(_) => 0,
        };
        let default_currency = env::var("APP_DEFAULT_CURRENCY")
            .map(|value| value.trim().to_ascii_uppercase())
            .unwrap_or_else(|_| "EUR".to_string());
        if default_currency.len() != 3 {
            return Err(ConfigError::InvalidCurrency {
                value: default_currency,
            });
        }

        let issuer = IssuerConfig {
            name: env::var("APP_ISSUER_NAME").unwrap_or_else(|_| "Education Console".to_string()),
            address: env::var("APP_ISSUER_ADDRESS")
                .ok()
                .filter(|value| !value.trim().is_empty()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            billing: BillingConfig {
                invoice_prefix,
                tax_rate_bps,
                default_currency,
            },
            issuer,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Invoice numbering and tax policy inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    pub invoice_prefix: String,
    /// Tax rate in basis points (2000 = 20%).
    pub tax_rate_bps: u32,
    pub default_currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            invoice_prefix: "INV".to_string(),
            tax_rate_bps: 0,
            default_currency: "EUR".to_string(),
        }
    }
}

/// Seller block printed at the top of every invoice document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerConfig {
    pub name: String,
    pub address: Option<String>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            name: "Education Console".to_string(),
            address: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTaxRate { value: String },
    InvalidCurrency { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTaxRate { value } => write!(
                f,
                "APP_TAX_RATE_BPS must be basis points between 0 and 10000, got '{}'",
                value
            ),
            ConfigError::InvalidCurrency { value } => write!(
                f,
                "APP_DEFAULT_CURRENCY must be a three letter code, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTaxRate { .. }
            | ConfigError::InvalidCurrency { .. } => None,
        }
    }
}
