use log::warn;
use std::env;
use std::time::Duration;
use url::Url;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";
const TAVILY_BASE_URL: &str = "https://api.tavily.com";
const EXCHANGE_RATE_BASE_URL: &str = "https://open.er-api.com";
const GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

const LOCAL_CURRENCY: &str = "INR";
const FALLBACK_EXCHANGE_RATE: f64 = 90.0;

// Upstream HTTP timeouts
const MODEL_TIMEOUT_SECS: u64 = 90;
const DATA_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub groq: GroqConfig,
    pub amadeus: AmadeusConfig,
    pub tavily: TavilyConfig,
    pub exchange: ExchangeConfig,
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AmadeusConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub currency: String,
    pub fallback_rate: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout: Duration,
}

impl AppConfig {
    /// Reads configuration from the environment. Missing credentials are not
    /// an error here; the integration that needs them degrades at call time.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(PORT);

        let fallback_rate = env::var("FALLBACK_EXCHANGE_RATE")
            .ok()
            .and_then(|r| r.parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(FALLBACK_EXCHANGE_RATE);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| HOST.to_string()),
            port,
            groq: GroqConfig {
                api_key: secret("GROQ_API_KEY"),
                base_url: url_or("GROQ_BASE_URL", GROQ_BASE_URL),
                model: var_or("GROQ_MODEL", GROQ_MODEL),
                timeout: Duration::from_secs(MODEL_TIMEOUT_SECS),
            },
            amadeus: AmadeusConfig {
                client_id: secret("AMADEUS_CLIENT_ID"),
                client_secret: secret("AMADEUS_CLIENT_SECRET"),
                base_url: url_or("AMADEUS_BASE_URL", AMADEUS_BASE_URL),
                timeout: Duration::from_secs(DATA_TIMEOUT_SECS),
            },
            tavily: TavilyConfig {
                api_key: secret("TAVILY_API_KEY"),
                base_url: url_or("TAVILY_BASE_URL", TAVILY_BASE_URL),
                timeout: Duration::from_secs(DATA_TIMEOUT_SECS),
            },
            exchange: ExchangeConfig {
                base_url: url_or("EXCHANGE_RATE_BASE_URL", EXCHANGE_RATE_BASE_URL),
                currency: var_or("LOCAL_CURRENCY", LOCAL_CURRENCY).to_uppercase(),
                fallback_rate,
                timeout: Duration::from_secs(DATA_TIMEOUT_SECS),
            },
            weather: WeatherConfig {
                geocoding_url: url_or("GEOCODING_BASE_URL", GEOCODING_BASE_URL),
                forecast_url: url_or("FORECAST_BASE_URL", FORECAST_BASE_URL),
                timeout: Duration::from_secs(DATA_TIMEOUT_SECS),
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Like `var_or`, but an override that is not an absolute http(s) URL is
/// ignored.
fn url_or(key: &str, default: &str) -> String {
    let value = var_or(key, default);
    match Url::parse(&value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => value,
        _ => {
            warn!("{} is not a valid http(s) URL ({}), using {}", key, value, default);
            default.to_string()
        }
    }
}

fn secret(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Shortens a credential for display, e.g. in the health report.
pub fn mask(value: &str) -> String {
    if value.len() > 8 && value.is_char_boundary(4) && value.is_char_boundary(value.len() - 4) {
        format!("{}***{}", &value[0..4], &value[value.len() - 4..])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_when_environment_is_empty() {
        for key in [
            "PORT",
            "GROQ_API_KEY",
            "GROQ_MODEL",
            "LOCAL_CURRENCY",
            "FALLBACK_EXCHANGE_RATE",
            "AMADEUS_BASE_URL",
        ] {
            env::remove_var(key);
        }

        let config = AppConfig::from_env();
        assert_eq!(config.port, PORT);
        assert_eq!(config.groq.api_key, None);
        assert_eq!(config.groq.model, GROQ_MODEL);
        assert_eq!(config.exchange.currency, "INR");
        assert_eq!(config.exchange.fallback_rate, 90.0);
        assert_eq!(config.amadeus.base_url, AMADEUS_BASE_URL);
        assert_eq!(config.groq.timeout, Duration::from_secs(90));
        assert_eq!(config.tavily.timeout, Duration::from_secs(15));
    }

    #[test]
    #[serial]
    fn test_overrides_are_trimmed() {
        env::set_var("AMADEUS_BASE_URL", "http://127.0.0.1:4010/");
        env::set_var("LOCAL_CURRENCY", "eur");
        env::set_var("FALLBACK_EXCHANGE_RATE", "-3");
        env::set_var("TAVILY_API_KEY", "   ");

        let config = AppConfig::from_env();
        assert_eq!(config.amadeus.base_url, "http://127.0.0.1:4010");
        assert_eq!(config.exchange.currency, "EUR");
        assert_eq!(config.exchange.fallback_rate, 90.0);
        assert_eq!(config.tavily.api_key, None);

        env::set_var("AMADEUS_BASE_URL", "not a url");
        assert_eq!(AppConfig::from_env().amadeus.base_url, AMADEUS_BASE_URL);

        env::remove_var("AMADEUS_BASE_URL");
        env::remove_var("LOCAL_CURRENCY");
        env::remove_var("FALLBACK_EXCHANGE_RATE");
        env::remove_var("TAVILY_API_KEY");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("gsk_1234567890abcd"), "gsk_***abcd");
        assert_eq!(mask("short"), "***");
    }
}
