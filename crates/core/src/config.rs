use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::labor::Market;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub company: CompanyConfig,
    pub pdf: PdfConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Identity block printed on every exported quote, plus the house defaults
/// stamped onto new drafts.
#[derive(Clone, Debug)]
pub struct CompanyConfig {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vat_number: Option<String>,
    pub default_market: Market,
    pub default_iva: Decimal,
    pub default_validity_days: u32,
    pub default_payment_conditions: Option<String>,
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct PdfConfig {
    pub templates_dir: String,
    pub wkhtmltopdf_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub port: Option<u16>,
    pub wkhtmltopdf_path: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://devis.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            company: CompanyConfig {
                name: "Devis".to_string(),
                address: String::new(),
                phone: None,
                email: None,
                vat_number: None,
                default_market: Market::Luxembourg,
                default_iva: Decimal::new(17, 0),
                default_validity_days: 30,
                default_payment_conditions: None,
                currency: "EUR".to_string(),
            },
            pdf: PdfConfig { templates_dir: "templates".to_string(), wkhtmltopdf_path: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn parse_market(value: &str) -> Result<Market, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "luxembourg" | "lux" => Ok(Market::Luxembourg),
        "portugal" | "pt" => Ok(Market::Portugal),
        other => Err(ConfigError::Validation(format!(
            "unsupported market `{other}` (expected luxembourg|portugal)"
        ))),
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("devis.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(company) = patch.company {
            if let Some(name) = company.name {
                self.company.name = name;
            }
            if let Some(address) = company.address {
                self.company.address = address;
            }
            if let Some(phone) = company.phone {
                self.company.phone = Some(phone);
            }
            if let Some(email) = company.email {
                self.company.email = Some(email);
            }
            if let Some(vat_number) = company.vat_number {
                self.company.vat_number = Some(vat_number);
            }
            if let Some(default_market) = company.default_market {
                self.company.default_market = default_market;
            }
            if let Some(default_iva) = company.default_iva {
                self.company.default_iva = default_iva;
            }
            if let Some(default_validity_days) = company.default_validity_days {
                self.company.default_validity_days = default_validity_days;
            }
            if let Some(default_payment_conditions) = company.default_payment_conditions {
                self.company.default_payment_conditions = Some(default_payment_conditions);
            }
            if let Some(currency) = company.currency {
                self.company.currency = currency;
            }
        }

        if let Some(pdf) = patch.pdf {
            if let Some(templates_dir) = pdf.templates_dir {
                self.pdf.templates_dir = templates_dir;
            }
            if let Some(wkhtmltopdf_path) = pdf.wkhtmltopdf_path {
                self.pdf.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DEVIS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("DEVIS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("DEVIS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("DEVIS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("DEVIS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DEVIS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DEVIS_SERVER_PORT") {
            self.server.port = parse_u16("DEVIS_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DEVIS_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("DEVIS_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("DEVIS_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("DEVIS_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("DEVIS_COMPANY_NAME") {
            self.company.name = value;
        }
        if let Some(value) = read_env("DEVIS_COMPANY_ADDRESS") {
            self.company.address = value;
        }
        if let Some(value) = read_env("DEVIS_COMPANY_VAT_NUMBER") {
            self.company.vat_number = Some(value);
        }
        if let Some(value) = read_env("DEVIS_COMPANY_DEFAULT_MARKET") {
            self.company.default_market = parse_market(&value)?;
        }
        if let Some(value) = read_env("DEVIS_COMPANY_DEFAULT_IVA") {
            self.company.default_iva = parse_decimal("DEVIS_COMPANY_DEFAULT_IVA", &value)?;
        }
        if let Some(value) = read_env("DEVIS_COMPANY_DEFAULT_VALIDITY_DAYS") {
            self.company.default_validity_days =
                parse_u32("DEVIS_COMPANY_DEFAULT_VALIDITY_DAYS", &value)?;
        }
        if let Some(value) = read_env("DEVIS_COMPANY_DEFAULT_PAYMENT_CONDITIONS") {
            self.company.default_payment_conditions = Some(value);
        }
        if let Some(value) = read_env("DEVIS_COMPANY_CURRENCY") {
            self.company.currency = value;
        }

        if let Some(value) = read_env("DEVIS_PDF_TEMPLATES_DIR") {
            self.pdf.templates_dir = value;
        }
        if let Some(value) = read_env("DEVIS_PDF_WKHTMLTOPDF_PATH") {
            self.pdf.wkhtmltopdf_path = Some(value);
        }

        let log_level = read_env("DEVIS_LOGGING_LEVEL").or_else(|| read_env("DEVIS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("DEVIS_LOGGING_FORMAT").or_else(|| read_env("DEVIS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(wkhtmltopdf_path) = overrides.wkhtmltopdf_path {
            self.pdf.wkhtmltopdf_path = Some(wkhtmltopdf_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_company(&self.company)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("devis.toml"), PathBuf::from("config/devis.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must differ".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_company(company: &CompanyConfig) -> Result<(), ConfigError> {
    if company.name.trim().is_empty() {
        return Err(ConfigError::Validation("company.name must not be blank".to_string()));
    }

    if let Some(email) = &company.email {
        if !email.contains('@') {
            return Err(ConfigError::Validation(
                "company.email must contain an `@`".to_string(),
            ));
        }
    }

    if company.default_iva.is_sign_negative() || company.default_iva > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "company.default_iva must be in range 0..=100".to_string(),
        ));
    }

    if company.default_validity_days == 0 {
        return Err(ConfigError::Validation(
            "company.default_validity_days must be greater than zero".to_string(),
        ));
    }

    if company.currency.trim().is_empty() {
        return Err(ConfigError::Validation("company.currency must not be blank".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    company: Option<CompanyPatch>,
    pdf: Option<PdfPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompanyPatch {
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    vat_number: Option<String>,
    default_market: Option<Market>,
    default_iva: Option<Decimal>,
    default_validity_days: Option<u32>,
    default_payment_conditions: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfPatch {
    templates_dir: Option<String>,
    wkhtmltopdf_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use crate::domain::labor::Market;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_pass_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.database.url == "sqlite://devis.db", "default database url")?;
        ensure(config.server.port == 3000, "default server port")?;
        ensure(config.company.default_market == Market::Luxembourg, "default market")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default log format")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_COMPANY_VAT", "LU12345678");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("devis.toml");
            fs::write(
                &path,
                r#"
[company]
name = "Renovations Morais"
vat_number = "${TEST_COMPANY_VAT}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.company.name == "Renovations Morais", "company name from file")?;
            ensure(
                config.company.vat_number.as_deref() == Some("LU12345678"),
                "vat number should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_COMPANY_VAT"]);
        result
    }

    #[test]
    fn company_quote_defaults_load_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("devis.toml");
        fs::write(
            &path,
            r#"
[company]
name = "Renovations Morais"
default_iva = 23
default_validity_days = 60
default_payment_conditions = "50% à la commande, solde à la réception"
currency = "EUR"
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.company.default_iva == rust_decimal::Decimal::new(23, 0), "iva from file")?;
        ensure(config.company.default_validity_days == 60, "validity from file")?;
        ensure(
            config.company.default_payment_conditions.as_deref()
                == Some("50% à la commande, solde à la réception"),
            "payment conditions from file",
        )?;
        ensure(config.company.currency == "EUR", "currency from file")
    }

    #[test]
    fn zero_validity_default_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEVIS_COMPANY_DEFAULT_VALIDITY_DAYS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            let mentions_key = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("company.default_validity_days")
            );
            ensure(mentions_key, "error should name the offending key")
        })();

        clear_vars(&["DEVIS_COMPANY_DEFAULT_VALIDITY_DAYS"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEVIS_LOG_LEVEL", "warn");
        env::set_var("DEVIS_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["DEVIS_LOG_LEVEL", "DEVIS_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEVIS_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("DEVIS_SERVER_PORT", "4100");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("devis.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[server]
port = 4000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 4100, "env port should win over file")
        })();

        clear_vars(&["DEVIS_DATABASE_URL", "DEVIS_SERVER_PORT"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEVIS_SERVER_PORT", "not-a-port");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure".to_string()),
                Err(error) => error,
            };
            let has_key = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. } if key == "DEVIS_SERVER_PORT"
            );
            ensure(has_key, "error should carry the offending key")
        })();

        clear_vars(&["DEVIS_SERVER_PORT"]);
        result
    }

    #[test]
    fn validation_rejects_port_collision() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DEVIS_SERVER_PORT", "8080");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("health_check_port")
            );
            ensure(has_message, "validation failure should mention health_check_port")
        })();

        clear_vars(&["DEVIS_SERVER_PORT"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let missing = std::path::PathBuf::from("/nonexistent/devis.toml");
        let error = match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file error".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref path) if *path == missing),
            "error should carry the expected path",
        )
    }
}
