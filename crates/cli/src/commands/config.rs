use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use devis_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let field = |key: &str, env_key: &str, value: &str| {
        render_line(
            key,
            value,
            field_source(key, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref()),
        )
    };

    lines.push(field("database.url", "DEVIS_DATABASE_URL", &config.database.url));
    lines.push(field(
        "database.max_connections",
        "DEVIS_DATABASE_MAX_CONNECTIONS",
        &config.database.max_connections.to_string(),
    ));
    lines.push(field(
        "database.timeout_secs",
        "DEVIS_DATABASE_TIMEOUT_SECS",
        &config.database.timeout_secs.to_string(),
    ));

    lines.push(field("server.bind_address", "DEVIS_SERVER_BIND_ADDRESS", &config.server.bind_address));
    lines.push(field("server.port", "DEVIS_SERVER_PORT", &config.server.port.to_string()));
    lines.push(field(
        "server.health_check_port",
        "DEVIS_SERVER_HEALTH_CHECK_PORT",
        &config.server.health_check_port.to_string(),
    ));

    lines.push(field("company.name", "DEVIS_COMPANY_NAME", &config.company.name));
    lines.push(field(
        "company.default_market",
        "DEVIS_COMPANY_DEFAULT_MARKET",
        &format!("{:?}", config.company.default_market),
    ));
    lines.push(field(
        "company.default_iva",
        "DEVIS_COMPANY_DEFAULT_IVA",
        &config.company.default_iva.to_string(),
    ));
    lines.push(field(
        "company.default_validity_days",
        "DEVIS_COMPANY_DEFAULT_VALIDITY_DAYS",
        &config.company.default_validity_days.to_string(),
    ));
    lines.push(field("company.currency", "DEVIS_COMPANY_CURRENCY", &config.company.currency));

    lines.push(field("pdf.templates_dir", "DEVIS_PDF_TEMPLATES_DIR", &config.pdf.templates_dir));
    lines.push(field(
        "pdf.wkhtmltopdf_path",
        "DEVIS_PDF_WKHTMLTOPDF_PATH",
        config.pdf.wkhtmltopdf_path.as_deref().unwrap_or("<unset>"),
    ));

    lines.push(field("logging.level", "DEVIS_LOGGING_LEVEL", &config.logging.level));
    lines.push(field(
        "logging.format",
        "DEVIS_LOGGING_FORMAT",
        &format!("{:?}", config.logging.format),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("devis.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/devis.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, field_source, render_line};
    use toml::Value;

    #[test]
    fn file_backed_fields_report_the_file_source() {
        let doc: Value = "[database]\nurl = \"sqlite://custom.db\"\n".parse().unwrap();
        let source = field_source(
            "database.url",
            None,
            Some(&doc),
            Some(std::path::Path::new("devis.toml")),
        );
        assert_eq!(source, "file (devis.toml)");
    }

    #[test]
    fn missing_fields_fall_back_to_default_source() {
        let doc: Value = "[database]\nurl = \"sqlite://custom.db\"\n".parse().unwrap();
        assert!(!contains_path(&doc, "server.port"));
        let source =
            field_source("server.port", None, Some(&doc), Some(std::path::Path::new("devis.toml")));
        assert_eq!(source, "default");
    }

    #[test]
    fn render_line_is_stable() {
        assert_eq!(
            render_line("database.url", "sqlite://devis.db", "default".to_string()),
            "- database.url = sqlite://devis.db (source: default)"
        );
    }
}
