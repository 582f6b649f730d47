//! PDF export for quotes.
//!
//! Renders a fully-priced quote through a Tera HTML template and converts
//! the result with `wkhtmltopdf` when the binary is available. Without it
//! the rendered HTML is returned as-is for browser printing.

use std::collections::HashMap;
use std::process::Stdio;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use devis_core::config::{CompanyConfig, PdfConfig};
use devis_core::Quote;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Register custom Tera filters used by quote templates.
///
/// - `money`: 2-decimal rendering, e.g. `amount | money`. Accepts both
///   numbers and decimal amounts serialized as strings.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let num = match value {
        tera::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        tera::Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(tera::Value::String(format!("{:.2}", num)))
}

/// Strip characters the renderer cannot place: control characters and
/// anything outside printable ASCII / Latin-1.
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            let code = *c as u32;
            (0x20..0x7f).contains(&code) || (0xa0..=0xff).contains(&code)
        })
        .collect()
}

/// Walk a JSON value and sanitize every string in place.
fn sanitize_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = sanitize_text(s),
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_json(item);
            }
        }
        serde_json::Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                sanitize_json(item);
            }
        }
        _ => {}
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct PdfGenerator {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl PdfGenerator {
    /// Create a generator from configuration. Templates come from the
    /// configured directory; a configured converter path wins over PATH
    /// discovery.
    pub fn new(config: &PdfConfig) -> Result<Self, PdfError> {
        let mut tera = Tera::new(&format!("{}/**/*", config.templates_dir))
            .map_err(|e| PdfError::Template(e.to_string()))?;
        register_template_filters(&mut tera);

        let wkhtmltopdf_path = config
            .wkhtmltopdf_path
            .clone()
            .or_else(|| which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string()));

        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path, "wkhtmltopdf found"),
            None => warn!("wkhtmltopdf not found in PATH, quote export will fall back to HTML"),
        }

        Ok(Self { tera, wkhtmltopdf_path })
    }

    /// Create a generator backed by the compiled-in template. Used when the
    /// filesystem template directory is unavailable.
    pub fn with_embedded_templates() -> Self {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);

        if let Err(error) = tera.add_raw_template(
            "devis.html.tera",
            include_str!("../../../templates/quotes/devis.html.tera"),
        ) {
            error!(error = %error, "embedded quote template failed to load");
        }

        let wkhtmltopdf_path =
            which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());

        Self { tera, wkhtmltopdf_path }
    }

    /// Render a quote to PDF bytes, or HTML when no converter is available.
    pub async fn generate_quote_pdf(
        &self,
        quote: &Quote,
        company: &CompanyConfig,
    ) -> Result<PdfResult, PdfError> {
        let html = self.render_quote_html(quote, company)?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => Ok(PdfResult::Pdf(pdf_bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                    Ok(PdfResult::Html(html))
                }
            }
        } else {
            Ok(PdfResult::Html(html))
        }
    }

    /// Render the quote HTML without conversion, for browser printing.
    pub fn render_quote_html(
        &self,
        quote: &Quote,
        company: &CompanyConfig,
    ) -> Result<String, PdfError> {
        let mut quote_value =
            serde_json::to_value(quote).map_err(|e| PdfError::Serialize(e.to_string()))?;
        sanitize_json(&mut quote_value);

        let mut context = Context::new();
        context.insert("quote", &quote_value);
        context.insert(
            "company",
            &serde_json::json!({
                "name": sanitize_text(&company.name),
                "address": sanitize_text(&company.address),
                "phone": company.phone.as_deref().map(sanitize_text),
                "email": company.email.as_deref().map(sanitize_text),
                "vat_number": company.vat_number.as_deref().map(sanitize_text),
            }),
        );
        context.insert("issued_on", &quote.created_at.format("%d/%m/%Y").to_string());
        context.insert("has_discount", &!quote.discount_amount.is_zero());
        context.insert("currency", &currency_symbol(&company.currency));

        self.tera
            .render("devis.html.tera", &context)
            .map_err(|e| PdfError::Template(e.to_string()))
    }
}

fn currency_symbol(code: &str) -> String {
    match code.trim().to_ascii_uppercase().as_str() {
        "EUR" => "€".to_string(),
        "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        other => other.to_string(),
    }
}

async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, PdfError> {
    let temp_dir = std::env::temp_dir();
    let stem = uuid::Uuid::new_v4().simple().to_string();
    let html_path = temp_dir.join(format!("devis_{stem}.html"));
    let pdf_path = temp_dir.join(format!("devis_{stem}.pdf"));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg("--enable-local-file-access")
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        let _ = tokio::fs::remove_file(&html_path).await;
        return Err(PdfError::Conversion(stderr.to_string()));
    }

    let pdf_bytes = tokio::fs::read(&pdf_path).await?;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    info!(size = pdf_bytes.len(), "PDF generated successfully");

    Ok(pdf_bytes)
}

/// Result of quote export.
pub enum PdfResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl PdfResult {
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            PdfResult::Pdf(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                Body::from(bytes),
            )
                .into_response(),
            PdfResult::Html(html) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8".to_string())],
                Body::from(html),
            )
                .into_response(),
        }
    }
}
