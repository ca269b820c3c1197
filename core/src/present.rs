//! Renders client failures as display strings and alert markup.
//!
//! # Design
//! One presenter, two styles. `Friendly` maps status codes and the API's
//! known `detail` strings to curated Portuguese messages; `Detailed` dumps
//! the detail (field path, message and type for validation lists) and is
//! meant for debugging. Both fall back to `"Erro: <message>"`.

use tracing::error;

use crate::config::{ClientConfig, ErrorStyle};
use crate::error::ApiError;
use crate::types::{ErrorDetail, FieldError};

const MSG_BAD_CREDENTIALS: &str = "Usuário ou senha incorretos.";
const MSG_SESSION_EXPIRED: &str = "Sua sessão expirou. Faça login novamente.";
const MSG_UNAUTHORIZED: &str = "Acesso não autorizado. Faça login novamente.";
const MSG_FORBIDDEN: &str = "Você não tem permissão para realizar esta ação.";
const MSG_PRODUCT_NOT_FOUND: &str = "Produto não encontrado.";
const MSG_NOT_FOUND: &str = "Recurso não encontrado.";
const MSG_USERNAME_TAKEN: &str = "Este nome de usuário já está em uso.";
const MSG_EMAIL_TAKEN: &str = "Este e-mail já está cadastrado.";
const MSG_USER_CONFLICT: &str = "Nome de usuário ou e-mail já cadastrado.";
const MSG_CONFLICT: &str = "Este registro já existe.";
const MSG_INVALID_DATA: &str = "Dados inválidos.";

/// A place the presenter writes into, e.g. a DOM element.
pub trait OutputRegion {
    fn set_inner_html(&mut self, html: &str);
    fn set_text_content(&mut self, text: &str);
}

/// In-memory `OutputRegion`; holds whatever was written last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRegion {
    pub html: String,
    pub text: String,
}

impl OutputRegion for MemoryRegion {
    fn set_inner_html(&mut self, html: &str) {
        self.html = html.to_string();
        self.text.clear();
    }

    fn set_text_content(&mut self, text: &str) {
        self.text = text.to_string();
        self.html.clear();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPresenter {
    style: ErrorStyle,
}

impl ErrorPresenter {
    pub fn new(style: ErrorStyle) -> Self {
        Self { style }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.error_style)
    }

    pub fn style(&self) -> ErrorStyle {
        self.style
    }

    /// The display string for `err`.
    pub fn message(&self, err: &ApiError) -> String {
        let specific = match self.style {
            ErrorStyle::Friendly => friendly_message(err),
            ErrorStyle::Detailed => detailed_message(err),
        };
        specific.unwrap_or_else(|| format!("Erro: {err}"))
    }

    /// Write the alert for `err` into `alert`, clear `result` if given, and
    /// return the message that was shown.
    pub fn present(
        &self,
        err: &ApiError,
        alert: &mut dyn OutputRegion,
        result: Option<&mut dyn OutputRegion>,
    ) -> String {
        error!(error = %err, status = ?err.status(), "request failed");
        let message = self.message(err);
        alert.set_inner_html(&render_alert(&message));
        if let Some(result) = result {
            result.set_text_content("");
        }
        message
    }
}

/// `<div class="alert alert-error">…</div>` with the message HTML-escaped.
pub fn render_alert(message: &str) -> String {
    format!(r#"<div class="alert alert-error">{}</div>"#, escape_html(message))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn friendly_message(err: &ApiError) -> Option<String> {
    let ApiError::Api { status, .. } = err else {
        return None;
    };
    let detail = err.error_detail();
    let text = match &detail {
        Some(ErrorDetail::Message(s)) => Some(s.as_str()),
        _ => None,
    };

    let message = match (*status, text) {
        (401, Some("Incorrect username or password" | "Incorrect email or password")) => {
            MSG_BAD_CREDENTIALS.to_string()
        }
        (401, Some("Could not validate credentials" | "Not authenticated")) => MSG_SESSION_EXPIRED.to_string(),
        (401, _) => MSG_UNAUTHORIZED.to_string(),
        (403, _) => MSG_FORBIDDEN.to_string(),
        (404, Some("Product not found" | "Product(s) not found")) => MSG_PRODUCT_NOT_FOUND.to_string(),
        (404, Some(d)) => d.to_string(),
        (404, None) => MSG_NOT_FOUND.to_string(),
        (409, Some("Username already exists")) => MSG_USERNAME_TAKEN.to_string(),
        (409, Some("Email already exists")) => MSG_EMAIL_TAKEN.to_string(),
        (409, Some("Username or Email already exists")) => MSG_USER_CONFLICT.to_string(),
        (409, Some(d)) => d.to_string(),
        (409, None) => MSG_CONFLICT.to_string(),
        (_, Some(d)) => format!("Erro: {d}"),
        (status, None) => match &detail {
            Some(ErrorDetail::Validation(errors)) if !errors.is_empty() => field_lines(errors),
            _ if status == 422 => MSG_INVALID_DATA.to_string(),
            _ => return None,
        },
    };
    Some(message)
}

/// One `Campo '<field>': <msg>` line per record, separated by a blank line.
fn field_lines(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| {
            let field = e
                .field()
                .map(|f| f.to_string())
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| "N/A".to_string());
            let msg = non_empty(e.msg.as_deref()).unwrap_or("Erro desconhecido");
            format!("Campo '{field}': {msg}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn detailed_message(err: &ApiError) -> Option<String> {
    match err.error_detail()? {
        ErrorDetail::Message(s) => Some(format!("{err}: {s}")),
        ErrorDetail::Validation(errors) => Some(format!("Erro:\n\n{}", validation_blocks(&errors))),
        ErrorDetail::Other(value) => {
            let dump = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            Some(format!("Erro:\n\n{dump}"))
        }
    }
}

fn validation_blocks(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| {
            let loc = if e.loc.is_empty() {
                "N/A".to_string()
            } else {
                e.loc.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" -> ")
            };
            let msg = non_empty(e.msg.as_deref()).unwrap_or("Erro desconhecido");
            let kind = non_empty(e.kind.as_deref()).unwrap_or("N/A");
            format!("Local: {loc}\nMensagem: {msg}\nTipo: {kind}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}
