// src/shared/error.rs

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Erro de validação de um campo específico, no formato `{ field, message }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Erro da aplicação. Cada variante define o status HTTP da resposta.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Dados inválidos")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Tempo limite excedido: {0}")]
    Timeout(String),

    #[error("Erro de armazenamento: {0}")]
    Storage(String),

    #[error("Erro interno: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Corpo padrão das respostas de erro: `{ success: false, error | errors }`.
#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(errors) => {
                return HttpResponse::build(self.status_code()).json(ErrorBody {
                    success: false,
                    error: None,
                    errors: Some(errors),
                });
            }
            // Detalhes de infraestrutura ficam só no log
            AppError::Storage(detail) => {
                error!(target: "database", error = %detail, "Falha no armazenamento");
                "Erro no servidor"
            }
            AppError::Internal(detail) => {
                error!(target: "internal", error = %detail, "Erro interno");
                "Erro no servidor"
            }
            AppError::Timeout(detail) => {
                error!(error = %detail, "Operação excedeu o tempo limite");
                "Servidor ocupado, tente novamente"
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.as_str(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            error: Some(message),
            errors: None,
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if let Some(erro) = db.code().as_deref().and_then(erro_por_sqlstate) {
                return erro;
            }
        }
        AppError::Storage(e.to_string())
    }
}

/// Códigos SQLSTATE do PostgreSQL que não são falha de infraestrutura.
fn erro_por_sqlstate(code: &str) -> Option<AppError> {
    let erro = match code {
        // unique_violation
        "23505" => AppError::Conflict("Registro duplicado".to_string()),
        // foreign_key_violation
        "23503" => AppError::BadRequest("Registro referenciado não existe".to_string()),
        // check_violation, numeric_value_out_of_range
        "23514" | "22003" => AppError::BadRequest("Valor fora do intervalo permitido".to_string()),
        // query_canceled: estourou o statement_timeout
        "57014" => AppError::Timeout("comando cancelado pelo statement_timeout".to_string()),
        _ => return None,
    };
    Some(erro)
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(flatten_validation_errors(&errors))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("Falha ao gerar token: {}", e))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Falha no hash da senha: {}", e))
    }
}

/// Faz os extratores (JSON, path e query) responderem no envelope de erro da API.
pub fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("JSON inválido: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Parâmetro inválido: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Query inválida: {}", err)).into()
    }));
}

/// Converte os erros do `validator` numa lista plana de `{ field, message }`.
///
/// Campos aninhados viram caminhos como `items[0].quantity`. A lista sai
/// ordenada pelo caminho para que a resposta seja estável.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_field_errors(errors, "", &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect_field_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        // O validator usa os nomes dos campos em Rust; a API fala camelCase
        let name = to_camel_case(field);
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{}.{}", prefix, name)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let message = match &e.message {
                        Some(m) => m.to_string(),
                        None => format!("Valor inválido ({})", e.code),
                    };
                    out.push(FieldError {
                        field: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
