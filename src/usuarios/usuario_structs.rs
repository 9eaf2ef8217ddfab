// src/usuarios/usuario_structs.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::Validate;

use crate::shared::shared_structs::wire_enum;

wire_enum! {
    /// Papel do usuário no sistema.
    #[derive(Default)]
    pub enum Papel {
        Admin => "admin",
        #[default]
        Atendente => "staff",
    }
}

/// Estrutura que representa um usuário no banco de dados.
/// A senha é armazenada como hash e nunca é serializada.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Papel,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Usuario {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Usuario {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Estrutura para receber dados de um novo usuário na requisição de cadastro.
#[derive(Deserialize, Validate)]
pub struct NovoUsuario {
    #[validate(length(min = 1, max = 50, message = "Nome deve ter entre 1 e 50 caracteres"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "Senha deve ter pelo menos 6 caracteres"))]
    pub password: String, // Senha em texto claro (será hashed antes de salvar)
    pub role: Option<Papel>,
}

/// Estrutura para receber dados de login do usuário.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "Senha é obrigatória"))]
    pub password: String,
}

/// Corpo de `PUT /auth/updatepassword`.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrocaSenhaRequest {
    #[validate(length(min = 1, message = "Senha atual é obrigatória"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Nova senha deve ter pelo menos 6 caracteres"))]
    pub new_password: String,
}

/// Estrutura para o payload do JWT (Claims).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // Subject (ID do usuário)
    pub name: String,
    pub email: String,
    pub role: Papel,
    pub exp: i64, // Expiration Time (timestamp Unix)
}

/// Resposta de cadastro, login e troca de senha.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
}
