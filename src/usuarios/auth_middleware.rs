// src/usuarios/auth_middleware.rs

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::warn;

// Importa as Claims e o papel do módulo de structs de usuário
use super::usuario_structs::{Claims, Papel, Usuario};
use crate::shared::error::{AppError, AppResult};
// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;

/// Usuário autenticado, montado a partir das claims do JWT.
/// Será extraído das requisições protegidas.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub user_name: String,
    pub user_email: String,
    pub role: Papel,
}

impl AuthenticatedUser {
    /// Garante que o papel do usuário está entre os permitidos (403 caso contrário).
    pub fn exigir_papel(&self, allowed: &[Papel]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Papel {} não tem permissão para acessar esta rota",
                self.role
            )))
        }
    }
}

/// Gera o token JWT (HS256) de um usuário.
pub fn gerar_token(usuario: &Usuario, secret: &str, expire_hours: i64) -> AppResult<String> {
    let claims = Claims {
        sub: usuario.id,
        name: usuario.name.clone(),
        email: usuario.email.clone(),
        role: usuario.role,
        exp: (Utc::now() + Duration::hours(expire_hours)).timestamp(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Decodifica e valida um token, traduzindo as falhas para 401.
pub fn validar_token(token: &str, secret: &str) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            warn!(error = ?e, "JWT rejeitado");
            let message = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token expirado.",
                jsonwebtoken::errors::ErrorKind::InvalidSignature => "Assinatura do token inválida.",
                jsonwebtoken::errors::ErrorKind::InvalidToken => "Token malformado.",
                _ => "Token de autenticação inválido.",
            };
            AppError::Unauthorized(message.to_string())
        })
}

/// Extrator de autenticação para Actix Web.
/// Valida o token JWT presente no cabeçalho `Authorization: Bearer <token>`.
impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(autenticar(req))
    }
}

fn autenticar(req: &HttpRequest) -> AppResult<AuthenticatedUser> {
    // Acessa o AppState para obter a chave secreta JWT
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("AppState não registrado no App".to_string()))?;

    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Token de autenticação ausente.".to_string()))?;

    let header_str = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Token de autenticação inválido.".to_string()))?;

    // Verifica se o cabeçalho começa com "Bearer "
    let token = header_str.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Formato de token inválido. Esperado 'Bearer <token>'.".to_string())
    })?;

    let claims = validar_token(token.trim(), &state.jwt_secret)?;

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        user_name: claims.name,
        user_email: claims.email,
        role: claims.role,
    })
}
