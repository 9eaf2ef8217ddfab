// src/usuarios/usuario_router.rs

use actix_web::{get, post, put, web, HttpResponse};
use bcrypt::{hash, verify};
use sqlx::query_as;
use tracing::info;
use validator::Validate;

// Importa as structs do módulo de usuários
use super::auth_middleware::{gerar_token, AuthenticatedUser};
use super::usuario_structs::{AuthResponse, LoginRequest, NovoUsuario, TrocaSenhaRequest, Usuario};
use crate::shared::error::{AppError, AppResult};
use crate::shared::shared_structs::{Empty, GenericResponse};
// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;

// Custo do bcrypt para senhas novas
const BCRYPT_COST: u32 = 10;

const COLUNAS_USUARIO: &str = "id, name, email, password_hash, role, created_at";

/// Registra as rotas de autenticação.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(cadastrar_usuario)
        .service(login_usuario)
        .service(usuario_logado)
        .service(logout_usuario)
        .service(atualizar_senha);
}

fn credenciais_invalidas() -> AppError {
    AppError::Unauthorized("E-mail ou senha incorretos".to_string())
}

async fn gerar_hash_senha(password: String) -> AppResult<String> {
    // bcrypt é caro: roda fora do worker do actix
    web::block(move || hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Falha ao agendar hash: {}", e)))?
        .map_err(AppError::from)
}

async fn senha_confere(password: String, password_hash: String) -> AppResult<bool> {
    web::block(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Falha ao agendar verificação: {}", e)))?
        .map_err(AppError::from)
}

async fn buscar_usuario_por_email(data: &AppState, email: &str) -> AppResult<Option<Usuario>> {
    let sql = format!("SELECT {} FROM users WHERE email = $1", COLUNAS_USUARIO);
    Ok(query_as::<_, Usuario>(&sql)
        .bind(email)
        .fetch_optional(&data.db_pool)
        .await?)
}

async fn buscar_usuario_por_id(data: &AppState, id: i32) -> AppResult<Usuario> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", COLUNAS_USUARIO);
    query_as::<_, Usuario>(&sql)
        .bind(id)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))
}

fn resposta_com_token(data: &AppState, usuario: &Usuario) -> AppResult<HttpResponse> {
    let token = gerar_token(usuario, &data.jwt_secret, data.jwt_expire_hours)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        success: true,
        token,
    }))
}

/// Rota para cadastrar um novo usuário.
#[post("/auth/register")]
pub async fn cadastrar_usuario(
    data: web::Data<AppState>,
    novo_usuario: web::Json<NovoUsuario>,
) -> AppResult<HttpResponse> {
    let novo_usuario = novo_usuario.into_inner();
    novo_usuario.validate()?;

    // 1. Verificar se o e-mail já está em uso
    if buscar_usuario_por_email(&data, &novo_usuario.email).await?.is_some() {
        return Err(AppError::Conflict("E-mail já cadastrado.".to_string()));
    }

    // 2. Hash da senha
    let password_hash = gerar_hash_senha(novo_usuario.password).await?;

    // 3. Inserir o novo usuário no banco de dados
    let sql = format!(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
        COLUNAS_USUARIO
    );
    let usuario = query_as::<_, Usuario>(&sql)
        .bind(&novo_usuario.name)
        .bind(&novo_usuario.email)
        .bind(&password_hash)
        .bind(novo_usuario.role.unwrap_or_default().as_str())
        .fetch_one(&data.db_pool)
        .await?;

    info!(user_id = usuario.id, role = %usuario.role, "Usuário cadastrado");
    resposta_com_token(&data, &usuario)
}

/// Rota para login de usuário.
#[post("/auth/login")]
pub async fn login_usuario(
    data: web::Data<AppState>,
    login_request: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let login_request = login_request.into_inner();
    login_request.validate()?;

    // 1. Buscar o usuário pelo e-mail
    let usuario = buscar_usuario_por_email(&data, &login_request.email)
        .await?
        .ok_or_else(credenciais_invalidas)?;

    // 2. Verificar a senha
    if !senha_confere(login_request.password, usuario.password_hash.clone()).await? {
        return Err(credenciais_invalidas());
    }

    // 3. Retornar o token
    resposta_com_token(&data, &usuario)
}

/// Dados do usuário logado.
#[get("/auth/me")]
pub async fn usuario_logado(data: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
    let usuario = buscar_usuario_por_id(&data, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(usuario)))
}

/// Logout. Tokens são stateless: basta o cliente descartá-lo.
#[post("/auth/logout")]
pub async fn logout_usuario() -> HttpResponse {
    HttpResponse::Ok().json(GenericResponse::ok(Empty::default()))
}

/// Troca a senha do usuário logado e devolve um novo token.
#[put("/auth/updatepassword")]
pub async fn atualizar_senha(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    body: web::Json<TrocaSenhaRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    body.validate()?;

    let usuario = buscar_usuario_por_id(&data, auth.user_id).await?;
    if !senha_confere(body.current_password, usuario.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("Senha atual incorreta".to_string()));
    }

    let password_hash = gerar_hash_senha(body.new_password).await?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(&password_hash)
        .bind(usuario.id)
        .execute(&data.db_pool)
        .await?;

    info!(user_id = usuario.id, "Senha atualizada");
    resposta_com_token(&data, &usuario)
}
