// src/clientes/cliente_router.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::query_as;
use tracing::info;
use validator::Validate;

// Importa as structs de cliente
use super::cliente_structs::{AtualizacaoCliente, Cliente, NovoCliente};
use crate::shared::error::{AppError, AppResult};
use crate::shared::shared_structs::{Empty, GenericResponse};
use crate::usuarios::auth_middleware::AuthenticatedUser;
// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;

const COLUNAS_CLIENTE: &str = "id, name, email, phone, address, join_date, total_orders, \
     total_spent, notes, created_at, updated_at";

/// Registra as rotas de clientes. `/customers/count` vem antes de `{id}`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(buscar_clientes)
        .service(contar_clientes)
        .service(buscar_cliente_por_id)
        .service(cadastrar_cliente)
        .service(atualizar_cliente)
        .service(deletar_cliente);
}

pub fn cliente_nao_encontrado(id: i32) -> AppError {
    AppError::NotFound(format!("Cliente com id {} não encontrado", id))
}

/// Rota para buscar todos os clientes.
#[get("/customers")]
pub async fn buscar_clientes(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let sql = format!("SELECT {} FROM customers ORDER BY created_at DESC, id DESC", COLUNAS_CLIENTE);
    let clientes = query_as::<_, Cliente>(&sql).fetch_all(&data.db_pool).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(clientes)))
}

#[get("/customers/count")]
pub async fn contar_clientes(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
        .fetch_one(&data.db_pool)
        .await?;
    Ok(HttpResponse::Ok().json(GenericResponse::count_only(count.max(0) as usize)))
}

/// Rota para buscar um cliente por ID.
#[get("/customers/{id}")]
pub async fn buscar_cliente_por_id(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let sql = format!("SELECT {} FROM customers WHERE id = $1", COLUNAS_CLIENTE);
    let cliente = query_as::<_, Cliente>(&sql)
        .bind(id)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| cliente_nao_encontrado(id))?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(cliente)))
}

/// Rota para cadastrar um novo cliente.
#[post("/customers")]
pub async fn cadastrar_cliente(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    item: web::Json<NovoCliente>,
) -> AppResult<HttpResponse> {
    let item = item.into_inner();
    item.validate()?;

    let sql = format!(
        "INSERT INTO customers (name, email, phone, address, join_date, notes) \
         VALUES ($1, $2, $3, $4, COALESCE($5, now()), $6) RETURNING {}",
        COLUNAS_CLIENTE
    );
    let cliente = query_as::<_, Cliente>(&sql)
        .bind(&item.name)
        .bind(&item.email)
        .bind(&item.phone)
        .bind(&item.address)
        .bind(item.join_date)
        .bind(&item.notes)
        .fetch_one(&data.db_pool)
        .await?;

    info!(cliente_id = cliente.id, user_id = auth.user_id, "Cliente cadastrado");
    Ok(HttpResponse::Created().json(GenericResponse::ok(cliente)))
}

/// Rota para atualizar um cliente existente.
#[put("/customers/{id}")]
pub async fn atualizar_cliente(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
    patch: web::Json<AtualizacaoCliente>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let patch = patch.into_inner();
    patch.validate()?;

    let sql = format!(
        "UPDATE customers SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             phone = COALESCE($4, phone), \
             address = COALESCE($5, address), \
             join_date = COALESCE($6, join_date), \
             notes = COALESCE($7, notes), \
             updated_at = now() \
         WHERE id = $1 RETURNING {}",
        COLUNAS_CLIENTE
    );
    let cliente = query_as::<_, Cliente>(&sql)
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(&patch.address)
        .bind(patch.join_date)
        .bind(&patch.notes)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| cliente_nao_encontrado(id))?;

    info!(cliente_id = id, user_id = auth.user_id, "Cliente atualizado");
    Ok(HttpResponse::Ok().json(GenericResponse::ok(cliente)))
}

/// Rota para deletar um cliente. As vendas dele ficam sem cliente (`ON DELETE SET NULL`).
#[delete("/customers/{id}")]
pub async fn deletar_cliente(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(&data.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(cliente_nao_encontrado(id));
    }

    info!(cliente_id = id, user_id = auth.user_id, "Cliente removido");
    Ok(HttpResponse::Ok().json(GenericResponse::ok(Empty::default())))
}
