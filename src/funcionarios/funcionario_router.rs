// src/funcionarios/funcionario_router.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::query_as;
use tracing::info;
use validator::Validate;

// Importa as structs de funcionário
use super::funcionario_structs::{AtualizacaoFuncionario, Funcionario, NovoFuncionario};
use crate::shared::error::{AppError, AppResult};
use crate::shared::shared_structs::{Empty, GenericResponse};
use crate::usuarios::auth_middleware::AuthenticatedUser;
use crate::usuarios::usuario_structs::Papel;
// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;

const COLUNAS_FUNCIONARIO: &str = "id, name, email, phone, position, salary, join_date, \
     address, status, notes, created_at, updated_at";

/// Registra as rotas de funcionários. `/employees/count` vem antes de `{id}`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(buscar_funcionarios)
        .service(contar_funcionarios)
        .service(buscar_funcionario_por_id)
        .service(cadastrar_funcionario)
        .service(atualizar_funcionario)
        .service(deletar_funcionario);
}

pub fn funcionario_nao_encontrado(id: i32) -> AppError {
    AppError::NotFound(format!("Funcionário com id {} não encontrado", id))
}

/// Rota para buscar todos os funcionários.
#[get("/employees")]
pub async fn buscar_funcionarios(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let sql = format!("SELECT {} FROM employees ORDER BY created_at DESC, id DESC", COLUNAS_FUNCIONARIO);
    let funcionarios = query_as::<_, Funcionario>(&sql).fetch_all(&data.db_pool).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(funcionarios)))
}

#[get("/employees/count")]
pub async fn contar_funcionarios(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employees")
        .fetch_one(&data.db_pool)
        .await?;
    Ok(HttpResponse::Ok().json(GenericResponse::count_only(count.max(0) as usize)))
}

#[get("/employees/{id}")]
pub async fn buscar_funcionario_por_id(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let sql = format!("SELECT {} FROM employees WHERE id = $1", COLUNAS_FUNCIONARIO);
    let funcionario = query_as::<_, Funcionario>(&sql)
        .bind(id)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| funcionario_nao_encontrado(id))?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(funcionario)))
}

/// Rota para cadastrar um funcionário (somente admin). E-mail repetido responde 409.
#[post("/employees")]
pub async fn cadastrar_funcionario(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    item: web::Json<NovoFuncionario>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(&[Papel::Admin])?;
    let item = item.into_inner();
    item.validate()?;

    let sql = format!(
        "INSERT INTO employees (name, email, phone, position, salary, join_date, address, status, notes) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, now()), $7, $8, $9) RETURNING {}",
        COLUNAS_FUNCIONARIO
    );
    let funcionario = query_as::<_, Funcionario>(&sql)
        .bind(&item.name)
        .bind(&item.email)
        .bind(&item.phone)
        .bind(item.position.as_str())
        .bind(&item.salary)
        .bind(item.join_date)
        .bind(&item.address)
        .bind(item.status.unwrap_or_default().as_str())
        .bind(&item.notes)
        .fetch_one(&data.db_pool)
        .await?;

    info!(funcionario_id = funcionario.id, user_id = auth.user_id, "Funcionário cadastrado");
    Ok(HttpResponse::Created().json(GenericResponse::ok(funcionario)))
}

/// Rota para atualizar um funcionário (somente admin).
#[put("/employees/{id}")]
pub async fn atualizar_funcionario(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
    patch: web::Json<AtualizacaoFuncionario>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(&[Papel::Admin])?;
    let id = path.into_inner();
    let patch = patch.into_inner();
    patch.validate()?;

    let sql = format!(
        "UPDATE employees SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             phone = COALESCE($4, phone), \
             position = COALESCE($5, position), \
             salary = COALESCE($6, salary), \
             join_date = COALESCE($7, join_date), \
             address = COALESCE($8, address), \
             status = COALESCE($9, status), \
             notes = COALESCE($10, notes), \
             updated_at = now() \
         WHERE id = $1 RETURNING {}",
        COLUNAS_FUNCIONARIO
    );
    let funcionario = query_as::<_, Funcionario>(&sql)
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(patch.position.map(|p| p.as_str()))
        .bind(&patch.salary)
        .bind(patch.join_date)
        .bind(&patch.address)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.notes)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| funcionario_nao_encontrado(id))?;

    info!(funcionario_id = id, user_id = auth.user_id, "Funcionário atualizado");
    Ok(HttpResponse::Ok().json(GenericResponse::ok(funcionario)))
}

/// Rota para deletar um funcionário (somente admin).
#[delete("/employees/{id}")]
pub async fn deletar_funcionario(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(&[Papel::Admin])?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(&data.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(funcionario_nao_encontrado(id));
    }

    info!(funcionario_id = id, user_id = auth.user_id, "Funcionário removido");
    Ok(HttpResponse::Ok().json(GenericResponse::ok(Empty::default())))
}
