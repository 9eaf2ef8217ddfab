// src/produtos/produtos_router.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::query_as;
use tracing::info;
use validator::Validate;

// Importa as structs definidas no módulo `produtos_structs` dentro da mesma pasta `produtos`
use super::ledger_produtos::produto_nao_encontrado;
use super::produtos_structs::{AtualizacaoProduto, NovoProduto, Produto};
use crate::shared::error::AppResult;
use crate::shared::shared_structs::{Empty, GenericResponse};
use crate::usuarios::auth_middleware::AuthenticatedUser;
use crate::usuarios::usuario_structs::Papel;
// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;

const COLUNAS_PRODUTO: &str = "id, name, description, price, discount_price, category, \
     is_available, total_sold, created_at, updated_at";

// Quantidade de produtos em `GET /products/top`
const LIMITE_MAIS_VENDIDOS: i64 = 5;

/// Registra as rotas de produtos. As rotas estáticas vêm antes de `{id}`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(buscar_produtos)
        .service(contar_produtos)
        .service(produtos_mais_vendidos)
        .service(buscar_produto_por_id)
        .service(cadastrar_produto)
        .service(atualizar_produto)
        .service(deletar_produto);
}

/// Rota para buscar todos os produtos no banco de dados.
#[get("/products")]
pub async fn buscar_produtos(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let sql = format!("SELECT {} FROM products ORDER BY id", COLUNAS_PRODUTO);
    let produtos = query_as::<_, Produto>(&sql).fetch_all(&data.db_pool).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(produtos)))
}

#[get("/products/count")]
pub async fn contar_produtos(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&data.db_pool)
        .await?;
    Ok(HttpResponse::Ok().json(GenericResponse::count_only(count.max(0) as usize)))
}

/// Os produtos mais vendidos, pelo ledger `total_sold`.
#[get("/products/top")]
pub async fn produtos_mais_vendidos(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let sql = format!(
        "SELECT {} FROM products ORDER BY total_sold DESC, id LIMIT $1",
        COLUNAS_PRODUTO
    );
    let produtos = query_as::<_, Produto>(&sql)
        .bind(LIMITE_MAIS_VENDIDOS)
        .fetch_all(&data.db_pool)
        .await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(produtos)))
}

/// Rota para buscar um produto pelo id.
#[get("/products/{id}")]
pub async fn buscar_produto_por_id(
    data: web::Data<AppState>,
    _auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let sql = format!("SELECT {} FROM products WHERE id = $1", COLUNAS_PRODUTO);
    let produto = query_as::<_, Produto>(&sql)
        .bind(id)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| produto_nao_encontrado(id))?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(produto)))
}

/// Rota para inserir um novo produto (somente admin).
#[post("/products")]
pub async fn cadastrar_produto(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    item: web::Json<NovoProduto>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(&[Papel::Admin])?;
    let item = item.into_inner();
    item.validate()?;

    let sql = format!(
        "INSERT INTO products (name, description, price, discount_price, category, is_available) \
         VALUES ($1, $2, $3, COALESCE($4, 0), $5, COALESCE($6, TRUE)) RETURNING {}",
        COLUNAS_PRODUTO
    );
    let produto = query_as::<_, Produto>(&sql)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.price)
        .bind(&item.discount_price)
        .bind(item.category.as_str())
        .bind(item.is_available)
        .fetch_one(&data.db_pool)
        .await?;

    info!(produto_id = produto.id, user_id = auth.user_id, "Produto cadastrado");
    Ok(HttpResponse::Created().json(GenericResponse::ok(produto)))
}

/// Rota para atualizar um produto (somente admin). `total_sold` nunca é tocado aqui.
#[put("/products/{id}")]
pub async fn atualizar_produto(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
    patch: web::Json<AtualizacaoProduto>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(&[Papel::Admin])?;
    let id = path.into_inner();
    let patch = patch.into_inner();
    patch.validate()?;

    let sql = format!(
        "UPDATE products SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             price = COALESCE($4, price), \
             discount_price = COALESCE($5, discount_price), \
             category = COALESCE($6, category), \
             is_available = COALESCE($7, is_available), \
             updated_at = now() \
         WHERE id = $1 RETURNING {}",
        COLUNAS_PRODUTO
    );
    let produto = query_as::<_, Produto>(&sql)
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.price)
        .bind(&patch.discount_price)
        .bind(patch.category.map(|c| c.as_str()))
        .bind(patch.is_available)
        .fetch_optional(&data.db_pool)
        .await?
        .ok_or_else(|| produto_nao_encontrado(id))?;

    info!(produto_id = id, user_id = auth.user_id, "Produto atualizado");
    Ok(HttpResponse::Ok().json(GenericResponse::ok(produto)))
}

/// Rota para excluir um produto (somente admin).
#[delete("/products/{id}")]
pub async fn deletar_produto(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(&[Papel::Admin])?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&data.db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(produto_nao_encontrado(id));
    }

    info!(produto_id = id, user_id = auth.user_id, "Produto removido");
    Ok(HttpResponse::Ok().json(GenericResponse::ok(Empty::default())))
}
