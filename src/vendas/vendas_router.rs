// src/vendas/vendas_router.rs

use std::future::Future;

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Local;

use super::repositorio_vendas::{coletar_estatisticas, fim_do_dia, inicio_do_dia};
use super::vendas_structs::{interpretar_data, AtualizacaoVenda, NovaVenda, PeriodoQuery};
use crate::shared::error::{AppError, AppResult};
use crate::shared::shared_structs::{Empty, GenericResponse};
use crate::usuarios::auth_middleware::AuthenticatedUser;
use crate::usuarios::usuario_structs::Papel;
// Importa o AppState do módulo raiz (main.rs)
use crate::AppState;

const PAPEIS_VENDAS: &[Papel] = &[Papel::Admin, Papel::Atendente];
const LIMITE_RECENTES: i64 = 5;

/// Registra as rotas de vendas. As rotas estáticas vêm antes de `{id}`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(buscar_vendas)
        .service(buscar_vendas_por_periodo)
        .service(vendas_recentes)
        .service(estatisticas_vendas)
        .service(buscar_venda_por_id)
        .service(realizar_venda)
        .service(atualizar_venda)
        .service(deletar_venda);
}

/// Roda a operação numa task própria: se o cliente desconectar, o handler é
/// descartado mas a operação (e um eventual rollback) vai até o fim.
async fn em_task_propria<F, T>(operacao: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>> + 'static,
    T: 'static,
{
    actix_web::rt::spawn(operacao)
        .await
        .map_err(|e| AppError::Internal(format!("Task de venda abortada: {}", e)))?
}

/// Lista todas as vendas, mais recentes primeiro.
#[get("/sales")]
pub async fn buscar_vendas(data: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let vendas = data.vendas.repositorio().listar().await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(vendas)))
}

/// Vendas entre `startDate` e `endDate` (dias inteiros, horário local).
#[get("/sales/range")]
pub async fn buscar_vendas_por_periodo(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    query: web::Query<PeriodoQuery>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;

    let inicio = query.start_date.as_deref().and_then(interpretar_data);
    let fim = query.end_date.as_deref().and_then(interpretar_data);
    let (inicio, fim) = match (inicio, fim) {
        (Some(inicio), Some(fim)) => (inicio, fim),
        _ => {
            return Err(AppError::BadRequest(
                "Informe startDate e endDate válidos (YYYY-MM-DD)".to_string(),
            ))
        }
    };

    let vendas = data
        .vendas
        .repositorio()
        .listar_periodo(inicio_do_dia(inicio), fim_do_dia(fim))
        .await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(vendas)))
}

#[get("/sales/recent")]
pub async fn vendas_recentes(data: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let vendas = data.vendas.repositorio().recentes(LIMITE_RECENTES).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::list(vendas)))
}

#[get("/sales/stats")]
pub async fn estatisticas_vendas(data: web::Data<AppState>, auth: AuthenticatedUser) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let stats = coletar_estatisticas(data.vendas.repositorio(), Local::now()).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(stats)))
}

#[get("/sales/{id}")]
pub async fn buscar_venda_por_id(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let venda = data.vendas.repositorio().buscar_por_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(venda)))
}

/// Realiza a venda e atualiza o ledger dos produtos.
#[post("/sales")]
pub async fn realizar_venda(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    body: web::Json<NovaVenda>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let coordenador = data.vendas.clone();
    let request = body.into_inner();

    let venda = em_task_propria(async move { coordenador.criar_venda(&auth, request).await }).await?;
    Ok(HttpResponse::Created().json(GenericResponse::ok(venda)))
}

#[put("/sales/{id}")]
pub async fn atualizar_venda(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
    body: web::Json<AtualizacaoVenda>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let coordenador = data.vendas.clone();
    let id = path.into_inner();
    let patch = body.into_inner();

    let venda = em_task_propria(async move { coordenador.atualizar_venda(&auth, id, patch).await }).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(venda)))
}

#[delete("/sales/{id}")]
pub async fn deletar_venda(
    data: web::Data<AppState>,
    auth: AuthenticatedUser,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    auth.exigir_papel(PAPEIS_VENDAS)?;
    let coordenador = data.vendas.clone();
    let id = path.into_inner();

    em_task_propria(async move { coordenador.excluir_venda(&auth, id).await }).await?;
    Ok(HttpResponse::Ok().json(GenericResponse::ok(Empty::default())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::shared::error::extractor_configs;
    use crate::vendas::store_memoria::{bearer, estado_de_teste, StoreMemoria};

    fn corpo_venda(quantidade: i32) -> Value {
        json!({
            "items": [{ "product": 1, "name": "Doner Beef", "price": 25000, "quantity": quantidade }],
            "totalAmount": 25000 * quantidade,
            "paymentMethod": "Cash"
        })
    }

    macro_rules! app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(estado_de_teste($store))
                    .configure(extractor_configs)
                    .service(web::scope("/api").configure(config)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn sem_token_recebe_401() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        let req = test::TestRequest::get().uri("/api/sales").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn criar_venda_retorna_201_com_numero_do_pedido() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        let req = test::TestRequest::post()
            .uri("/api/sales")
            .insert_header(bearer(Papel::Atendente))
            .set_json(corpo_venda(2))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        let order_number = body["data"]["orderNumber"].as_str().unwrap();
        assert!(order_number.starts_with("KB-"));
        assert!(order_number.ends_with("-0001"));
        assert_eq!(body["data"]["orderStatus"], "New");
        assert_eq!(store.total_sold(1), 2);
    }

    #[actix_web::test]
    async fn venda_com_cliente_traz_detalhes_na_resposta() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        store.adicionar_cliente(8, "Budi");
        let app = app!(&store);

        let mut corpo = corpo_venda(1);
        corpo["customer"] = json!(8);
        let req = test::TestRequest::post()
            .uri("/api/sales")
            .insert_header(bearer(Papel::Atendente))
            .set_json(corpo)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["customer"], 8);
        assert_eq!(body["data"]["customerDetails"]["name"], "Budi");
        assert!(body["data"].get("employeeDetails").is_none());
    }

    #[actix_web::test]
    async fn venda_sem_itens_retorna_envelope_de_validacao() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        let req = test::TestRequest::post()
            .uri("/api/sales")
            .insert_header(bearer(Papel::Atendente))
            .set_json(json!({ "items": [], "totalAmount": 10, "paymentMethod": "Cash" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "items");
        assert_eq!(store.quantidade_vendas(), 0);
    }

    #[actix_web::test]
    async fn json_malformado_usa_o_mesmo_envelope() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        let req = test::TestRequest::post()
            .uri("/api/sales")
            .insert_header(bearer(Papel::Atendente))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"items\": [")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("JSON inválido"));
    }

    #[actix_web::test]
    async fn venda_inexistente_retorna_404() {
        let store = Arc::new(StoreMemoria::new());
        let app = app!(&store);

        let req = test::TestRequest::get()
            .uri("/api/sales/999")
            .insert_header(bearer(Papel::Atendente))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn atualizar_com_produto_inexistente_retorna_404_sem_gravar() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        let req = test::TestRequest::post()
            .uri("/api/sales")
            .insert_header(bearer(Papel::Atendente))
            .set_json(corpo_venda(2))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/sales/{}", id))
            .insert_header(bearer(Papel::Atendente))
            .set_json(json!({
                "items": [{ "product": 404, "name": "Fantasma", "price": 1000, "quantity": 1 }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(store.quantidade_nas_vendas(1), 2);
        assert_eq!(store.total_sold(1), 2);
    }

    #[actix_web::test]
    async fn excluir_estorna_ledger_e_responde_data_vazio() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        let req = test::TestRequest::post()
            .uri("/api/sales")
            .insert_header(bearer(Papel::Atendente))
            .set_json(corpo_venda(3))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["data"]["id"].as_i64().unwrap();
        assert_eq!(store.total_sold(1), 3);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/sales/{}", id))
            .insert_header(bearer(Papel::Atendente))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "success": true, "data": {} }));
        assert_eq!(store.total_sold(1), 0);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/sales/{}", id))
            .insert_header(bearer(Papel::Atendente))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(store.total_sold(1), 0);
    }

    #[actix_web::test]
    async fn periodo_sem_data_final_retorna_400() {
        let store = Arc::new(StoreMemoria::new());
        let app = app!(&store);

        let req = test::TestRequest::get()
            .uri("/api/sales/range?startDate=2025-01-01")
            .insert_header(bearer(Papel::Atendente))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn rotas_estaticas_nao_caem_em_id() {
        let store = Arc::new(StoreMemoria::com_produtos(&[1]));
        let app = app!(&store);

        for _ in 0..7 {
            let req = test::TestRequest::post()
                .uri("/api/sales")
                .insert_header(bearer(Papel::Atendente))
                .set_json(corpo_venda(1))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/sales/recent")
            .insert_header(bearer(Papel::Atendente))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 5);

        let req = test::TestRequest::get()
            .uri("/api/sales/stats")
            .insert_header(bearer(Papel::Atendente))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        // Nenhuma venda foi paga
        assert_eq!(body["data"]["today"]["totalSales"], 0);
    }
}
