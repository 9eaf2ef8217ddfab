// src/main.rs

use std::io;
use std::sync::Arc;

use actix_web::{get, middleware, web, App, HttpResponse, HttpServer};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::{info, warn};

// Importa os módulos
mod clientes;     // Módulo de clientes
mod config;       // Configuração via variáveis de ambiente
mod funcionarios; // Módulo de funcionários
mod logger;       // Inicialização do tracing
mod produtos;     // Módulo de produtos (CRUD + ledger total_sold)
mod shared;       // Módulo shared (respostas, erros e validações)
mod usuarios;     // Módulo de usuários (autenticação)
mod vendas;       // Módulo de vendas (coordenador, número do pedido, repositório)

use config::Config;
use produtos::ledger_produtos::PgLedgerProdutos;
use shared::error::extractor_configs;
use vendas::coordenador_vendas::CoordenadorVendas;
use vendas::numero_pedido::PgSequenciadorPedidos;
use vendas::repositorio_vendas::PgRepositorioVendas;

// Estado compartilhado entre as rotas.
pub struct AppState {
    pub db_pool: Pool<Postgres>,
    pub jwt_secret: String, // Chave secreta para JWT
    pub jwt_expire_hours: i64,
    pub vendas: CoordenadorVendas,
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "message": "Server is running" }))
}

fn io_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

// Função principal da aplicação Actix Web.
#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env();
    logger::init_logger(&config.log_level, config.log_json);
    if config.uses_dev_jwt_secret() {
        warn!("JWT_SECRET não definido; usando chave de desenvolvimento");
    }

    // Conecta ao banco de dados PostgreSQL usando um pool de conexões.
    let connect_options = config
        .pg_connect_options()
        .map_err(|e| io_error("DATABASE_URL inválida", e))?;
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_statement_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| io_error("Falha ao conectar ao banco PostgreSQL", e))?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| io_error("Falha ao aplicar migrations", e))?;

    let vendas = CoordenadorVendas::new(
        Arc::new(PgRepositorioVendas::new(db_pool.clone())),
        Arc::new(PgLedgerProdutos::new(db_pool.clone())),
        Arc::new(PgSequenciadorPedidos::new(db_pool.clone())),
        config.sale_timeout,
    );

    // web::Data é usado para compartilhar o estado entre as rotas.
    let app_state = web::Data::new(AppState {
        db_pool,
        jwt_secret: config.jwt_secret.clone(),
        jwt_expire_hours: config.jwt_expire_hours,
        vendas,
    });

    info!(host = %config.http_host, port = config.http_port, "Iniciando API do caixa");

    // Configura e inicia o servidor HTTP.
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(extractor_configs)
            .service(
                web::scope("/api")
                    .service(health)
                    .configure(usuarios::usuario_router::config)
                    .configure(produtos::produtos_router::config)
                    .configure(clientes::cliente_router::config)
                    .configure(funcionarios::funcionario_router::config)
                    .configure(vendas::vendas_router::config),
            )
    })
    .bind((config.http_host.as_str(), config.http_port))?
    .run()
    .await
}
