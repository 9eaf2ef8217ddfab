// src/vendas/numero_pedido.rs

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Local, NaiveDate};
use sqlx::{Pool, Postgres};

use crate::shared::error::AppResult;

/// Gera a sequência diária dos números de pedido.
///
/// Cada chamada deve ser atômica: duas vendas no mesmo dia nunca recebem
/// o mesmo valor, mesmo quando criadas ao mesmo tempo.
#[async_trait]
pub trait SequenciadorPedidos: Send + Sync {
    /// Próximo valor da sequência do dia (começa em 1).
    async fn proximo_valor(&self, dia: NaiveDate) -> AppResult<u32>;
}

/// Monta `KB-YYMMDD-NNNN` a partir do horário local da criação.
pub fn formatar_numero_pedido(created_at: &DateTime<Local>, sequencia: u32) -> String {
    format!(
        "KB-{:02}{:02}{:02}-{:04}",
        created_at.year() % 100,
        created_at.month(),
        created_at.day(),
        sequencia
    )
}

/// Sequência persistida em `order_sequences`, uma linha por dia.
pub struct PgSequenciadorPedidos {
    pool: Pool<Postgres>,
}

impl PgSequenciadorPedidos {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgSequenciadorPedidos { pool }
    }
}

#[async_trait]
impl SequenciadorPedidos for PgSequenciadorPedidos {
    async fn proximo_valor(&self, dia: NaiveDate) -> AppResult<u32> {
        // Upsert de um único comando: o lock da linha do dia serializa os incrementos
        let (valor,): (i32,) = sqlx::query_as(
            "INSERT INTO order_sequences (day, last_value) VALUES ($1, 1) \
             ON CONFLICT (day) DO UPDATE SET last_value = order_sequences.last_value + 1 \
             RETURNING last_value",
        )
        .bind(dia)
        .fetch_one(&self.pool)
        .await?;

        Ok(valor as u32)
    }
}
