// src/produtos/ledger_produtos.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::{debug, error, warn};

use crate::shared::error::{AppError, AppResult};

/// Ledger de unidades vendidas por produto (`products.total_sold`).
///
/// O contador só muda por incremento atômico no armazenamento, nunca por
/// leitura-modificação-escrita de uma cópia em memória.
#[async_trait]
pub trait LedgerProdutos: Send + Sync {
    /// Verifica se o produto existe.
    async fn existe(&self, produto_id: i32) -> AppResult<bool>;

    /// Soma `delta` (positivo ou negativo) ao `total_sold` e retorna o novo valor.
    /// Produto inexistente resulta em `AppError::NotFound`.
    async fn ajustar(&self, produto_id: i32, delta: i32) -> AppResult<i32>;
}

pub fn produto_nao_encontrado(id: i32) -> AppError {
    AppError::NotFound(format!("Produto com id {} não encontrado", id))
}

/// Implementação PostgreSQL do ledger.
pub struct PgLedgerProdutos {
    pool: Pool<Postgres>,
}

impl PgLedgerProdutos {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgLedgerProdutos { pool }
    }
}

#[async_trait]
impl LedgerProdutos for PgLedgerProdutos {
    async fn existe(&self, produto_id: i32) -> AppResult<bool> {
        let found: Option<(i32,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
            .bind(produto_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn ajustar(&self, produto_id: i32, delta: i32) -> AppResult<i32> {
        // Um único UPDATE: o banco serializa incrementos concorrentes na mesma linha.
        // Um comando travado é cancelado pelo statement_timeout da conexão.
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE products SET total_sold = total_sold + $1, updated_at = now() \
             WHERE id = $2 RETURNING total_sold",
        )
        .bind(delta)
        .bind(produto_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((total_sold,)) => Ok(total_sold),
            None => Err(produto_nao_encontrado(produto_id)),
        }
    }
}

/// Ajustes de ledger efetivamente aplicados durante uma operação de venda.
///
/// Cada ajuste só é registrado depois que o armazenamento confirmou, então
/// `reverter` desfaz exatamente o que foi aplicado, nada além.
#[derive(Debug, Default)]
pub struct AjustesAplicados {
    aplicados: Vec<(i32, i32)>,
}

impl AjustesAplicados {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aplica um ajuste e o registra se o armazenamento confirmar.
    pub async fn aplicar(
        &mut self,
        ledger: &dyn LedgerProdutos,
        produto_id: i32,
        delta: i32,
    ) -> AppResult<()> {
        ajustar_conferindo(ledger, produto_id, delta).await?;
        self.aplicados.push((produto_id, delta));
        Ok(())
    }

    /// Ajustes confirmados até agora, na ordem de aplicação.
    pub fn aplicados(&self) -> &[(i32, i32)] {
        &self.aplicados
    }

    /// Desfaz os ajustes registrados, do último para o primeiro.
    ///
    /// Falhas são apenas logadas: quem chama continua devolvendo o erro
    /// original. Retorna quantos ajustes não puderam ser desfeitos.
    pub async fn reverter(self, ledger: &dyn LedgerProdutos) -> usize {
        let mut falhas = 0;
        for (produto_id, delta) in self.aplicados.into_iter().rev() {
            if let Err(e) = ajustar_conferindo(ledger, produto_id, -delta).await {
                falhas += 1;
                error!(
                    produto_id,
                    delta = -delta,
                    error = %e,
                    "Falha ao desfazer ajuste do ledger; total_sold pode estar inconsistente"
                );
            }
        }
        falhas
    }
}

/// Aplica o ajuste e avisa quando o contador fica negativo.
async fn ajustar_conferindo(ledger: &dyn LedgerProdutos, produto_id: i32, delta: i32) -> AppResult<i32> {
    let total_sold = ledger.ajustar(produto_id, delta).await?;
    debug!(produto_id, delta, total_sold, "Ledger ajustado");
    if total_sold < 0 {
        // Não corrigimos para zero: um valor negativo indica erro de reconciliação
        warn!(
            produto_id,
            delta,
            total_sold,
            "total_sold ficou negativo; verificar integridade do ledger"
        );
    }
    Ok(total_sold)
}
