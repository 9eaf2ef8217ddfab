// src/produtos/produtos_structs.rs

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::Validate;

use crate::shared::shared_structs::wire_enum;
use crate::shared::validacoes::{validar_valor_nao_negativo, validar_valor_positivo};

wire_enum! {
    /// Categorias do cardápio.
    pub enum CategoriaProduto {
        DonerCarne => "Doner Beef",
        DonerFrango => "Doner Chicken",
        Vegetariano => "Vegetarian Kebab",
        JumboMix => "Jumbo Mix Kebab",
        Bebida => "Beverage",
        Combo => "Value Meal",
        Outro => "Other",
    }
}

/// Estrutura que representa um produto no banco de dados.
/// `total_sold` é o ledger de unidades vendidas e só muda via `LedgerProdutos`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Produto {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub discount_price: BigDecimal,
    pub category: CategoriaProduto,
    pub is_available: bool,
    pub total_sold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Mapeamento manual: a categoria vem como VARCHAR e precisa ser validada
impl<'r> FromRow<'r, PgRow> for Produto {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let category: String = row.try_get("category")?;
        Ok(Produto {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            discount_price: row.try_get("discount_price")?,
            category: category.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            is_available: row.try_get("is_available")?,
            total_sold: row.try_get("total_sold")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Estrutura para receber dados do novo produto na requisição POST.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NovoProduto {
    #[validate(length(min = 1, max = 100, message = "Nome deve ter entre 1 e 100 caracteres"))]
    pub name: String,
    #[validate(length(min = 1, max = 1000, message = "Descrição deve ter entre 1 e 1000 caracteres"))]
    pub description: String,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub price: BigDecimal,
    #[validate(custom(function = "validar_valor_nao_negativo"))]
    pub discount_price: Option<BigDecimal>,
    pub category: CategoriaProduto,
    pub is_available: Option<bool>,
}

/// Atualização parcial de produto (PUT). `totalSold` não é aceito aqui.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AtualizacaoProduto {
    #[validate(length(min = 1, max = 100, message = "Nome não pode ser vazio"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "Descrição não pode ser vazia"))]
    pub description: Option<String>,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub price: Option<BigDecimal>,
    #[validate(custom(function = "validar_valor_nao_negativo"))]
    pub discount_price: Option<BigDecimal>,
    pub category: Option<CategoriaProduto>,
    pub is_available: Option<bool>,
}
