// src/clientes/cliente_structs.rs

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Estrutura que representa um cliente no banco de dados.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cliente {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub join_date: DateTime<Utc>,
    pub total_orders: i32,
    pub total_spent: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados do cliente que acompanham uma venda.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumoCliente {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Estrutura para receber dados do novo cliente na requisição POST.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NovoCliente {
    #[validate(length(min = 1, max = 100, message = "Nome deve ter entre 1 e 100 caracteres"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 1, max = 20, message = "Telefone deve ter entre 1 e 20 caracteres"))]
    pub phone: String,
    #[validate(length(min = 1, max = 500, message = "Endereço deve ter entre 1 e 500 caracteres"))]
    pub address: String,
    pub join_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Observação não pode passar de 1000 caracteres"))]
    pub notes: Option<String>,
}

/// Atualização parcial de cliente (PUT).
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AtualizacaoCliente {
    #[validate(length(min = 1, max = 100, message = "Nome não pode ser vazio"))]
    pub name: Option<String>,
    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Telefone deve ter entre 1 e 20 caracteres"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Endereço deve ter entre 1 e 500 caracteres"))]
    pub address: Option<String>,
    pub join_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "Observação não pode passar de 1000 caracteres"))]
    pub notes: Option<String>,
}
