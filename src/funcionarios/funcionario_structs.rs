// src/funcionarios/funcionario_structs.rs

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::Validate;

use crate::shared::shared_structs::wire_enum;
use crate::shared::validacoes::validar_valor_positivo;

wire_enum! {
    pub enum CargoFuncionario {
        Gerente => "Manager",
        Caixa => "Cashier",
        Cozinheiro => "Chef",
        Garcom => "Waiter",
        Entregador => "Courier",
        Outro => "Other",
    }
}

wire_enum! {
    #[derive(Default)]
    pub enum StatusFuncionario {
        #[default]
        Ativo => "Active",
        Afastado => "On Leave",
        Inativo => "Inactive",
    }
}

/// Estrutura que representa um funcionário no banco de dados.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Funcionario {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: CargoFuncionario,
    pub salary: BigDecimal,
    pub join_date: DateTime<Utc>,
    pub address: String,
    pub status: StatusFuncionario,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Cargo e status vêm como VARCHAR
impl<'r> FromRow<'r, PgRow> for Funcionario {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let position: String = row.try_get("position")?;
        let status: String = row.try_get("status")?;
        Ok(Funcionario {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            position: position.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            salary: row.try_get("salary")?,
            join_date: row.try_get("join_date")?,
            address: row.try_get("address")?,
            status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Dados do funcionário que acompanham uma venda.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumoFuncionario {
    pub id: i32,
    pub name: String,
}

/// Estrutura para receber dados do novo funcionário na requisição POST.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NovoFuncionario {
    #[validate(length(min = 1, max = 100, message = "Nome deve ter entre 1 e 100 caracteres"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 1, max = 20, message = "Telefone deve ter entre 1 e 20 caracteres"))]
    pub phone: String,
    pub position: CargoFuncionario,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub salary: BigDecimal,
    pub join_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 500, message = "Endereço deve ter entre 1 e 500 caracteres"))]
    pub address: String,
    pub status: Option<StatusFuncionario>,
    #[validate(length(max = 1000, message = "Observação não pode passar de 1000 caracteres"))]
    pub notes: Option<String>,
}

/// Atualização parcial de funcionário (PUT).
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AtualizacaoFuncionario {
    #[validate(length(min = 1, max = 100, message = "Nome não pode ser vazio"))]
    pub name: Option<String>,
    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Telefone deve ter entre 1 e 20 caracteres"))]
    pub phone: Option<String>,
    pub position: Option<CargoFuncionario>,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub salary: Option<BigDecimal>,
    pub join_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 500, message = "Endereço deve ter entre 1 e 500 caracteres"))]
    pub address: Option<String>,
    pub status: Option<StatusFuncionario>,
    #[validate(length(max = 1000, message = "Observação não pode passar de 1000 caracteres"))]
    pub notes: Option<String>,
}
