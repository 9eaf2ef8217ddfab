// src/vendas/vendas_structs.rs

use bigdecimal::BigDecimal;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use validator::Validate;

use crate::clientes::cliente_structs::ResumoCliente;
use crate::funcionarios::funcionario_structs::ResumoFuncionario;
use crate::shared::shared_structs::wire_enum;
use crate::shared::validacoes::validar_valor_positivo;

wire_enum! {
    /// Formas de pagamento aceitas no caixa.
    pub enum MetodoPagamento {
        Dinheiro => "Cash",
        CartaoCredito => "Credit Card",
        CartaoDebito => "Debit Card",
        Transferencia => "Bank Transfer",
        CarteiraDigital => "E-Wallet",
        Outro => "Other",
    }
}

wire_enum! {
    #[derive(Default)]
    pub enum StatusPagamento {
        #[default]
        Pendente => "Unpaid",
        Pago => "Paid",
        Cancelado => "Cancelled",
    }
}

wire_enum! {
    /// Status do pedido. Não validamos transições: qualquer valor do conjunto
    /// é aceito na atualização (Cancelled pode vir de qualquer estado).
    #[derive(Default)]
    pub enum StatusPedido {
        #[default]
        Novo => "New",
        EmPreparo => "Processing",
        Pronto => "Ready",
        Concluido => "Completed",
        Cancelado => "Cancelled",
    }
}

wire_enum! {
    #[derive(Default)]
    pub enum TipoPedido {
        #[default]
        NoLocal => "Dine-in",
        ParaViagem => "Take Away",
        Entrega => "Delivery",
    }
}

/// Item de uma venda. `product` é a referência obrigatória ao produto;
/// `name` e `price` são copiados no momento da venda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, FromRow)]
pub struct ItemVenda {
    #[sqlx(rename = "product_id")]
    pub product: i32,
    #[validate(length(min = 1, max = 100, message = "Nome do produto é obrigatório"))]
    pub name: String,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub price: BigDecimal,
    #[validate(range(min = 1, message = "Quantidade mínima é 1"))]
    pub quantity: i32,
}

/// Estrutura que representa uma venda persistida.
///
/// `customer` e `employee` são as referências gravadas; os `*_details`
/// trazem nome e contato de quem ainda existe, para as telas do caixa.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Venda {
    pub id: i32,
    pub order_number: String,
    pub customer: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<ResumoCliente>,
    pub employee: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_details: Option<ResumoFuncionario>,
    pub items: Vec<ItemVenda>,
    pub total_amount: BigDecimal,
    pub payment_method: MetodoPagamento,
    pub payment_status: StatusPagamento,
    pub order_status: StatusPedido,
    pub order_type: TipoPedido,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Venda {
    /// Aplica os campos presentes na atualização. `order_number` nunca muda.
    pub fn aplicar_atualizacao(&mut self, patch: &AtualizacaoVenda) {
        if let Some(items) = &patch.items {
            self.items = items.clone();
        }
        if let Some(total_amount) = &patch.total_amount {
            self.total_amount = total_amount.clone();
        }
        if let Some(payment_method) = patch.payment_method {
            self.payment_method = payment_method;
        }
        if let Some(payment_status) = patch.payment_status {
            self.payment_status = payment_status;
        }
        if let Some(order_status) = patch.order_status {
            self.order_status = order_status;
        }
        if let Some(order_type) = patch.order_type {
            self.order_type = order_type;
        }
        if let Some(customer) = patch.customer {
            self.customer = Some(customer);
        }
        if let Some(employee) = patch.employee {
            self.employee = Some(employee);
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }
}

// Itens vêm de outra tabela; o repositório preenche `items` depois.
// As colunas customer_* e employee_* vêm do LEFT JOIN de `SELECT_VENDA`.
impl<'r> FromRow<'r, PgRow> for Venda {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        fn decode<T: std::str::FromStr<Err = String>>(value: String) -> Result<T, sqlx::Error> {
            value.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))
        }

        let customer: Option<i32> = row.try_get("customer_id")?;
        let customer_name: Option<String> = row.try_get("customer_name")?;
        let customer_details = match (customer, customer_name) {
            (Some(id), Some(name)) => Some(ResumoCliente {
                id,
                name,
                email: row.try_get("customer_email")?,
                phone: row.try_get("customer_phone")?,
            }),
            _ => None,
        };

        let employee: Option<i32> = row.try_get("employee_id")?;
        let employee_name: Option<String> = row.try_get("employee_name")?;
        let employee_details = match (employee, employee_name) {
            (Some(id), Some(name)) => Some(ResumoFuncionario { id, name }),
            _ => None,
        };

        Ok(Venda {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            customer,
            customer_details,
            employee,
            employee_details,
            items: Vec::new(),
            total_amount: row.try_get("total_amount")?,
            payment_method: decode(row.try_get("payment_method")?)?,
            payment_status: decode(row.try_get("payment_status")?)?,
            order_status: decode(row.try_get("order_status")?)?,
            order_type: decode(row.try_get("order_type")?)?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Corpo da requisição `POST /sales`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NovaVenda {
    #[validate(length(min = 1, message = "A venda precisa de pelo menos um item"), nested)]
    pub items: Vec<ItemVenda>,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub total_amount: BigDecimal,
    pub payment_method: MetodoPagamento,
    pub payment_status: Option<StatusPagamento>,
    pub order_status: Option<StatusPedido>,
    pub order_type: Option<TipoPedido>,
    pub customer: Option<i32>,
    pub employee: Option<i32>,
    #[validate(length(max = 500, message = "Observação não pode passar de 500 caracteres"))]
    pub notes: Option<String>,
}

/// Atualização parcial de venda (`PUT /sales/{id}`).
/// Campos desconhecidos, como `orderNumber`, são ignorados.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AtualizacaoVenda {
    #[validate(length(min = 1, message = "A venda precisa de pelo menos um item"), nested)]
    pub items: Option<Vec<ItemVenda>>,
    #[validate(custom(function = "validar_valor_positivo"))]
    pub total_amount: Option<BigDecimal>,
    pub payment_method: Option<MetodoPagamento>,
    pub payment_status: Option<StatusPagamento>,
    pub order_status: Option<StatusPedido>,
    pub order_type: Option<TipoPedido>,
    pub customer: Option<i32>,
    pub employee: Option<i32>,
    #[validate(length(max = 500, message = "Observação não pode passar de 500 caracteres"))]
    pub notes: Option<String>,
}

/// Venda pronta para ser gravada: requisição já validada, número do pedido
/// atribuído e valores padrão resolvidos.
#[derive(Debug, Clone)]
pub struct RascunhoVenda {
    pub order_number: String,
    pub customer: Option<i32>,
    pub employee: Option<i32>,
    pub items: Vec<ItemVenda>,
    pub total_amount: BigDecimal,
    pub payment_method: MetodoPagamento,
    pub payment_status: StatusPagamento,
    pub order_status: StatusPedido,
    pub order_type: TipoPedido,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RascunhoVenda {
    pub fn new(request: NovaVenda, order_number: String, created_at: DateTime<Local>) -> Self {
        RascunhoVenda {
            order_number,
            customer: request.customer,
            employee: request.employee,
            items: request.items,
            total_amount: request.total_amount,
            payment_method: request.payment_method,
            payment_status: request.payment_status.unwrap_or_default(),
            order_status: request.order_status.unwrap_or_default(),
            order_type: request.order_type.unwrap_or_default(),
            notes: request.notes,
            created_at: created_at.with_timezone(&Utc),
        }
    }
}

/// Totais de um período (apenas vendas pagas).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumoVendas {
    pub total_sales: i64,
    pub total_amount: BigDecimal,
}

impl Default for ResumoVendas {
    fn default() -> Self {
        ResumoVendas {
            total_sales: 0,
            total_amount: BigDecimal::from(0),
        }
    }
}

/// Totais de um mês do ano corrente.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendasDoMes {
    pub month: u32,
    pub total_sales: i64,
    pub total_amount: BigDecimal,
}

/// Resposta de `GET /sales/stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstatisticasVendas {
    pub today: ResumoVendas,
    pub month: ResumoVendas,
    pub year: ResumoVendas,
    pub monthly_breakdown: Vec<VendasDoMes>,
}

/// Query string de `GET /sales/range`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodoQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Aceita `YYYY-MM-DD` ou um timestamp RFC 3339 (usa só a data local).
pub fn interpretar_data(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Local).date_naive())
}
