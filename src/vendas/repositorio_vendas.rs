// src/vendas/repositorio_vendas.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{Executor, FromRow, Pool, Postgres, Row, Transaction};
use validator::Validate;

use super::vendas_structs::{
    AtualizacaoVenda, EstatisticasVendas, ItemVenda, RascunhoVenda, ResumoVendas, Venda, VendasDoMes,
};
use crate::shared::error::{AppError, AppResult};

/// Resultado de uma atualização: o documento de antes e o de depois,
/// lidos na mesma transação.
#[derive(Debug, Clone)]
pub struct VendaAtualizada {
    pub anterior: Venda,
    pub atual: Venda,
}

/// Persistência das vendas. Só grava e lê documentos; a coerência com o
/// ledger de produtos é responsabilidade do coordenador.
#[async_trait]
pub trait RepositorioVendas: Send + Sync {
    async fn criar(&self, rascunho: RascunhoVenda) -> AppResult<Venda>;

    /// `AppError::NotFound` se a venda não existir.
    async fn buscar_por_id(&self, id: i32) -> AppResult<Venda>;

    /// Aplica a atualização (validada aqui também). O documento anterior é
    /// lido com a linha travada, então reflete exatamente o que foi substituído.
    async fn atualizar(&self, id: i32, patch: &AtualizacaoVenda) -> AppResult<VendaAtualizada>;

    /// Remove a venda e retorna o documento removido.
    async fn excluir(&self, id: i32) -> AppResult<Venda>;

    /// Regrava a venda exatamente como em `venda`, inclusive campos opcionais
    /// vazios, recriando-a com o mesmo id se tiver sido removida.
    async fn restaurar(&self, venda: &Venda) -> AppResult<()>;

    /// Todas as vendas, das mais novas para as mais antigas.
    async fn listar(&self) -> AppResult<Vec<Venda>>;

    /// Vendas com `created_at` dentro de `[inicio, fim]`.
    async fn listar_periodo(&self, inicio: DateTime<Utc>, fim: DateTime<Utc>) -> AppResult<Vec<Venda>>;

    async fn recentes(&self, limite: i64) -> AppResult<Vec<Venda>>;

    /// Quantidade e soma das vendas pagas criadas a partir de `desde`.
    async fn resumo_pagas(&self, desde: DateTime<Utc>) -> AppResult<ResumoVendas>;

    /// Vendas pagas desde `desde`, agrupadas pelo mês local (1-12) em ordem crescente.
    async fn pagas_por_mes(&self, desde: DateTime<Utc>) -> AppResult<Vec<VendasDoMes>>;

    async fn cliente_existe(&self, id: i32) -> AppResult<bool>;

    async fn funcionario_existe(&self, id: i32) -> AppResult<bool>;
}

pub fn venda_nao_encontrada(id: i32) -> AppError {
    AppError::NotFound(format!("Venda com id {} não encontrada", id))
}

/// Início do dia local como instante UTC.
pub fn inicio_do_dia(dia: NaiveDate) -> DateTime<Utc> {
    meia_noite_local(dia).with_timezone(&Utc)
}

/// Último instante do dia local (23:59:59.999) como instante UTC.
pub fn fim_do_dia(dia: NaiveDate) -> DateTime<Utc> {
    let seguinte = dia.succ_opt().unwrap_or(dia);
    inicio_do_dia(seguinte) - chrono::Duration::milliseconds(1)
}

fn meia_noite_local(dia: NaiveDate) -> DateTime<Local> {
    let naive = dia.and_time(NaiveTime::MIN);
    // Em dias com mudança de horário a meia-noite pode não existir
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Agrupa `(created_at, total_amount)` pelo mês no fuso informado.
pub fn agrupar_por_mes<Tz: TimeZone>(
    fuso: &Tz,
    vendas: impl IntoIterator<Item = (DateTime<Utc>, BigDecimal)>,
) -> Vec<VendasDoMes> {
    let mut meses: BTreeMap<u32, ResumoVendas> = BTreeMap::new();
    for (created_at, total_amount) in vendas {
        let mes = created_at.with_timezone(fuso).month();
        let resumo = meses.entry(mes).or_default();
        resumo.total_sales += 1;
        resumo.total_amount = resumo.total_amount.clone() + total_amount;
    }
    meses
        .into_iter()
        .map(|(month, resumo)| VendasDoMes {
            month,
            total_sales: resumo.total_sales,
            total_amount: resumo.total_amount,
        })
        .collect()
}

/// Estatísticas do dia, mês e ano correntes mais a quebra mensal do ano.
pub async fn coletar_estatisticas(
    repositorio: &dyn RepositorioVendas,
    agora: DateTime<Local>,
) -> AppResult<EstatisticasVendas> {
    let hoje = agora.date_naive();
    let inicio_mes = hoje.with_day(1).unwrap_or(hoje);
    let inicio_ano = NaiveDate::from_ymd_opt(hoje.year(), 1, 1).unwrap_or(hoje);

    Ok(EstatisticasVendas {
        today: repositorio.resumo_pagas(inicio_do_dia(hoje)).await?,
        month: repositorio.resumo_pagas(inicio_do_dia(inicio_mes)).await?,
        year: repositorio.resumo_pagas(inicio_do_dia(inicio_ano)).await?,
        monthly_breakdown: repositorio.pagas_por_mes(inicio_do_dia(inicio_ano)).await?,
    })
}

// Venda com nome/contato do cliente e nome do funcionário
const SELECT_VENDA: &str = "SELECT s.id, s.order_number, s.customer_id, s.employee_id, \
     s.total_amount, s.payment_method, s.payment_status, s.order_status, s.order_type, s.notes, \
     s.created_at, s.updated_at, \
     c.name AS customer_name, c.email AS customer_email, c.phone AS customer_phone, \
     e.name AS employee_name \
     FROM sales s \
     LEFT JOIN customers c ON c.id = s.customer_id \
     LEFT JOIN employees e ON e.id = s.employee_id";

/// Implementação PostgreSQL (`sales` + `sale_items`).
pub struct PgRepositorioVendas {
    pool: Pool<Postgres>,
}

impl PgRepositorioVendas {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgRepositorioVendas { pool }
    }

    async fn consultar(&self, sql: &str, binds: BindsConsulta) -> AppResult<Vec<Venda>> {
        let mut query = sqlx::query_as::<_, Venda>(sql);
        match binds {
            BindsConsulta::Nenhum => {}
            BindsConsulta::Id(id) => query = query.bind(id),
            BindsConsulta::Periodo(inicio, fim) => query = query.bind(inicio).bind(fim),
            BindsConsulta::Limite(limite) => query = query.bind(limite),
        }
        let vendas = query.fetch_all(&self.pool).await?;
        anexar_itens(&self.pool, vendas).await
    }

    async fn existe_em(&self, sql: &str, id: i32) -> AppResult<bool> {
        let found: Option<(i32,)> = sqlx::query_as(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

enum BindsConsulta {
    Nenhum,
    Id(i32),
    Periodo(DateTime<Utc>, DateTime<Utc>),
    Limite(i64),
}

/// Carrega os itens das vendas informadas, preservando a ordem de cada venda.
async fn carregar_itens<'e, E>(executor: E, ids: &[i32]) -> AppResult<HashMap<i32, Vec<ItemVenda>>>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query(
        "SELECT sale_id, product_id, name, price, quantity FROM sale_items \
         WHERE sale_id = ANY($1) ORDER BY sale_id, position",
    )
    .bind(ids.to_vec())
    .fetch_all(executor)
    .await?;

    let mut itens: HashMap<i32, Vec<ItemVenda>> = HashMap::new();
    for row in rows {
        let sale_id: i32 = row.try_get("sale_id")?;
        itens.entry(sale_id).or_default().push(ItemVenda::from_row(&row)?);
    }
    Ok(itens)
}

async fn anexar_itens(pool: &Pool<Postgres>, mut vendas: Vec<Venda>) -> AppResult<Vec<Venda>> {
    if vendas.is_empty() {
        return Ok(vendas);
    }
    let ids: Vec<i32> = vendas.iter().map(|v| v.id).collect();
    let mut itens = carregar_itens(pool, &ids).await?;
    for venda in vendas.iter_mut() {
        venda.items = itens.remove(&venda.id).unwrap_or_default();
    }
    Ok(vendas)
}

/// Lê a venda dentro da transação. Com `travar`, segura a linha de `sales`
/// até o commit, e outra transação que queira alterá-la espera.
async fn carregar_venda(
    tx: &mut Transaction<'_, Postgres>,
    id: i32,
    travar: bool,
) -> AppResult<Option<Venda>> {
    // FOR UPDATE OF s: o lado nulo do LEFT JOIN não pode ser travado
    let sql = format!(
        "{} WHERE s.id = $1{}",
        SELECT_VENDA,
        if travar { " FOR UPDATE OF s" } else { "" }
    );
    let venda = sqlx::query_as::<_, Venda>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(mut venda) = venda else {
        return Ok(None);
    };
    venda.items = carregar_itens(&mut *tx, &[id]).await?.remove(&id).unwrap_or_default();
    Ok(Some(venda))
}

async fn gravar_itens(
    tx: &mut Transaction<'_, Postgres>,
    venda_id: i32,
    itens: &[ItemVenda],
) -> AppResult<()> {
    sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
        .bind(venda_id)
        .execute(&mut *tx)
        .await?;

    for (position, item) in itens.iter().enumerate() {
        sqlx::query(
            "INSERT INTO sale_items (sale_id, position, product_id, name, price, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(venda_id)
        .bind(position as i32)
        .bind(item.product)
        .bind(&item.name)
        .bind(&item.price)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl RepositorioVendas for PgRepositorioVendas {
    async fn criar(&self, rascunho: RascunhoVenda) -> AppResult<Venda> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO sales (order_number, customer_id, employee_id, total_amount, \
             payment_method, payment_status, order_status, order_type, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) RETURNING id",
        )
        .bind(&rascunho.order_number)
        .bind(rascunho.customer)
        .bind(rascunho.employee)
        .bind(&rascunho.total_amount)
        .bind(rascunho.payment_method.as_str())
        .bind(rascunho.payment_status.as_str())
        .bind(rascunho.order_status.as_str())
        .bind(rascunho.order_type.as_str())
        .bind(&rascunho.notes)
        .bind(rascunho.created_at)
        .fetch_one(&mut tx)
        .await?;

        gravar_itens(&mut tx, id, &rascunho.items).await?;
        let venda = carregar_venda(&mut tx, id, false)
            .await?
            .ok_or_else(|| venda_nao_encontrada(id))?;
        tx.commit().await?;
        Ok(venda)
    }

    async fn buscar_por_id(&self, id: i32) -> AppResult<Venda> {
        let sql = format!("{} WHERE s.id = $1", SELECT_VENDA);
        self.consultar(&sql, BindsConsulta::Id(id))
            .await?
            .pop()
            .ok_or_else(|| venda_nao_encontrada(id))
    }

    async fn atualizar(&self, id: i32, patch: &AtualizacaoVenda) -> AppResult<VendaAtualizada> {
        patch.validate()?;

        let mut tx = self.pool.begin().await?;
        let anterior = carregar_venda(&mut tx, id, true)
            .await?
            .ok_or_else(|| venda_nao_encontrada(id))?;

        sqlx::query(
            "UPDATE sales SET \
               total_amount = COALESCE($2, total_amount), \
               payment_method = COALESCE($3, payment_method), \
               payment_status = COALESCE($4, payment_status), \
               order_status = COALESCE($5, order_status), \
               order_type = COALESCE($6, order_type), \
               customer_id = COALESCE($7, customer_id), \
               employee_id = COALESCE($8, employee_id), \
               notes = COALESCE($9, notes), \
               updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&patch.total_amount)
        .bind(patch.payment_method.map(|v| v.as_str()))
        .bind(patch.payment_status.map(|v| v.as_str()))
        .bind(patch.order_status.map(|v| v.as_str()))
        .bind(patch.order_type.map(|v| v.as_str()))
        .bind(patch.customer)
        .bind(patch.employee)
        .bind(&patch.notes)
        .execute(&mut tx)
        .await?;

        if let Some(itens) = &patch.items {
            gravar_itens(&mut tx, id, itens).await?;
        }

        let atual = carregar_venda(&mut tx, id, false)
            .await?
            .ok_or_else(|| venda_nao_encontrada(id))?;
        tx.commit().await?;
        Ok(VendaAtualizada { anterior, atual })
    }

    async fn excluir(&self, id: i32) -> AppResult<Venda> {
        let mut tx = self.pool.begin().await?;

        let venda = carregar_venda(&mut tx, id, true)
            .await?
            .ok_or_else(|| venda_nao_encontrada(id))?;
        // sale_items cai junto pelo ON DELETE CASCADE
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;
        Ok(venda)
    }

    async fn restaurar(&self, venda: &Venda) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Sobrescrita completa: NULL no documento vira NULL na coluna
        sqlx::query(
            "INSERT INTO sales (id, order_number, customer_id, employee_id, total_amount, \
             payment_method, payment_status, order_status, order_type, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (id) DO UPDATE SET \
               order_number = EXCLUDED.order_number, \
               customer_id = EXCLUDED.customer_id, \
               employee_id = EXCLUDED.employee_id, \
               total_amount = EXCLUDED.total_amount, \
               payment_method = EXCLUDED.payment_method, \
               payment_status = EXCLUDED.payment_status, \
               order_status = EXCLUDED.order_status, \
               order_type = EXCLUDED.order_type, \
               notes = EXCLUDED.notes, \
               created_at = EXCLUDED.created_at, \
               updated_at = EXCLUDED.updated_at",
        )
        .bind(venda.id)
        .bind(&venda.order_number)
        .bind(venda.customer)
        .bind(venda.employee)
        .bind(&venda.total_amount)
        .bind(venda.payment_method.as_str())
        .bind(venda.payment_status.as_str())
        .bind(venda.order_status.as_str())
        .bind(venda.order_type.as_str())
        .bind(&venda.notes)
        .bind(venda.created_at)
        .bind(venda.updated_at)
        .execute(&mut tx)
        .await?;

        gravar_itens(&mut tx, venda.id, &venda.items).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn listar(&self) -> AppResult<Vec<Venda>> {
        let sql = format!("{} ORDER BY s.created_at DESC, s.id DESC", SELECT_VENDA);
        self.consultar(&sql, BindsConsulta::Nenhum).await
    }

    async fn listar_periodo(&self, inicio: DateTime<Utc>, fim: DateTime<Utc>) -> AppResult<Vec<Venda>> {
        let sql = format!(
            "{} WHERE s.created_at >= $1 AND s.created_at <= $2 ORDER BY s.created_at DESC, s.id DESC",
            SELECT_VENDA
        );
        self.consultar(&sql, BindsConsulta::Periodo(inicio, fim)).await
    }

    async fn recentes(&self, limite: i64) -> AppResult<Vec<Venda>> {
        let sql = format!("{} ORDER BY s.created_at DESC, s.id DESC LIMIT $1", SELECT_VENDA);
        self.consultar(&sql, BindsConsulta::Limite(limite)).await
    }

    async fn resumo_pagas(&self, desde: DateTime<Utc>) -> AppResult<ResumoVendas> {
        let (total_sales, total_amount): (i64, Option<BigDecimal>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(total_amount) FROM sales \
             WHERE created_at >= $1 AND payment_status = 'Paid'",
        )
        .bind(desde)
        .fetch_one(&self.pool)
        .await?;

        Ok(ResumoVendas {
            total_sales,
            total_amount: total_amount.unwrap_or_else(|| BigDecimal::from(0)),
        })
    }

    async fn pagas_por_mes(&self, desde: DateTime<Utc>) -> AppResult<Vec<VendasDoMes>> {
        // O mês é calculado no fuso do servidor, não no da sessão do banco
        let vendas: Vec<(DateTime<Utc>, BigDecimal)> = sqlx::query_as(
            "SELECT created_at, total_amount FROM sales \
             WHERE created_at >= $1 AND payment_status = 'Paid'",
        )
        .bind(desde)
        .fetch_all(&self.pool)
        .await?;

        Ok(agrupar_por_mes(&Local, vendas))
    }

    async fn cliente_existe(&self, id: i32) -> AppResult<bool> {
        self.existe_em("SELECT id FROM customers WHERE id = $1", id).await
    }

    async fn funcionario_existe(&self, id: i32) -> AppResult<bool> {
        self.existe_em("SELECT id FROM employees WHERE id = $1", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendas::store_memoria::StoreMemoria;
    use crate::vendas::vendas_structs::{MetodoPagamento, StatusPagamento};
    use chrono::FixedOffset;

    fn rascunho(order_number: &str, valor: i64, created_at: DateTime<Local>) -> RascunhoVenda {
        RascunhoVenda {
            order_number: order_number.into(),
            customer: None,
            employee: None,
            items: vec![ItemVenda {
                product: 1,
                name: "Kebab Ayam".into(),
                price: BigDecimal::from(valor),
                quantity: 1,
            }],
            total_amount: BigDecimal::from(valor),
            payment_method: MetodoPagamento::Dinheiro,
            payment_status: Default::default(),
            order_status: Default::default(),
            order_type: Default::default(),
            notes: None,
            created_at: created_at.with_timezone(&Utc),
        }
    }

    #[test]
    fn limites_do_dia_cobrem_o_dia_inteiro() {
        let dia = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let inicio = inicio_do_dia(dia).with_timezone(&Local);
        let fim = fim_do_dia(dia).with_timezone(&Local);

        assert_eq!(inicio.date_naive(), dia);
        assert_eq!(fim.date_naive(), dia);
        assert_eq!((fim - inicio).num_milliseconds(), 24 * 60 * 60 * 1000 - 1);
    }

    #[test]
    fn meses_seguem_o_fuso_informado() {
        let jacarta = FixedOffset::east_opt(7 * 3600).unwrap();
        let vendas = vec![
            (Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap(), BigDecimal::from(100)),
            // 31/03 20:00 UTC já é 01/04 em UTC+7
            (Utc.with_ymd_and_hms(2025, 3, 31, 20, 0, 0).unwrap(), BigDecimal::from(50)),
        ];

        let meses = agrupar_por_mes(&jacarta, vendas.clone());
        assert_eq!(
            meses,
            vec![
                VendasDoMes { month: 3, total_sales: 1, total_amount: BigDecimal::from(100) },
                VendasDoMes { month: 4, total_sales: 1, total_amount: BigDecimal::from(50) },
            ]
        );

        let em_utc = agrupar_por_mes(&Utc, vendas);
        assert_eq!(em_utc.len(), 1);
        assert_eq!(em_utc[0].total_amount, BigDecimal::from(150));
    }

    #[tokio::test]
    async fn atualizar_rejeita_total_nao_positivo() {
        let store = StoreMemoria::new();
        let venda = store.criar(rascunho("KB-250520-0001", 100, Local::now())).await.unwrap();

        let patch = AtualizacaoVenda {
            total_amount: Some(BigDecimal::from(-5)),
            ..AtualizacaoVenda::default()
        };
        assert!(matches!(
            store.atualizar(venda.id, &patch).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn atualizar_devolve_o_documento_substituido() {
        let store = StoreMemoria::new();
        let venda = store.criar(rascunho("KB-1", 100, Local::now())).await.unwrap();

        let patch = AtualizacaoVenda {
            notes: Some("sem pimenta".into()),
            ..AtualizacaoVenda::default()
        };
        let VendaAtualizada { anterior, atual } = store.atualizar(venda.id, &patch).await.unwrap();
        assert_eq!(anterior.notes, None);
        assert_eq!(atual.notes.as_deref(), Some("sem pimenta"));
        assert_eq!(anterior.order_number, atual.order_number);
    }

    #[tokio::test]
    async fn restaurar_sobrescreve_inclusive_campos_vazios() {
        let store = StoreMemoria::new();
        store.adicionar_cliente(42, "Dewi");
        let original = store.criar(rascunho("KB-2", 100, Local::now())).await.unwrap();

        let patch = AtualizacaoVenda {
            customer: Some(42),
            notes: Some("x".into()),
            ..AtualizacaoVenda::default()
        };
        store.atualizar(original.id, &patch).await.unwrap();

        store.restaurar(&original).await.unwrap();
        let restaurada = store.buscar_por_id(original.id).await.unwrap();
        assert_eq!(restaurada.customer, None);
        assert_eq!(restaurada.customer_details, None);
        assert_eq!(restaurada.notes, None);
    }

    #[tokio::test]
    async fn estatisticas_contam_somente_vendas_pagas() {
        let store = StoreMemoria::new();
        let agora = Local::now();

        let paga = store.criar(rascunho("KB-3", 100, agora)).await.unwrap();
        store.criar(rascunho("KB-4", 300, agora)).await.unwrap();
        let patch = AtualizacaoVenda {
            payment_status: Some(StatusPagamento::Pago),
            ..AtualizacaoVenda::default()
        };
        store.atualizar(paga.id, &patch).await.unwrap();

        let stats = coletar_estatisticas(&store, agora).await.unwrap();
        assert_eq!(stats.today.total_sales, 1);
        assert_eq!(stats.today.total_amount, BigDecimal::from(100));
        assert_eq!(stats.year.total_sales, 1);
        assert_eq!(stats.monthly_breakdown.len(), 1);
        assert_eq!(stats.monthly_breakdown[0].month, agora.month());
    }

    #[tokio::test]
    async fn excluir_retorna_documento_e_depois_nao_encontra() {
        let store = StoreMemoria::new();
        let venda = store.criar(rascunho("KB-5", 50, Local::now())).await.unwrap();

        let removida = store.excluir(venda.id).await.unwrap();
        assert_eq!(removida.order_number, "KB-5");
        assert!(matches!(store.buscar_por_id(venda.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.excluir(venda.id).await, Err(AppError::NotFound(_))));
    }
}
