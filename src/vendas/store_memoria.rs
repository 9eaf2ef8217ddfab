// src/vendas/store_memoria.rs
//
// Armazenamento em memória usado nos testes do coordenador e das rotas.
// Implementa ledger, sequenciador e repositório, com falhas injetáveis.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::web;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Local, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use validator::Validate;

use super::coordenador_vendas::CoordenadorVendas;
use super::numero_pedido::SequenciadorPedidos;
use super::repositorio_vendas::{agrupar_por_mes, venda_nao_encontrada, RepositorioVendas, VendaAtualizada};
use super::vendas_structs::{AtualizacaoVenda, RascunhoVenda, ResumoVendas, StatusPagamento, Venda, VendasDoMes};
use crate::clientes::cliente_structs::ResumoCliente;
use crate::funcionarios::funcionario_structs::ResumoFuncionario;
use crate::produtos::ledger_produtos::{produto_nao_encontrado, LedgerProdutos};
use crate::shared::error::{AppError, AppResult};
use crate::usuarios::auth_middleware::gerar_token;
use crate::usuarios::usuario_structs::{Papel, Usuario};
use crate::AppState;

pub const SEGREDO_TESTE: &str = "segredo-de-teste";

#[derive(Default)]
struct Interno {
    produtos: HashMap<i32, i32>,
    clientes: HashMap<i32, ResumoCliente>,
    funcionarios: HashMap<i32, ResumoFuncionario>,
    vendas: BTreeMap<i32, Venda>,
    proximo_id: i32,
    sequencias: HashMap<NaiveDate, u32>,
    chamadas_ajuste: usize,
}

impl Interno {
    // Os detalhes sempre refletem os cadastros atuais, como no LEFT JOIN
    fn preencher(&self, mut venda: Venda) -> Venda {
        venda.customer_details = venda.customer.and_then(|id| self.clientes.get(&id).cloned());
        venda.employee_details = venda.employee.and_then(|id| self.funcionarios.get(&id).cloned());
        venda
    }

    fn venda(&self, id: i32) -> AppResult<Venda> {
        self.vendas
            .get(&id)
            .cloned()
            .map(|v| self.preencher(v))
            .ok_or_else(|| venda_nao_encontrada(id))
    }
}

/// Falhas programadas. As "próxima" são consumidas ao disparar.
#[derive(Default)]
struct Falhas {
    chamada_ajuste: Option<usize>,
    produto_ajuste: Option<i32>,
    atraso_ajuste: Option<Duration>,
    proxima_sequencia: bool,
    proxima_criacao: bool,
    proxima_exclusao: bool,
    proxima_atualizacao: bool,
    proxima_restauracao: bool,
}

#[derive(Default)]
pub struct StoreMemoria {
    interno: Mutex<Interno>,
    falhas: Mutex<Falhas>,
}

impl StoreMemoria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn com_produtos(ids: &[i32]) -> Self {
        let store = Self::new();
        for id in ids {
            store.adicionar_produto(*id);
        }
        store
    }

    pub fn adicionar_produto(&self, id: i32) {
        self.interno.lock().unwrap().produtos.insert(id, 0);
    }

    pub fn remover_produto(&self, id: i32) {
        self.interno.lock().unwrap().produtos.remove(&id);
    }

    pub fn adicionar_cliente(&self, id: i32, nome: &str) {
        let cliente = ResumoCliente {
            id,
            name: nome.to_string(),
            email: format!("{}@kebab.id", nome.to_lowercase()),
            phone: "0812000000".to_string(),
        };
        self.interno.lock().unwrap().clientes.insert(id, cliente);
    }

    pub fn adicionar_funcionario(&self, id: i32, nome: &str) {
        let funcionario = ResumoFuncionario {
            id,
            name: nome.to_string(),
        };
        self.interno.lock().unwrap().funcionarios.insert(id, funcionario);
    }

    pub fn total_sold(&self, id: i32) -> i32 {
        self.interno.lock().unwrap().produtos[&id]
    }

    /// Soma das quantidades do produto em todas as vendas gravadas.
    pub fn quantidade_nas_vendas(&self, produto_id: i32) -> i32 {
        self.interno
            .lock()
            .unwrap()
            .vendas
            .values()
            .flat_map(|v| v.items.iter())
            .filter(|i| i.product == produto_id)
            .map(|i| i.quantity)
            .sum()
    }

    pub fn quantidade_vendas(&self) -> usize {
        self.interno.lock().unwrap().vendas.len()
    }

    pub fn chamadas_ajuste(&self) -> usize {
        self.interno.lock().unwrap().chamadas_ajuste
    }

    /// A chamada número `n` (contando a partir de 1, desde a criação) a `ajustar` falha.
    pub fn falhar_chamada_ajuste(&self, n: usize) {
        self.falhas.lock().unwrap().chamada_ajuste = Some(n);
    }

    /// Todo ajuste neste produto falha.
    pub fn falhar_ajustes_do_produto(&self, produto_id: i32) {
        self.falhas.lock().unwrap().produto_ajuste = Some(produto_id);
    }

    pub fn atrasar_ajustes(&self, atraso: Duration) {
        self.falhas.lock().unwrap().atraso_ajuste = Some(atraso);
    }

    pub fn falhar_proxima_sequencia(&self) {
        self.falhas.lock().unwrap().proxima_sequencia = true;
    }

    pub fn falhar_proxima_criacao(&self) {
        self.falhas.lock().unwrap().proxima_criacao = true;
    }

    pub fn falhar_proxima_exclusao(&self) {
        self.falhas.lock().unwrap().proxima_exclusao = true;
    }

    pub fn falhar_proxima_atualizacao(&self) {
        self.falhas.lock().unwrap().proxima_atualizacao = true;
    }

    pub fn falhar_proxima_restauracao(&self) {
        self.falhas.lock().unwrap().proxima_restauracao = true;
    }

    fn consumir_falha(&self, escolher: impl FnOnce(&mut Falhas) -> &mut bool) -> bool {
        let mut falhas = self.falhas.lock().unwrap();
        std::mem::take(escolher(&mut falhas))
    }

    fn pagas_desde(&self, desde: DateTime<Utc>) -> Vec<Venda> {
        self.interno
            .lock()
            .unwrap()
            .vendas
            .values()
            .filter(|v| v.created_at >= desde && v.payment_status == StatusPagamento::Pago)
            .cloned()
            .collect()
    }

    fn mais_novas_primeiro(&self) -> Vec<Venda> {
        let interno = self.interno.lock().unwrap();
        let mut vendas: Vec<Venda> = interno.vendas.values().cloned().map(|v| interno.preencher(v)).collect();
        vendas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        vendas
    }
}

fn injetada(onde: &str) -> AppError {
    AppError::Storage(format!("falha injetada: {}", onde))
}

#[async_trait]
impl LedgerProdutos for StoreMemoria {
    async fn existe(&self, produto_id: i32) -> AppResult<bool> {
        Ok(self.interno.lock().unwrap().produtos.contains_key(&produto_id))
    }

    async fn ajustar(&self, produto_id: i32, delta: i32) -> AppResult<i32> {
        let (atraso, chamada, produto) = {
            let falhas = self.falhas.lock().unwrap();
            (falhas.atraso_ajuste, falhas.chamada_ajuste, falhas.produto_ajuste)
        };
        if let Some(atraso) = atraso {
            tokio::time::sleep(atraso).await;
        }

        let mut interno = self.interno.lock().unwrap();
        interno.chamadas_ajuste += 1;
        if chamada == Some(interno.chamadas_ajuste) || produto == Some(produto_id) {
            return Err(injetada("adjust"));
        }
        match interno.produtos.get_mut(&produto_id) {
            Some(total_sold) => {
                *total_sold += delta;
                Ok(*total_sold)
            }
            None => Err(produto_nao_encontrado(produto_id)),
        }
    }
}

#[async_trait]
impl SequenciadorPedidos for StoreMemoria {
    async fn proximo_valor(&self, dia: NaiveDate) -> AppResult<u32> {
        if self.consumir_falha(|f| &mut f.proxima_sequencia) {
            return Err(injetada("sequence"));
        }
        let mut interno = self.interno.lock().unwrap();
        let valor = interno.sequencias.entry(dia).or_insert(0);
        *valor += 1;
        Ok(*valor)
    }
}

#[async_trait]
impl RepositorioVendas for StoreMemoria {
    async fn criar(&self, rascunho: RascunhoVenda) -> AppResult<Venda> {
        if self.consumir_falha(|f| &mut f.proxima_criacao) {
            return Err(injetada("create"));
        }
        let mut interno = self.interno.lock().unwrap();
        if interno.vendas.values().any(|v| v.order_number == rascunho.order_number) {
            return Err(AppError::Conflict("Registro duplicado".into()));
        }
        interno.proximo_id += 1;
        let venda = Venda {
            id: interno.proximo_id,
            order_number: rascunho.order_number,
            customer: rascunho.customer,
            customer_details: None,
            employee: rascunho.employee,
            employee_details: None,
            items: rascunho.items,
            total_amount: rascunho.total_amount,
            payment_method: rascunho.payment_method,
            payment_status: rascunho.payment_status,
            order_status: rascunho.order_status,
            order_type: rascunho.order_type,
            notes: rascunho.notes,
            created_at: rascunho.created_at,
            updated_at: rascunho.created_at,
        };
        interno.vendas.insert(venda.id, venda.clone());
        Ok(interno.preencher(venda))
    }

    async fn buscar_por_id(&self, id: i32) -> AppResult<Venda> {
        self.interno.lock().unwrap().venda(id)
    }

    async fn atualizar(&self, id: i32, patch: &AtualizacaoVenda) -> AppResult<VendaAtualizada> {
        patch.validate()?;
        if self.consumir_falha(|f| &mut f.proxima_atualizacao) {
            return Err(injetada("update"));
        }
        let mut interno = self.interno.lock().unwrap();
        let anterior = interno.venda(id)?;
        let venda = interno.vendas.get_mut(&id).ok_or_else(|| venda_nao_encontrada(id))?;
        venda.aplicar_atualizacao(patch);
        venda.updated_at = Utc::now();
        let atual = venda.clone();
        Ok(VendaAtualizada {
            anterior,
            atual: interno.preencher(atual),
        })
    }

    async fn excluir(&self, id: i32) -> AppResult<Venda> {
        if self.consumir_falha(|f| &mut f.proxima_exclusao) {
            return Err(injetada("delete"));
        }
        let mut interno = self.interno.lock().unwrap();
        let venda = interno.vendas.remove(&id).ok_or_else(|| venda_nao_encontrada(id))?;
        Ok(interno.preencher(venda))
    }

    async fn restaurar(&self, venda: &Venda) -> AppResult<()> {
        if self.consumir_falha(|f| &mut f.proxima_restauracao) {
            return Err(injetada("restore"));
        }
        self.interno.lock().unwrap().vendas.insert(venda.id, venda.clone());
        Ok(())
    }

    async fn listar(&self) -> AppResult<Vec<Venda>> {
        Ok(self.mais_novas_primeiro())
    }

    async fn listar_periodo(&self, inicio: DateTime<Utc>, fim: DateTime<Utc>) -> AppResult<Vec<Venda>> {
        Ok(self
            .mais_novas_primeiro()
            .into_iter()
            .filter(|v| v.created_at >= inicio && v.created_at <= fim)
            .collect())
    }

    async fn recentes(&self, limite: i64) -> AppResult<Vec<Venda>> {
        let mut vendas = self.mais_novas_primeiro();
        vendas.truncate(limite.max(0) as usize);
        Ok(vendas)
    }

    async fn resumo_pagas(&self, desde: DateTime<Utc>) -> AppResult<ResumoVendas> {
        let vendas = self.pagas_desde(desde);
        Ok(ResumoVendas {
            total_sales: vendas.len() as i64,
            total_amount: vendas
                .iter()
                .fold(BigDecimal::from(0), |acc, v| acc + &v.total_amount),
        })
    }

    async fn pagas_por_mes(&self, desde: DateTime<Utc>) -> AppResult<Vec<VendasDoMes>> {
        let vendas = self.pagas_desde(desde);
        Ok(agrupar_por_mes(
            &Local,
            vendas.into_iter().map(|v| (v.created_at, v.total_amount)),
        ))
    }

    async fn cliente_existe(&self, id: i32) -> AppResult<bool> {
        Ok(self.interno.lock().unwrap().clientes.contains_key(&id))
    }

    async fn funcionario_existe(&self, id: i32) -> AppResult<bool> {
        Ok(self.interno.lock().unwrap().funcionarios.contains_key(&id))
    }
}

/// Estado das rotas com o coordenador de vendas apontando para `store`.
pub fn estado_de_teste(store: &Arc<StoreMemoria>) -> web::Data<AppState> {
    // Nunca conecta: as rotas que usam o pool não são exercitadas com banco
    let db_pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/kebab_pos_test")
        .unwrap();
    let vendas = CoordenadorVendas::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Duration::from_secs(5),
    );
    web::Data::new(AppState {
        db_pool,
        jwt_secret: SEGREDO_TESTE.to_string(),
        jwt_expire_hours: 1,
        vendas,
    })
}

/// Cabeçalho `Authorization` com um token válido para o papel.
pub fn bearer(papel: Papel) -> (&'static str, String) {
    let usuario = Usuario {
        id: 3,
        name: "Rina".into(),
        email: "rina@kebab.id".into(),
        password_hash: String::new(),
        role: papel,
        created_at: Utc::now(),
    };
    let token = gerar_token(&usuario, SEGREDO_TESTE, 1).unwrap();
    ("Authorization", format!("Bearer {}", token))
}
