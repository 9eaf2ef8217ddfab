// src/vendas/coordenador_vendas.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{Mutex as MutexAsync, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{error, info, warn};
use validator::Validate;

use super::numero_pedido::{formatar_numero_pedido, SequenciadorPedidos};
use super::repositorio_vendas::{RepositorioVendas, VendaAtualizada};
use super::vendas_structs::{AtualizacaoVenda, ItemVenda, NovaVenda, RascunhoVenda, Venda};
use crate::clientes::cliente_router::cliente_nao_encontrado;
use crate::funcionarios::funcionario_router::funcionario_nao_encontrado;
use crate::produtos::ledger_produtos::{produto_nao_encontrado, AjustesAplicados, LedgerProdutos};
use crate::shared::error::{AppError, AppResult};
use crate::usuarios::auth_middleware::AuthenticatedUser;

/// Relógio usado para datar as vendas (e escolher a sequência do dia).
pub type Relogio = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Uma trava por venda: atualização e exclusão da mesma venda rodam uma de
/// cada vez, do snapshot anterior até o fim do rollback.
#[derive(Clone, Default)]
struct TravasPorVenda {
    travas: Arc<Mutex<HashMap<i32, Arc<MutexAsync<()>>>>>,
}

impl TravasPorVenda {
    async fn travar(&self, venda_id: i32) -> OwnedMutexGuard<()> {
        let trava = {
            let mut travas = self.travas.lock().unwrap_or_else(PoisonError::into_inner);
            // Só fica no mapa a trava que alguém ainda segura ou espera
            travas.retain(|_, trava| Arc::strong_count(trava) > 1);
            travas.entry(venda_id).or_default().clone()
        };
        trava.lock_owned().await
    }

    #[cfg(test)]
    fn quantidade(&self) -> usize {
        self.travas.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Coordena venda + ledger de produtos.
///
/// Toda operação termina com os ajustes de ledger completamente aplicados
/// ou completamente desfeitos. Em caso de falha o erro devolvido é sempre o
/// original; falhas durante o rollback só vão para o log.
///
/// O chamador já deve estar autenticado e autorizado: o coordenador recebe
/// o usuário pronto e nunca consulta tokens.
#[derive(Clone)]
pub struct CoordenadorVendas {
    repositorio: Arc<dyn RepositorioVendas>,
    ledger: Arc<dyn LedgerProdutos>,
    sequenciador: Arc<dyn SequenciadorPedidos>,
    prazo_ledger: Duration,
    relogio: Relogio,
    travas: TravasPorVenda,
}

impl CoordenadorVendas {
    pub fn new(
        repositorio: Arc<dyn RepositorioVendas>,
        ledger: Arc<dyn LedgerProdutos>,
        sequenciador: Arc<dyn SequenciadorPedidos>,
        prazo_ledger: Duration,
    ) -> Self {
        CoordenadorVendas {
            repositorio,
            ledger,
            sequenciador,
            prazo_ledger,
            relogio: Arc::new(Local::now),
            travas: TravasPorVenda::default(),
        }
    }

    pub fn com_relogio(mut self, relogio: Relogio) -> Self {
        self.relogio = relogio;
        self
    }

    pub fn repositorio(&self) -> &dyn RepositorioVendas {
        self.repositorio.as_ref()
    }

    /// Cria a venda e incrementa o `total_sold` de cada item.
    pub async fn criar_venda(&self, caller: &AuthenticatedUser, request: NovaVenda) -> AppResult<Venda> {
        request.validate()?;
        // Nada é gravado antes de produtos, cliente e funcionário existirem
        self.verificar_referencias(&request.items, request.customer, request.employee)
            .await?;

        let created_at = (self.relogio)();
        let sequencia = self.sequenciador.proximo_valor(created_at.date_naive()).await?;
        let order_number = formatar_numero_pedido(&created_at, sequencia);

        let venda = self
            .repositorio
            .criar(RascunhoVenda::new(request, order_number, created_at))
            .await?;

        let deltas: Vec<(i32, i32)> = venda.items.iter().map(|i| (i.product, i.quantity)).collect();
        let mut ajustes = AjustesAplicados::new();
        if let Err(e) = self.aplicar_ajustes(&deltas, &mut ajustes).await {
            warn!(
                venda_id = venda.id,
                order_number = %venda.order_number,
                aplicados = ajustes.aplicados().len(),
                total = deltas.len(),
                error = %e,
                "Falha ao atualizar ledger; desfazendo venda"
            );
            if let Err(erro_exclusao) = self.repositorio.excluir(venda.id).await {
                error!(venda_id = venda.id, error = %erro_exclusao, "Falha ao remover venda no rollback");
            }
            ajustes.reverter(self.ledger.as_ref()).await;
            return Err(e);
        }

        info!(
            venda_id = venda.id,
            order_number = %venda.order_number,
            itens = venda.items.len(),
            user_id = caller.user_id,
            user = %caller.user_name,
            "Venda criada"
        );
        Ok(venda)
    }

    /// Atualiza a venda. Se os itens mudarem, aplica um ajuste líquido por produto
    /// calculado sobre o documento que a gravação de fato substituiu.
    pub async fn atualizar_venda(
        &self,
        caller: &AuthenticatedUser,
        id: i32,
        patch: AtualizacaoVenda,
    ) -> AppResult<Venda> {
        patch.validate()?;
        let _trava = self.travas.travar(id).await;

        self.repositorio.buscar_por_id(id).await?;
        self.verificar_referencias(
            patch.items.as_deref().unwrap_or_default(),
            patch.customer,
            patch.employee,
        )
        .await?;

        let VendaAtualizada { anterior, atual } = self.repositorio.atualizar(id, &patch).await?;

        if patch.items.is_none() {
            info!(venda_id = id, user_id = caller.user_id, "Venda atualizada");
            return Ok(atual);
        }

        let diferenca = diferenca_liquida(&anterior.items, &atual.items);
        let mut ajustes = AjustesAplicados::new();
        if let Err(e) = self.aplicar_ajustes(&diferenca, &mut ajustes).await {
            warn!(venda_id = id, error = %e, "Falha ao reconciliar ledger; restaurando venda");
            ajustes.reverter(self.ledger.as_ref()).await;
            if let Err(erro_restauracao) = self.repositorio.restaurar(&anterior).await {
                error!(venda_id = id, error = %erro_restauracao, "Falha ao restaurar venda no rollback");
            }
            return Err(e);
        }

        info!(
            venda_id = id,
            produtos_ajustados = diferenca.len(),
            user_id = caller.user_id,
            "Venda atualizada com novos itens"
        );
        Ok(atual)
    }

    /// Estorna o ledger de cada item e remove a venda.
    pub async fn excluir_venda(&self, caller: &AuthenticatedUser, id: i32) -> AppResult<()> {
        let _trava = self.travas.travar(id).await;
        let venda = self.repositorio.buscar_por_id(id).await?;

        let estorno: Vec<(i32, i32)> = venda.items.iter().map(|i| (i.product, -i.quantity)).collect();
        let mut ajustes = AjustesAplicados::new();
        if let Err(e) = self.aplicar_ajustes(&estorno, &mut ajustes).await {
            warn!(venda_id = id, error = %e, "Falha ao estornar ledger; venda mantida");
            ajustes.reverter(self.ledger.as_ref()).await;
            return Err(e);
        }

        if let Err(e) = self.repositorio.excluir(id).await {
            // Venda continua lá: o estorno precisa ser desfeito
            warn!(venda_id = id, error = %e, "Falha ao remover venda; reaplicando ledger");
            ajustes.reverter(self.ledger.as_ref()).await;
            return Err(e);
        }

        info!(
            venda_id = id,
            order_number = %venda.order_number,
            user_id = caller.user_id,
            "Venda removida"
        );
        Ok(())
    }

    async fn verificar_referencias(
        &self,
        itens: &[ItemVenda],
        cliente: Option<i32>,
        funcionario: Option<i32>,
    ) -> AppResult<()> {
        let produtos: BTreeSet<i32> = itens.iter().map(|i| i.product).collect();
        for produto_id in produtos {
            if !self.ledger.existe(produto_id).await? {
                return Err(produto_nao_encontrado(produto_id));
            }
        }
        if let Some(id) = cliente {
            if !self.repositorio.cliente_existe(id).await? {
                return Err(cliente_nao_encontrado(id));
            }
        }
        if let Some(id) = funcionario {
            if !self.repositorio.funcionario_existe(id).await? {
                return Err(funcionario_nao_encontrado(id));
            }
        }
        Ok(())
    }

    /// Aplica os ajustes em ordem, registrando cada um confirmado.
    ///
    /// O prazo é conferido antes de cada ajuste; um ajuste já iniciado
    /// sempre termina, para que `ajustes` reflita exatamente o armazenamento.
    async fn aplicar_ajustes(&self, deltas: &[(i32, i32)], ajustes: &mut AjustesAplicados) -> AppResult<()> {
        let prazo = Instant::now() + self.prazo_ledger;
        for &(produto_id, delta) in deltas {
            if Instant::now() >= prazo {
                return Err(AppError::Timeout(format!(
                    "ledger não reconciliado em {} ms ({} de {} ajustes)",
                    self.prazo_ledger.as_millis(),
                    ajustes.aplicados().len(),
                    deltas.len()
                )));
            }
            ajustes.aplicar(self.ledger.as_ref(), produto_id, delta).await?;
        }
        Ok(())
    }
}

/// Diferença líquida de quantidade por produto (novo - antigo), sem zeros.
pub fn diferenca_liquida(itens_antigos: &[ItemVenda], itens_novos: &[ItemVenda]) -> Vec<(i32, i32)> {
    let mut diferenca: BTreeMap<i32, i32> = BTreeMap::new();
    for item in itens_antigos {
        *diferenca.entry(item.product).or_insert(0) -= item.quantity;
    }
    for item in itens_novos {
        *diferenca.entry(item.product).or_insert(0) += item.quantity;
    }
    diferenca.into_iter().filter(|(_, delta)| *delta != 0).collect()
}
