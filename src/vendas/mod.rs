// src/vendas/mod.rs

pub mod vendas_structs;
pub mod vendas_router;
// Sequência diária do número do pedido (KB-YYMMDD-NNNN)
pub mod numero_pedido;
pub mod repositorio_vendas;
// Venda + ledger de produtos, com rollback
pub mod coordenador_vendas;

#[cfg(test)]
pub mod store_memoria;
