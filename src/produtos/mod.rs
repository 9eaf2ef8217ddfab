// src/produtos/mod.rs

pub mod produtos_structs;
pub mod produtos_router;
// Ledger de unidades vendidas (total_sold)
pub mod ledger_produtos;
