// src/clientes/mod.rs

pub mod cliente_structs;
pub mod cliente_router;
