// src/funcionarios/mod.rs

pub mod funcionario_structs;
pub mod funcionario_router;
