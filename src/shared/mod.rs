// src/shared/mod.rs

// Envelope de resposta e macro dos enums de texto
pub mod shared_structs;
// Tipo de erro da aplicação e conversão para respostas HTTP
pub mod error;
// Validadores reaproveitados pelos módulos (valores monetários)
pub mod validacoes;
