// src/shared/validacoes.rs

use bigdecimal::BigDecimal;
use validator::ValidationError;

// As colunas de dinheiro são NUMERIC(12, 2): até 10 dígitos inteiros
const CASAS_DECIMAIS: i64 = 2;
const LIMITE_INTEIRO: i64 = 10_000_000_000;

/// Confere se o valor cabe numa coluna NUMERIC(12, 2) sem arredondar.
pub fn validar_formato_monetario(valor: &BigDecimal) -> Result<(), ValidationError> {
    if valor.with_scale(CASAS_DECIMAIS) != *valor {
        return Err(ValidationError::new("scale")
            .with_message("Valor deve ter no máximo 2 casas decimais".into()));
    }
    if valor.abs() >= BigDecimal::from(LIMITE_INTEIRO) {
        return Err(ValidationError::new("range")
            .with_message("Valor acima do limite permitido".into()));
    }
    Ok(())
}

/// Valor monetário estritamente positivo (preços, totais, salário).
pub fn validar_valor_positivo(valor: &BigDecimal) -> Result<(), ValidationError> {
    if *valor <= BigDecimal::from(0) {
        return Err(ValidationError::new("positive").with_message("Valor deve ser maior que 0".into()));
    }
    validar_formato_monetario(valor)
}

pub fn validar_valor_nao_negativo(valor: &BigDecimal) -> Result<(), ValidationError> {
    if *valor < BigDecimal::from(0) {
        return Err(ValidationError::new("non_negative")
            .with_message("Valor não pode ser negativo".into()));
    }
    validar_formato_monetario(valor)
}
