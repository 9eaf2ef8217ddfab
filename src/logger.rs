// src/logger.rs

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Inicializa o `tracing`. `RUST_LOG`, se definido, tem prioridade sobre `level`.
///
/// Os logs do crate `log` (o middleware `Logger` do actix, o sqlx) também
/// passam por aqui.
pub fn init_logger(level: &str, json_format: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
