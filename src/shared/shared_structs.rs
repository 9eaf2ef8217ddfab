// src/shared/shared_structs.rs

use serde::Serialize;

/// Estrutura genérica para padronizar as respostas de sucesso da API.
/// Segue o formato `{ success, count?, data? }` consumido pelo frontend.
#[derive(Serialize)]
pub struct GenericResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")] // Só aparece nas listagens
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")] // Não serializa 'data' se for None
    pub data: Option<T>,
}

impl<T> GenericResponse<T> {
    /// Resposta de sucesso com um único documento.
    pub fn ok(data: T) -> Self {
        GenericResponse {
            success: true,
            count: None,
            data: Some(data),
        }
    }
}

impl<T> GenericResponse<Vec<T>> {
    /// Resposta de sucesso para listagens, com o total de itens.
    pub fn list(data: Vec<T>) -> Self {
        GenericResponse {
            success: true,
            count: Some(data.len()),
            data: Some(data),
        }
    }
}

/// Corpo vazio (`{}`) usado nas respostas de exclusão e logout.
#[derive(Serialize, Default)]
pub struct Empty {}

impl GenericResponse<Empty> {
    /// Resposta só com a contagem (`{ success, count }`).
    pub fn count_only(count: usize) -> Self {
        GenericResponse {
            success: true,
            count: Some(count),
            data: None,
        }
    }
}

/// Gera um enum cujos valores trafegam como texto (JSON e colunas VARCHAR).
///
/// Cada variante recebe o nome exato usado na API, e o enum ganha
/// `as_str`, `FromStr` e `Display` com esse mesmo texto. Valores fora
/// do conjunto são rejeitados na desserialização.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(format!("Valor inválido para {}: {}", stringify!($name), other)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use wire_enum;
