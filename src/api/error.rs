//! Tipos de erro para o cliente do serviço de check-in.
//!
//! Define [`ApiError`] com variantes para falha de transporte, rejeição
//! pelo serviço e resposta malformada. Usa `thiserror` para derivar
//! `Display` e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o serviço de check-in.
///
/// - [`Transport`](ApiError::Transport): falha de rede (DNS, conexão, timeout)
/// - [`Rejected`](ApiError::Rejected): o serviço respondeu com status não-2xx
/// - [`Malformed`](ApiError::Malformed): resposta 2xx que não pôde ser normalizada
#[derive(Debug, Error)]
pub enum ApiError {
    /// Falha de rede subjacente. Encapsula o erro original do `reqwest`.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Rejeição de validação pelo serviço (ex.: groomer inválido).
    #[error("service rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// O corpo da resposta não contém um registro reconhecível.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Verdadeiro para falhas da camada de transporte.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Mensagem curta adequada para exibição ao usuário.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "could not reach the check-in service".to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Malformed(detail) => format!("unexpected response: {detail}"),
        }
    }
}
