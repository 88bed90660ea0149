//! Corpos de requisição do serviço de check-in e extração de mensagens de erro.
//!
//! Os nomes de campo seguem o formato JSON esperado pelo backend
//! (`idCheckIn`, `idGroomer`), via `serde(rename_all)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checkin::{CheckInId, GroomerId};

/// Corpo de `POST checkins/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Check-in a ser iniciado.
    pub id_check_in: CheckInId,
    /// Groomer responsável pelo atendimento.
    pub id_groomer: GroomerId,
}

/// Corpo de `POST checkins/end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRequest {
    /// Check-in a ser finalizado.
    pub id_check_in: CheckInId,
}

/// Extrai uma mensagem legível do corpo de uma resposta de erro.
///
/// Aceita uma string JSON, um objeto com `message` ou `error` em texto, ou
/// o texto cru do corpo.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidate = match &value {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| map.get("error").and_then(Value::as_str)),
            _ => None,
        };
        if let Some(msg) = candidate.filter(|m| !m.trim().is_empty()) {
            return msg.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        "unknown error".to_string()
    } else {
        body.to_string()
    }
}
