//! Maps the check-in service's payloads onto [`CheckInRecord`] and [`Groomer`].
//!
//! The service has renamed its fields several times, so every canonical
//! attribute has an ordered list of candidate keys. The first candidate that
//! is present, non-null and non-blank wins; when none match the attribute
//! falls back to a default instead of failing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::record::{CheckInId, CheckInRecord, Groomer, GroomerId, Priority, Status};

/// A candidate location inside a payload, as a key path.
type KeyPath = &'static [&'static str];

const ID_KEYS: &[KeyPath] = &[&["idCheckin"], &["idCheckIn"], &["id"], &["checkinId"]];
const PET_KEYS: &[KeyPath] = &[
    &["petNome"],
    &["pet", "nomePet"],
    &["pet", "name"],
    &["nomePet"],
    &["petName"],
];
const TUTOR_KEYS: &[KeyPath] = &[
    &["nomeTutor"],
    &["tutor", "nomeTutor"],
    &["tutor", "name"],
    &["tutorName"],
];
const BREED_KEYS: &[KeyPath] = &[
    &["racaNome"],
    &["raca", "nomeRaca"],
    &["raca"],
    &["breed"],
    &["breedName"],
];
const STATUS_KEYS: &[KeyPath] = &[&["status"], &["situacao"]];
const PRIORITY_KEYS: &[KeyPath] = &[&["priority"], &["prioridade"]];
const GROOMER_ID_KEYS: &[KeyPath] = &[
    &["groomer", "idGroomer"],
    &["groomer", "id"],
    &["groomer", "groomerId"],
    &["idGroomer"],
    &["groomerId"],
];
const GROOMER_NAME_KEYS: &[KeyPath] = &[
    &["groomerNome"],
    &["groomer", "nomeGroomer"],
    &["groomer", "nome"],
    &["groomer", "name"],
    &["nomeGroomer"],
    &["groomer"],
];
const SERVICE_LIST_KEYS: &[KeyPath] = &[
    &["servicos"],
    &["services"],
    &["listaServicos"],
    &["itensServico"],
    &["itens"],
    &["servicosExecutados"],
];
const SERVICE_NAME_KEYS: &[KeyPath] = &[
    &["nomeService"],
    &["nomeServico"],
    &["nome"],
    &["descricao"],
    &["description"],
    &["serviceName"],
    &["title"],
];
const SERVICE_TEXT_KEYS: &[KeyPath] = &[
    &["servicosNome"],
    &["serviceNames"],
    &["descricaoServicos"],
];
const OBSERVATION_KEYS: &[KeyPath] = &[&["observacoes"], &["observacao"], &["observations"]];
const PERFUME_KEYS: &[KeyPath] = &[&["passaPerfume"], &["isPassaPerfume"], &["perfumeRequested"]];
const DECORATION_KEYS: &[KeyPath] = &[
    &["colocaEnfeite"],
    &["isColocaEnfeite"],
    &["decorationRequested"],
];
const MODIFIED_KEYS: &[KeyPath] = &[&["wasModified"], &["modificado"], &["editado"]];
const CREATED_KEYS: &[KeyPath] = &[
    &["dataHoraCriacao"],
    &["dataCheckin"],
    &["checkinAt"],
    &["createdAt"],
];
const FINISHED_KEYS: &[KeyPath] = &[
    &["dataHoraFinalizacao"],
    &["dataFinalizacao"],
    &["finishedAt"],
];

const ROSTER_ID_KEYS: &[KeyPath] = &[&["idGroomer"], &["id"], &["groomerId"]];
const ROSTER_NAME_KEYS: &[KeyPath] = &[&["nomeGroomer"], &["nome"], &["name"]];

/// Name used for a groomer whose payload carries an id but no name.
pub const FALLBACK_GROOMER_NAME: &str = "Groomer";

fn lookup<'a>(value: &'a Value, path: KeyPath) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First candidate that is present and not blank.
fn pick<'a>(value: &'a Value, candidates: &[KeyPath]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|v| !is_blank(v))
}

/// Like [`pick`], but only accepts string values.
fn pick_str<'a>(value: &'a Value, candidates: &[KeyPath]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn pick_string(value: &Value, candidates: &[KeyPath]) -> String {
    pick_str(value, candidates).unwrap_or_default().to_string()
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn pick_id(value: &Value, candidates: &[KeyPath]) -> Option<i64> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(as_id)
}

fn pick_bool(value: &Value, candidates: &[KeyPath], default: bool) -> bool {
    match pick(value, candidates) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "sim" | "1" => true,
            "false" | "nao" | "não" | "0" => false,
            _ => default,
        },
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(default),
        _ => default,
    }
}

/// Parses RFC 3339, or an offset-less ISO local date-time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn pick_timestamp(value: &Value, candidates: &[KeyPath]) -> Option<DateTime<Utc>> {
    pick_str(value, candidates).and_then(parse_timestamp)
}

fn service_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => pick_str(item, SERVICE_NAME_KEYS).map(str::to_string),
        _ => None,
    }
}

fn collect_services(value: &Value) -> Vec<String> {
    let arrays: Vec<&Vec<Value>> = SERVICE_LIST_KEYS
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter_map(Value::as_array)
        .collect();

    let mut names: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !names.contains(&name) {
            names.push(name);
        }
    };

    if arrays.is_empty() {
        if let Some(text) = pick_str(value, SERVICE_TEXT_KEYS) {
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .for_each(|s| push(s.to_string()));
        }
    } else {
        arrays
            .into_iter()
            .flatten()
            .filter_map(service_name)
            .for_each(&mut push);
    }
    names
}

/// Listings usually name the groomer without an id; either one is enough.
fn pick_groomer(value: &Value) -> Option<Groomer> {
    let name = pick_str(value, GROOMER_NAME_KEYS);
    match (pick_id(value, GROOMER_ID_KEYS), name) {
        (Some(id), name) => Some(Groomer::new(id, name.unwrap_or(FALLBACK_GROOMER_NAME))),
        (None, Some(name)) => Some(Groomer::named(name)),
        (None, None) => None,
    }
}

fn pick_status(value: &Value) -> Status {
    match pick_str(value, STATUS_KEYS) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            debug!(status = raw, "unrecognised status, treating as waiting");
            Status::Waiting
        }),
        None => Status::Waiting,
    }
}

/// Normalizes a single check-in payload.
///
/// Returns `None` only when no identifier can be found; every other field
/// falls back to its default.
pub fn normalize_checkin(value: &Value) -> Option<CheckInRecord> {
    let id: CheckInId = pick_id(value, ID_KEYS)?;

    Some(CheckInRecord {
        id,
        pet_name: pick_string(value, PET_KEYS),
        tutor_name: pick_string(value, TUTOR_KEYS),
        breed_name: pick_string(value, BREED_KEYS),
        status: pick_status(value),
        priority: pick_str(value, PRIORITY_KEYS)
            .map(Priority::parse_lenient)
            .unwrap_or_default(),
        groomer: pick_groomer(value),
        services: collect_services(value),
        observations: pick_str(value, OBSERVATION_KEYS).map(str::to_string),
        perfume_requested: pick_bool(value, PERFUME_KEYS, true),
        decoration_requested: pick_bool(value, DECORATION_KEYS, true),
        was_modified: pick_bool(value, MODIFIED_KEYS, false),
        created_at: pick_timestamp(value, CREATED_KEYS),
        finished_at: pick_timestamp(value, FINISHED_KEYS),
    })
}

/// Normalizes a list payload. Entries without an id are dropped; a body that
/// is not an array yields an empty list.
pub fn normalize_checkins(value: &Value) -> Vec<CheckInRecord> {
    let Some(items) = value.as_array() else {
        warn!("check-in listing is not an array, ignoring body");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let record = normalize_checkin(item);
            if record.is_none() {
                warn!("dropping check-in entry without an id");
            }
            record
        })
        .collect()
}

/// Normalizes the groomer roster. Entries without a numeric id are dropped.
pub fn normalize_groomers(value: &Value) -> Vec<Groomer> {
    let Some(items) = value.as_array() else {
        warn!("groomer roster is not an array, ignoring body");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id: GroomerId = pick_id(item, ROSTER_ID_KEYS)?;
            let name = pick_str(item, ROSTER_NAME_KEYS).unwrap_or(FALLBACK_GROOMER_NAME);
            Some(Groomer::new(id, name))
        })
        .collect()
}
