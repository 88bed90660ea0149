//! Interface de terminal do painel: spinner, colunas coloridas e o seletor
//! de groomer.
//!
//! Usa as crates `indicatif` para o spinner de carregamento e `console` para
//! estilização e leitura do terminal. [`serve_prompts`] é o lado humano do
//! portão de atribuição de groomer.

use std::fmt::Write as _;

use console::{Key, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use checkin_board::board::{
    AssignmentRequest, BoardColumns, GateDecision, Notice, PendingAssignment, SyncState,
    TransitionOutcome,
};
use checkin_board::checkin::{CheckInRecord, Groomer, Priority, Status};

/// Spinner exibido enquanto a primeira carga do painel não termina.
pub struct LoadingSpinner {
    pb: ProgressBar,
}

impl LoadingSpinner {
    /// Inicia o spinner com a mensagem fornecida.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    /// Remove o spinner do terminal.
    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

fn priority_badge(priority: Priority) -> String {
    match priority {
        Priority::High => Style::new().red().bold().apply_to("[HIGH]").to_string(),
        Priority::Medium => Style::new().yellow().apply_to("[MEDIUM]").to_string(),
        Priority::Normal => String::new(),
    }
}

fn card_line(record: &CheckInRecord) -> String {
    let mut line = format!("#{} {}", record.id, display_or_dash(&record.pet_name));
    let badge = priority_badge(record.priority);
    if !badge.is_empty() {
        line.push(' ');
        line.push_str(&badge);
    }
    if record.observations.is_some() {
        line.push_str(" (!)");
    }
    let groomer = record
        .groomer
        .as_ref()
        .map(|g| g.name.as_str())
        .unwrap_or("-");
    let _ = write!(line, " · groomer {groomer}");
    if !record.services.is_empty() {
        let _ = write!(line, " · {}", record.services.join(", "));
    }
    line
}

fn display_or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

/// Renderiza o painel completo como texto.
pub fn render_board(
    columns: &BoardColumns,
    state: SyncState,
    banner: Option<&str>,
    alerts: &[Notice],
) -> String {
    let heading = Style::new().cyan().bold();
    let dim = Style::new().dim();
    let red = Style::new().red().bold();
    let mut out = String::new();

    if state == SyncState::Refreshing {
        let _ = writeln!(out, "{}", dim.apply_to("refreshing…"));
    }
    if let Some(banner) = banner {
        let _ = writeln!(out, "{} {banner}", red.apply_to("Error:"));
    }
    for notice in alerts {
        let _ = writeln!(out, "{} {}", red.apply_to("✗"), notice.message);
    }

    for status in Status::ALL {
        let cards = columns.column(status);
        let _ = writeln!(
            out,
            "{}",
            heading.apply_to(format!("── {} ({}) ──", status.label(), cards.len()))
        );
        if cards.is_empty() {
            let _ = writeln!(out, "  {}", dim.apply_to("No items."));
        }
        for card in cards {
            let _ = writeln!(out, "  {}", card_line(card));
        }
    }
    out
}

/// Renderiza uma listagem histórica em formato de tabela.
pub fn render_history(records: &[CheckInRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let finished = r
            .finished_at
            .map(|t| t.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let created = r
            .created_at
            .map(|t| t.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<16} {:<16} {:<14} {:<10} {:<16} {:<16} {}",
            display_or_dash(&r.pet_name),
            display_or_dash(&r.tutor_name),
            display_or_dash(&r.breed_name),
            r.status,
            r.groomer.as_ref().map(|g| g.name.as_str()).unwrap_or("-"),
            created,
            finished,
        );
    }
    let _ = writeln!(out, "Total: {} pets", records.len());
    out
}

/// Descreve o resultado de uma transição para o usuário.
pub fn describe_outcome(outcome: &TransitionOutcome) -> String {
    match outcome {
        TransitionOutcome::Applied(record) => {
            let green = Style::new().green().bold();
            format!(
                "{} #{} is now {}",
                green.apply_to("✓"),
                record.id,
                record.status.label()
            )
        }
        TransitionOutcome::Ignored(reason) => format!("nothing to do: {reason}"),
        TransitionOutcome::Cancelled => "cancelled".to_string(),
    }
}

/// Interpreta a resposta digitada no seletor de groomer.
///
/// Aceita o número da lista (a partir de 1); vazio ou inválido cancela.
pub fn parse_choice(input: &str, roster: &[Groomer]) -> GateDecision {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| roster.get(i))
        .map(|g| GateDecision::Selected(g.clone()))
        .unwrap_or(GateDecision::Cancelled)
}

fn ask(term: &Term, request: &AssignmentRequest) -> std::io::Result<GateDecision> {
    term.write_line(&format!(
        "Choose a groomer for #{} {}:",
        request.check_in,
        display_or_dash(&request.pet_name)
    ))?;
    if request.roster.is_empty() {
        term.write_line("  No groomers available.")?;
        return Ok(GateDecision::Cancelled);
    }
    for (i, groomer) in request.roster.iter().enumerate() {
        term.write_line(&format!("  [{}] {}", i + 1, groomer.name))?;
    }
    term.write_str("Number (empty to cancel): ")?;
    let line = term.read_line()?;
    Ok(parse_choice(&line, &request.roster))
}

/// Responde no terminal, uma de cada vez, às escolhas de groomer pedidas
/// pelo painel. Erros de leitura cancelam o pedido.
pub async fn serve_prompts(mut requests: mpsc::Receiver<PendingAssignment>) {
    while let Some(pending) = requests.recv().await {
        let request = pending.request.clone();
        let answer = tokio::task::spawn_blocking(move || ask(&Term::stdout(), &request)).await;
        match answer {
            Ok(Ok(GateDecision::Selected(groomer))) => pending.select(groomer),
            _ => pending.cancel(),
        }
    }
}

/// Teclas aceitas no painel ao vivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKey {
    Refresh,
    Quit,
}

/// Traduz uma tecla do terminal em comando do painel.
pub fn board_key(key: &Key) -> Option<BoardKey> {
    match key {
        Key::Char('r') | Key::Char('R') => Some(BoardKey::Refresh),
        Key::Char('q') | Key::Char('Q') | Key::Escape => Some(BoardKey::Quit),
        _ => None,
    }
}

/// Lê teclas do terminal em uma thread dedicada. Retorna `None` quando a
/// saída não é um terminal; o canal fecha se a leitura for interrompida.
pub fn spawn_key_reader() -> Option<mpsc::Receiver<BoardKey>> {
    if !Term::stdout().is_term() {
        return None;
    }
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        let term = Term::stdout();
        while let Ok(key) = term.read_key() {
            if let Some(cmd) = board_key(&key)
                && tx.blocking_send(cmd).is_err()
            {
                break;
            }
        }
    });
    Some(rx)
}
