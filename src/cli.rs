//! Interface de linha de comando do painel baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (board, move, start,
//! assign, finish, groomers, history) e flags globais (--api-url, --interval, --verbose).

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use checkin_board::checkin::{CheckInId, GroomerId, Status};

/// Painel de check-ins: acompanha os atendimentos do dia por etapa.
#[derive(Debug, Parser)]
#[command(name = "checkin-board", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base do serviço de check-in (sobrescreve o arquivo de configuração).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Intervalo de sincronização em segundos.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Coluna do painel aceita pela CLI, mapeada para [`Status`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColumnArg {
    /// Aguardando atendimento.
    Waiting,
    /// Em atendimento.
    Started,
    /// Atendimento concluído.
    Finished,
}

impl From<ColumnArg> for Status {
    fn from(column: ColumnArg) -> Self {
        match column {
            ColumnArg::Waiting => Status::Waiting,
            ColumnArg::Started => Status::Started,
            ColumnArg::Finished => Status::Finished,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exibe o painel ao vivo, atualizado a cada sincronização.
    Board {
        /// Exibe o painel uma única vez e sai.
        #[arg(long)]
        once: bool,
    },

    /// Move um card para outra coluna, como no arrastar-e-soltar.
    Move {
        /// Identificador do check-in.
        id: CheckInId,
        /// Coluna de destino.
        column: ColumnArg,
    },

    /// Inicia um check-in; sem --groomer, pergunta no terminal.
    Start {
        /// Identificador do check-in.
        id: CheckInId,
        /// Groomer responsável.
        #[arg(long)]
        groomer: Option<GroomerId>,
    },

    /// Escolhe o groomer de um check-in aguardando, pelo seletor do terminal.
    Assign {
        /// Identificador do check-in.
        id: CheckInId,
    },

    /// Finaliza um check-in em andamento.
    Finish {
        /// Identificador do check-in.
        id: CheckInId,
    },

    /// Lista os groomers cadastrados.
    Groomers,

    /// Lista os atendimentos de uma data (AAAA-MM-DD).
    History {
        #[arg(long)]
        date: NaiveDate,
    },
}
