//! Configuração do painel carregada a partir de `checkin-board.toml`.
//!
//! A struct [`BoardConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `CHECKIN_API_URL` tem precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Deserialize;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "checkin-board.toml";

/// Variável de ambiente que sobrescreve a URL do serviço.
pub const API_URL_ENV: &str = "CHECKIN_API_URL";

/// Configuração de nível superior carregada de `checkin-board.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// URL base do serviço de check-in.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Intervalo, em segundos, entre as sincronizações do painel.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Timeout de conexão com o serviço, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout total de cada requisição, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Valor padrão para a URL do serviço: servidor local.
fn default_api_base_url() -> String {
    "http://localhost:8081".to_string()
}

// Valor padrão para o intervalo de sincronização: 15s.
fn default_poll_interval_secs() -> u64 {
    15
}

// Valor padrão para o timeout de conexão: 10s.
fn default_connect_timeout_secs() -> u64 {
    10
}

// Valor padrão para o timeout de requisição: 30s.
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BoardConfig {
    /// Carrega a configuração de `checkin-board.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<BoardConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            config.api_base_url = url.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita combinações que impediriam o painel de funcionar.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }
        if self.api_base_url.trim().is_empty() {
            bail!("api_base_url must not be empty");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
