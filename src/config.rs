//! Configuração do paybridge carregada a partir de `paybridge.toml`.
//!
//! A struct [`BridgeConfig`] contém todos os parâmetros configuráveis.
//! Todo campo tem default, então um arquivo ausente ou parcial é aceito.
//! As variáveis de ambiente `PAYBRIDGE_*` têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::observability::LogFormat;
use crate::worker::WorkerConfig;

pub const DEFAULT_CONFIG_PATH: &str = "paybridge.toml";

/// Configuração de nível superior carregada de `paybridge.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// URL base do gateway REST do orquestrador.
    #[serde(default = "default_orchestrator_url")]
    pub orchestrator_url: String,

    /// Porta em que o ingress de pagamentos escuta.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Serviço que efetua a cobrança no cartão.
    #[serde(default = "default_charge_url")]
    pub charge_url: String,

    /// Arquivo de definição de processo implantado na inicialização.
    #[serde(default = "default_process_resource")]
    pub process_resource: PathBuf,

    /// Id do processo iniciado a cada requisição de pagamento.
    #[serde(default = "default_process_id")]
    pub process_id: String,

    #[serde(default = "default_worker_name")]
    pub worker_name: String,

    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,

    #[serde(default = "default_max_jobs_active")]
    pub max_jobs_active: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_activation_timeout_ms")]
    pub activation_timeout_ms: u64,

    /// Timeout de cada requisição HTTP de saída.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Atraso que o orquestrador aguarda antes de redespachar um job falho.
    #[serde(default)]
    pub retry_backoff_ms: u64,

    /// Variável de processo que registra se a cobrança teve sucesso.
    #[serde(default = "default_success_flag")]
    pub success_flag: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_orchestrator_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_listen_port() -> u16 {
    8100
}

fn default_charge_url() -> String {
    "http://localhost:8099/charge".to_string()
}

fn default_process_resource() -> PathBuf {
    PathBuf::from("payment.bpmn")
}

fn default_process_id() -> String {
    "paymentV5".to_string()
}

fn default_worker_name() -> String {
    "paybridge".to_string()
}

fn default_job_timeout_ms() -> u64 {
    30_000
}

fn default_max_jobs_active() -> u32 {
    32
}

fn default_poll_interval_ms() -> u64 {
    100
}

// Must stay below request_timeout_ms or long polls get cut off client-side.
fn default_activation_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_success_flag() -> String {
    "chargeSuccess".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            orchestrator_url: default_orchestrator_url(),
            listen_port: default_listen_port(),
            charge_url: default_charge_url(),
            process_resource: default_process_resource(),
            process_id: default_process_id(),
            worker_name: default_worker_name(),
            job_timeout_ms: default_job_timeout_ms(),
            max_jobs_active: default_max_jobs_active(),
            poll_interval_ms: default_poll_interval_ms(),
            activation_timeout_ms: default_activation_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_backoff_ms: 0,
            success_flag: default_success_flag(),
            log_format: LogFormat::default(),
        }
    }
}

impl BridgeConfig {
    /// Carrega a configuração de `path` e aplica as variáveis de ambiente.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<BridgeConfig>(&contents)
                .with_context(|| format!("invalid config in {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Sobrescreve campos a partir das variáveis `PAYBRIDGE_*`; valores vazios são ignorados.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(url) = var("PAYBRIDGE_ORCHESTRATOR_URL") {
            self.orchestrator_url = url;
        }
        if let Some(port) = var("PAYBRIDGE_LISTEN_PORT") {
            self.listen_port = port
                .parse()
                .with_context(|| format!("PAYBRIDGE_LISTEN_PORT is not a port: {port}"))?;
        }
        if let Some(url) = var("PAYBRIDGE_CHARGE_URL") {
            self.charge_url = url;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn worker(&self) -> WorkerConfig {
        WorkerConfig {
            worker_name: self.worker_name.clone(),
            job_timeout_ms: self.job_timeout_ms,
            max_jobs_active: self.max_jobs_active,
            poll_interval_ms: self.poll_interval_ms,
            activation_timeout_ms: self.activation_timeout_ms,
        }
    }
}
