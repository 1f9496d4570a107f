//! Interface de linha de comando do paybridge baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (serve, deploy, start)
//! e flags globais (--config, --port, --orchestrator-url, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{BridgeConfig, DEFAULT_CONFIG_PATH};

/// paybridge — ponte entre requisições de pagamento, jobs do orquestrador e serviços HTTP.
#[derive(Debug, Parser)]
#[command(name = "paybridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Caminho do arquivo de configuração.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Porta do ingress de pagamentos (sobrescreve arquivo e ambiente).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// URL do gateway do orquestrador (sobrescreve arquivo e ambiente).
    #[arg(long, global = true)]
    pub orchestrator_url: Option<String>,

    /// Habilita logs em nível debug, salvo se RUST_LOG disser outra coisa.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Implanta o processo, abre as assinaturas de jobs e serve o ingress de pagamentos (padrão).
    Serve,

    /// Implanta a definição de processo e sai.
    Deploy,

    /// Inicia uma instância de processo com o objeto JSON fornecido como variáveis.
    Start {
        /// Variáveis, por exemplo '{"amount":100}'.
        variables: String,
    },
}

impl Cli {
    pub fn selected(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Aplica as flags da CLI sobre a configuração carregada.
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(url) = &self.orchestrator_url {
            config.orchestrator_url = url.clone();
        }
    }
}
