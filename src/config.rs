//! Configuração do tmsync carregada a partir de `tms.toml`.
//!
//! A struct [`TmsConfig`] contém o host, os caminhos dos cinco endpoints, os
//! tokens e a política de polling. As variáveis de ambiente `TMS_ACCESS_TOKEN`
//! e `TMS_APP_TOKEN` têm precedência sobre o arquivo.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::TmsError;
use crate::orchestrator::TranslationSync;
use crate::state_machine::{
    DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_MAX_EXECUTION_TIME_SECS, PollPolicy,
};
use crate::tms::{Credentials, EndpointSet, TmsClient};

pub const CONFIG_FILE: &str = "tms.toml";
pub const ACCESS_TOKEN_ENV: &str = "TMS_ACCESS_TOKEN";
pub const APP_TOKEN_ENV: &str = "TMS_APP_TOKEN";

/// Configuração de nível superior carregada de `tms.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TmsConfig {
    /// Host do TMS, sem barra final (ex.: "https://tms.example.com").
    pub host: String,

    /// Token de acesso à API do TMS.
    #[serde(default)]
    pub access_token: String,

    /// UUID da aplicação no TMS.
    #[serde(default)]
    pub application_token: String,

    /// Caminhos dos endpoints, concatenados ao host.
    pub endpoints: EndpointSet,

    /// Intervalo entre consultas de estado, em segundos.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Tempo máximo de espera por um job, em segundos.
    #[serde(default = "default_max_execution_time_secs")]
    pub max_execution_time_secs: u64,

    /// Falha com erro quando o prazo expira em vez de retornar em silêncio.
    #[serde(default)]
    pub strict_deadline: bool,

    /// Rejeita o download da importação se o status HTTP não for 200.
    #[serde(default = "default_verify_download_status")]
    pub verify_download_status: bool,

    /// Idiomas solicitados na importação, em ordem.
    #[serde(default)]
    pub languages: Vec<String>,
}

// Valor padrão para o intervalo de consulta: 5s.
fn default_check_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

// Valor padrão para o prazo máximo: 900s.
fn default_max_execution_time_secs() -> u64 {
    DEFAULT_MAX_EXECUTION_TIME_SECS
}

fn default_verify_download_status() -> bool {
    true
}

impl TmsConfig {
    /// Carrega a configuração de `path`, ou de `tms.toml` no diretório atual.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        // Variáveis de ambiente têm precedência sobre o arquivo para os tokens.
        config.apply_env(
            std::env::var(ACCESS_TOKEN_ENV).ok(),
            std::env::var(APP_TOKEN_ENV).ok(),
        );
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str::<TmsConfig>(contents)?)
    }

    fn apply_env(&mut self, access_token: Option<String>, application_token: Option<String>) {
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            self.access_token = token;
        }
        if let Some(token) = application_token.filter(|t| !t.is_empty()) {
            self.application_token = token;
        }
    }

    /// Verifica campos obrigatórios que o TOML não consegue garantir.
    pub fn validate(&self) -> Result<(), TmsError> {
        if self.host.trim().is_empty() {
            return Err(TmsError::Config("host must not be empty".into()));
        }
        if self.access_token.is_empty() {
            return Err(TmsError::Config(format!(
                "access token missing (set access_token or {ACCESS_TOKEN_ENV})"
            )));
        }
        if self.application_token.is_empty() {
            return Err(TmsError::Config(format!(
                "application token missing (set application_token or {APP_TOKEN_ENV})"
            )));
        }
        let endpoints = [
            ("import_request", &self.endpoints.import_request),
            ("import_state", &self.endpoints.import_state),
            ("import_download", &self.endpoints.import_download),
            ("export_upload", &self.endpoints.export_upload),
            ("export_state", &self.endpoints.export_state),
        ];
        for (name, path) in endpoints {
            if path.trim().is_empty() {
                return Err(TmsError::Config(format!("endpoint {name} must not be empty")));
            }
        }
        self.poll_policy().map(|_| ())
    }

    pub fn poll_policy(&self) -> Result<PollPolicy, TmsError> {
        PollPolicy::from_secs(self.check_interval_secs, self.max_execution_time_secs)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.access_token, &self.application_token)
    }

    /// Monta o orquestrador com transporte reqwest a partir desta configuração.
    pub fn build(&self) -> Result<TranslationSync, TmsError> {
        self.validate()?;
        let client = TmsClient::new(
            self.host.trim_end_matches('/'),
            self.endpoints.clone(),
            self.credentials(),
        )
        .map_err(|e| TmsError::Config(format!("cannot build HTTP client: {e}")))?
        .verify_download_status(self.verify_download_status);

        Ok(TranslationSync::new(client)
            .with_poll_policy(self.poll_policy()?)
            .strict_deadline(self.strict_deadline))
    }
}
