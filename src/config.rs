//! Configuração da aplicação
//!
//! Não há arquivo de configuração persistido: os valores padrão podem ser
//! ajustados por variáveis de ambiente no momento da inicialização.

use std::path::PathBuf;

/// Diretório extra onde procurar a biblioteca PDFium.
pub const PDFIUM_DIR_ENV: &str = "PDF2PNG_PDFIUM_DIR";

/// Filtro do env_logger (ex.: `debug`, `pdf2png=trace`).
pub const LOG_ENV: &str = "PDF2PNG_LOG";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Diretórios onde procurar a biblioteca PDFium, em ordem.
    /// Se nenhum funcionar, usa a biblioteca do sistema.
    pub library_dirs: Vec<PathBuf>,
    /// Pasta de saída usada quando a pasta do PDF não aceita escrita.
    pub fallback_output_dir: PathBuf,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_dirs: vec![PathBuf::from("./lib/"), PathBuf::from("./")],
            fallback_output_dir: default_fallback_output_dir(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = std::env::var_os(PDFIUM_DIR_ENV) {
            config.library_dirs.insert(0, PathBuf::from(dir));
        }
        if let Ok(filter) = std::env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        config
    }
}

/// `~/Desktop/output`, ou `~/output` quando não existe Desktop.
pub fn default_fallback_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_search_local_lib_dirs_first() {
        let config = AppConfig::default();
        assert_eq!(
            config.library_dirs,
            vec![PathBuf::from("./lib/"), PathBuf::from("./")]
        );
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn fallback_output_dir_is_named_output() {
        let dir = default_fallback_output_dir();
        assert_eq!(dir.file_name().and_then(|n| n.to_str()), Some("output"));
    }
}
