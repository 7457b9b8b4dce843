//! Tipos de erro da conversão
//!
//! Cada camada tem o seu próprio enum: o renderer, o conversor, a validação
//! feita antes de aceitar um arquivo na fila e a sessão da interface.

use std::path::PathBuf;
use thiserror::Error;

/// Falhas vindas do motor de renderização (PDFium ou o mock dos testes).
#[derive(Debug, Clone, Error)]
pub enum RendererError {
    #[error("Biblioteca PDFium indisponível: {0}")]
    Unavailable(String),

    #[error("Falha ao abrir o arquivo PDF: {0}")]
    Open(String),

    #[error("Falha ao renderizar página {page}: {message}")]
    Page { page: usize, message: String },

    #[error("Falha ao codificar página {page}: {message}")]
    Encode { page: usize, message: String },
}

/// Erros de `Converter::convert`, capturados por arquivo no worker.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Arquivo não encontrado: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error(transparent)]
    Render(#[from] RendererError),

    #[error("Não foi possível gravar {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Motivos para recusar um arquivo antes de entrar na fila.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Não é um arquivo PDF")]
    NotPdf,

    #[error("O arquivo não existe")]
    Missing,

    #[error("O PDF não contém páginas")]
    NoPages,

    #[error("Erro ao ler o PDF: {0}")]
    Unreadable(String),
}

/// Erros que impedem o início de uma conversão.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Nenhum arquivo PDF selecionado")]
    EmptyQueue,

    #[error("Falha ao criar a pasta de saída {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sem permissão de escrita na pasta de saída {}", .0.display())]
    NotWritable(PathBuf),
}
