//! Estado da sessão da interface
//!
//! Guarda a fila de PDFs e a pasta de saída. A interface é a única dona da
//! sessão e a altera por `&mut`, uma operação por vez.

use crate::converter::{display_name, has_pdf_extension, PdfValidity};
use crate::error::SessionError;
use crate::worker::ConversionRequest;
use chrono::{DateTime, Local};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// De onde veio a pasta de saída atual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOrigin {
    /// Pasta padrão (`~/Desktop/output`).
    Fallback,
    /// `output_<timestamp>` ao lado do primeiro PDF aceito.
    Derived,
    /// Escolhida pelo usuário; não é mais recalculada.
    Chosen,
}

/// Arquivo recusado na validação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    origin: OutputOrigin,
    fallback_dir: PathBuf,
}

impl Session {
    pub fn new(fallback_dir: PathBuf) -> Self {
        Self {
            files: Vec::new(),
            output_dir: fallback_dir.clone(),
            origin: OutputOrigin::Fallback,
            fallback_dir,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn origin(&self) -> OutputOrigin {
        self.origin
    }

    /// Adiciona arquivos vindos do drag-and-drop ou do seletor.
    ///
    /// Caminhos sem `.pdf` são descartados em silêncio; duplicados são
    /// ignorados; os demais passam por `validate` e só os válidos entram na
    /// fila.
    pub fn add_files<V>(&mut self, paths: &[PathBuf], mut validate: V) -> Vec<Rejection>
    where
        V: FnMut(&Path) -> PdfValidity,
    {
        let mut accepted = Vec::new();
        let mut rejections = Vec::new();

        for path in accept_pdf_paths(paths) {
            if self.files.contains(&path) {
                continue;
            }

            let validity = validate(&path);
            if validity.is_valid {
                accepted.push(path.clone());
                self.files.push(path);
            } else {
                let rejection = Rejection {
                    file_name: display_name(&path),
                    reason: validity.error.unwrap_or_default(),
                };
                warn!("[Fila] PDF inválido {}: {}", rejection.file_name, rejection.reason);
                rejections.push(rejection);
            }
        }

        if !accepted.is_empty() && self.origin != OutputOrigin::Chosen {
            self.derive_output_dir(&accepted, Local::now());
        }

        rejections
    }

    pub fn remove(&mut self, index: usize) -> Option<PathBuf> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn choose_output_dir(&mut self, dir: PathBuf) {
        info!("[Saída] Pasta escolhida: {:?}", dir);
        self.output_dir = dir;
        self.origin = OutputOrigin::Chosen;
    }

    fn derive_output_dir(&mut self, files: &[PathBuf], now: DateTime<Local>) {
        self.output_dir = default_output_dir(files, now, &self.fallback_dir);
        self.origin = if self.output_dir == self.fallback_dir {
            OutputOrigin::Fallback
        } else {
            OutputOrigin::Derived
        };
        info!("[Saída] {:?} ({:?})", self.output_dir, self.origin);
    }

    /// Cria a pasta de saída e monta o pedido de conversão.
    ///
    /// Qualquer erro aqui impede o início da conversão. Uma pasta
    /// `output_<timestamp>` que já existe (de uma execução anterior) ganha
    /// um sufixo numérico em vez de ser sobrescrita.
    pub fn prepare_run(&mut self, dpi: u16) -> Result<ConversionRequest, SessionError> {
        if self.files.is_empty() {
            return Err(SessionError::EmptyQueue);
        }

        if self.origin == OutputOrigin::Derived && self.output_dir.exists() {
            if let (Some(parent), Some(name)) = (self.output_dir.parent(), self.output_dir.file_name()) {
                let name = base_output_name(&name.to_string_lossy());
                self.output_dir = unique_dir(parent, &name);
                info!("[Saída] Pasta já usada, nova pasta: {:?}", self.output_dir);
            }
        }

        fs::create_dir_all(&self.output_dir).map_err(|source| SessionError::CreateOutput {
            path: self.output_dir.clone(),
            source,
        })?;
        if !is_writable(&self.output_dir) {
            return Err(SessionError::NotWritable(self.output_dir.clone()));
        }

        Ok(ConversionRequest {
            files: self.files.clone(),
            output_dir: self.output_dir.clone(),
            dpi,
        })
    }
}

/// Mantém apenas os caminhos terminados em `.pdf`.
pub fn accept_pdf_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| has_pdf_extension(path))
        .cloned()
        .collect()
}

/// Pasta `output_<AAAAMMDDhhmmss>` ao lado do primeiro arquivo, ou
/// `fallback` se essa pasta não aceita escrita.
pub fn default_output_dir(files: &[PathBuf], now: DateTime<Local>, fallback: &Path) -> PathBuf {
    let Some(first) = files.first() else {
        return fallback.to_path_buf();
    };

    let parent = match first.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = fs::canonicalize(&parent).unwrap_or(parent);

    if !is_writable(&parent) {
        warn!(
            "[Saída] Sem permissão de escrita em {:?}, usando {:?}",
            parent, fallback
        );
        return fallback.to_path_buf();
    }

    let name = format!("output_{}", now.format("%Y%m%d%H%M%S"));
    unique_dir(&parent, &name)
}

/// Evita reaproveitar uma pasta com o mesmo timestamp.
fn unique_dir(parent: &Path, name: &str) -> PathBuf {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return candidate;
    }

    (2..)
        .map(|n| parent.join(format!("{}_{}", name, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// `output_<ts>_3` -> `output_<ts>`
fn base_output_name(name: &str) -> String {
    match name.rsplit_once('_') {
        Some((base, suffix))
            if base.starts_with("output_") && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base.to_string()
        }
        _ => name.to_string(),
    }
}

/// Testa a escrita criando (e apagando) um arquivo temporário.
fn is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".pdf2png-")
        .tempfile_in(dir)
        .is_ok()
}
