//! Conversão de um PDF em uma sequência de PNGs
//!
//! Cada página vira `<nome>_<NNN>.png` na pasta de saída, com a numeração
//! começando em 001.

use crate::error::{ConvertError, RendererError, ValidationError};
use crate::renderer::PdfRenderer;
use image::{ImageError, ImageFormat};
use log::debug;
use std::fs;
use std::path::Path;

/// Resolução fixa usada em todas as conversões.
pub const DEFAULT_DPI: u16 = 150;

/// Resultado de `Converter::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfValidity {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl From<Result<usize, ValidationError>> for PdfValidity {
    fn from(result: Result<usize, ValidationError>) -> Self {
        match result {
            Ok(_) => Self {
                is_valid: true,
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Informações de um PDF, para exibição.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub page_count: usize,
    pub title: String,
    pub author: String,
    pub file_size: u64,
}

pub struct Converter<R> {
    renderer: R,
}

impl<R: PdfRenderer> Converter<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    /// Renderiza todas as páginas de `source` em `output_dir`
    ///
    /// # Returns
    /// Número de páginas convertidas
    ///
    /// Páginas já gravadas continuam no disco se uma página posterior falhar.
    pub fn convert(&self, source: &Path, output_dir: &Path, dpi: u16) -> Result<usize, ConvertError> {
        if !source.exists() {
            return Err(ConvertError::DocumentNotFound(source.to_path_buf()));
        }

        fs::create_dir_all(output_dir).map_err(|source| ConvertError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let document = self.renderer.open(source)?;
        let stem = file_stem(source);
        let page_count = document.page_count();

        for index in 0..page_count {
            let image = document.render_page(index, dpi)?;
            let output_path = output_dir.join(page_file_name(&stem, index));

            image
                .save_with_format(&output_path, ImageFormat::Png)
                .map_err(|e| match e {
                    ImageError::IoError(source) => ConvertError::Io {
                        path: output_path.clone(),
                        source,
                    },
                    other => ConvertError::Render(RendererError::Encode {
                        page: index + 1,
                        message: other.to_string(),
                    }),
                })?;
            debug!("[PNG] {:?}", output_path);
            // `image` sai de escopo aqui, antes da próxima página
        }

        Ok(page_count)
    }

    /// Verifica se o arquivo pode entrar na fila, devolvendo o número de páginas
    pub fn check(&self, path: &Path) -> Result<usize, ValidationError> {
        self.inspect(path).map(|info| info.page_count)
    }

    /// Validação e metadados com uma única abertura do documento.
    pub fn inspect(&self, path: &Path) -> Result<PdfInfo, ValidationError> {
        if !has_pdf_extension(path) {
            return Err(ValidationError::NotPdf);
        }
        let file_size = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(_) => return Err(ValidationError::Missing),
        };

        let document = self.renderer.open(path).map_err(|e| match e {
            RendererError::Open(message) => ValidationError::Unreadable(message),
            other => ValidationError::Unreadable(other.to_string()),
        })?;

        let page_count = document.page_count();
        if page_count == 0 {
            return Err(ValidationError::NoPages);
        }
        let metadata = document.metadata();

        Ok(PdfInfo {
            page_count,
            title: metadata.title,
            author: metadata.author,
            file_size,
        })
    }

    pub fn validate(&self, path: &Path) -> PdfValidity {
        self.check(path).into()
    }
}

/// `relatorio` + página 0 -> `relatorio_001.png`
pub fn page_file_name(stem: &str, page_index: usize) -> String {
    format!("{}_{:03}.png", stem, page_index + 1)
}

/// Aceita `.pdf` em qualquer combinação de maiúsculas e minúsculas.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Nome do arquivo para mensagens ao usuário.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mock::{self, MockRenderer};

    fn png_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".png"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn page_names_are_one_based_and_padded() {
        assert_eq!(page_file_name("report", 0), "report_001.png");
        assert_eq!(page_file_name("report", 41), "report_042.png");
        assert_eq!(page_file_name("report", 999), "report_1000.png");
    }

    #[test]
    fn converts_every_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = mock::write(dir.path(), "slides.pdf", &mock::document(4));
        let output = dir.path().join("out");
        let converter = Converter::new(MockRenderer::default());

        let pages = converter.convert(&source, &output, DEFAULT_DPI).unwrap();

        assert_eq!(pages, 4);
        assert_eq!(
            png_files(&output),
            vec![
                "slides_001.png",
                "slides_002.png",
                "slides_003.png",
                "slides_004.png"
            ]
        );

        let first = image::open(output.join("slides_001.png")).unwrap();
        assert_eq!(first.width(), 25);
    }

    #[test]
    fn missing_source_is_document_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(MockRenderer::default());

        let result = converter.convert(&dir.path().join("nope.pdf"), dir.path(), DEFAULT_DPI);

        assert!(matches!(result, Err(ConvertError::DocumentNotFound(_))));
    }

    #[test]
    fn failing_page_keeps_earlier_pages_and_closes_document() {
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{}fail_page=3\n", mock::document(5));
        let source = mock::write(dir.path(), "bad.pdf", &contents);
        let output = dir.path().join("out");
        let renderer = MockRenderer::default();
        let converter = Converter::new(&renderer);

        let result = converter.convert(&source, &output, DEFAULT_DPI);

        assert!(matches!(
            result,
            Err(ConvertError::Render(RendererError::Page { page: 3, .. }))
        ));
        assert_eq!(png_files(&output), vec!["bad_001.png", "bad_002.png"]);
        assert_eq!(renderer.open_documents(), 0);
    }

    #[test]
    fn unopenable_document_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = mock::write(dir.path(), "corrupt.pdf", "garbage");
        let converter = Converter::new(MockRenderer::default());

        let result = converter.convert(&source, &dir.path().join("out"), DEFAULT_DPI);

        assert!(matches!(result, Err(ConvertError::Render(RendererError::Open(_)))));
    }

    #[test]
    fn converting_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let source = mock::write(dir.path(), "same.pdf", &mock::document(2));
        let converter = Converter::new(MockRenderer::default());

        converter.convert(&source, &dir.path().join("a"), DEFAULT_DPI).unwrap();
        converter.convert(&source, &dir.path().join("b"), DEFAULT_DPI).unwrap();

        for name in ["same_001.png", "same_002.png"] {
            let a = fs::read(dir.path().join("a").join(name)).unwrap();
            let b = fs::read(dir.path().join("b").join(name)).unwrap();
            assert_eq!(a, b, "{name} differs between runs");
        }
    }

    #[test]
    fn validate_rejects_each_case_with_its_own_message() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(MockRenderer::default());
        let text = mock::write(dir.path(), "notes.txt", &mock::document(1));
        let empty = mock::write(dir.path(), "empty.pdf", &mock::document(0));
        let corrupt = mock::write(dir.path(), "corrupt.pdf", "garbage");

        let results = [
            converter.validate(&text),
            converter.validate(&dir.path().join("missing.pdf")),
            converter.validate(&empty),
            converter.validate(&corrupt),
        ];

        assert!(results.iter().all(|r| !r.is_valid));
        let mut messages: Vec<String> = results.iter().map(|r| r.error.clone().unwrap()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn validate_accepts_multi_page_pdf_with_uppercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = mock::write(dir.path(), "SCAN.PDF", &mock::document(3));
        let converter = Converter::new(MockRenderer::default());

        assert_eq!(
            converter.validate(&source),
            PdfValidity {
                is_valid: true,
                error: None
            }
        );
        assert_eq!(converter.check(&source), Ok(3));
    }

    #[test]
    fn unreadable_message_names_the_failure_once() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = mock::write(dir.path(), "corrupt.pdf", "garbage");
        let converter = Converter::new(MockRenderer::default());

        let message = converter.validate(&corrupt).error.unwrap();

        assert_eq!(message, "Erro ao ler o PDF: cabeçalho inválido");
    }

    #[test]
    fn inspect_opens_the_document_once() {
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{}title=Atas\n", mock::document(2));
        let source = mock::write(dir.path(), "atas.pdf", &contents);
        let renderer = MockRenderer::default();
        let converter = Converter::new(&renderer);

        let info = converter.inspect(&source).unwrap();

        assert_eq!(info.page_count, 2);
        assert_eq!(info.title, "Atas");
        assert_eq!(info.file_size, contents.len() as u64);
        assert_eq!(renderer.opened.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(renderer.open_documents(), 0);
        assert_eq!(converter.inspect(&dir.path().join("nope.pdf")), Err(ValidationError::Missing));
    }

    #[test]
    fn inspect_reads_metadata_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let contents = format!("{}title=Relatório\nauthor=Karan\n", mock::document(2));
        let source = mock::write(dir.path(), "doc.pdf", &contents);
        let converter = Converter::new(MockRenderer::default());

        let info = converter.inspect(&source).unwrap();

        assert_eq!(info.page_count, 2);
        assert_eq!(info.title, "Relatório");
        assert_eq!(info.author, "Karan");
        assert_eq!(info.file_size, contents.len() as u64);
    }

    #[test]
    fn inspect_reports_errors_instead_of_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = mock::write(dir.path(), "corrupt.pdf", "garbage");
        let converter = Converter::new(MockRenderer::default());

        assert!(converter.inspect(&dir.path().join("missing.pdf")).is_err());
        assert!(converter.inspect(&corrupt).is_err());
    }
}
