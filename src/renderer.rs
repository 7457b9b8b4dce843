//! Módulo de renderização de PDFs
//! Usa pdfium-render para abrir documentos e rasterizar páginas

use crate::error::RendererError;
use image::DynamicImage;
use log::{debug, info};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

/// Resolução nativa de um PDF (pontos por polegada).
pub const POINTS_PER_INCH: f32 = 72.0;

/// Metadados básicos de um documento.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
}

/// Motor capaz de abrir documentos PDF.
///
/// O documento devolvido é fechado quando sai de escopo, então qualquer
/// caminho de saída (inclusive `?`) libera o handle.
pub trait PdfRenderer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RendererError>;
}

impl<R: PdfRenderer + ?Sized> PdfRenderer for &R {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RendererError> {
        (**self).open(path)
    }
}

/// Documento aberto pelo renderer.
pub trait RenderDocument {
    fn page_count(&self) -> usize;

    /// Rasteriza a página `index` (0-based) aplicando a escala `dpi / 72`
    /// nos dois eixos.
    fn render_page(&self, index: usize, dpi: u16) -> Result<DynamicImage, RendererError>;

    fn metadata(&self) -> DocumentMetadata;
}

/// Renderer de produção baseado no PDFium
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    /// Carrega a biblioteca PDFium procurando nos diretórios informados,
    /// em ordem, e depois na biblioteca do sistema.
    pub fn bind(library_dirs: &[PathBuf]) -> Result<Self, RendererError> {
        let bindings = library_dirs
            .iter()
            .find_map(|dir| {
                let library = Pdfium::pdfium_platform_library_name_at_path(dir);
                debug!("[PDFium] Tentando {:?}", library);
                Pdfium::bind_to_library(library).ok()
            })
            .map(Ok)
            .unwrap_or_else(Pdfium::bind_to_system_library)
            .map_err(|e| {
                RendererError::Unavailable(format!(
                    "{}. Verifique se a biblioteca existe em lib/ ou no sistema.",
                    e
                ))
            })?;

        info!("[PDFium] Biblioteca carregada");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfRenderer for PdfiumRenderer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RendererError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| RendererError::Open(e.to_string()))?;

        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RenderDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, dpi: u16) -> Result<DynamicImage, RendererError> {
        let page_error = |message: String| RendererError::Page {
            page: index + 1,
            message,
        };

        let page_index = PdfPageIndex::try_from(index).map_err(|e| page_error(e.to_string()))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| page_error(e.to_string()))?;

        let scale = f32::from(dpi) / POINTS_PER_INCH;
        let render_config = PdfRenderConfig::new()
            .set_target_width((page.width().value * scale).round() as i32)
            .set_maximum_height((page.height().value * scale).round() as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| page_error(e.to_string()))?;

        Ok(bitmap.as_image())
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let tag = |kind| {
            metadata
                .get(kind)
                .map(|tag| tag.value().to_string())
                .unwrap_or_default()
        };

        DocumentMetadata {
            title: tag(PdfDocumentMetadataTagType::Title),
            author: tag(PdfDocumentMetadataTagType::Author),
        }
    }
}

/// Renderer falso para testes: lê um formato texto `chave=valor` no lugar
/// de um PDF de verdade, sem depender da biblioteca PDFium.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tamanho de cada página falsa, em pontos.
    pub const PAGE_POINTS: f32 = 12.0;

    const MAGIC: &str = "%MOCK-PDF";

    /// Conteúdo de um PDF falso com `pages` páginas.
    pub fn document(pages: usize) -> String {
        format!("{MAGIC}\npages={pages}\n")
    }

    /// Grava um PDF falso em `dir/name`.
    pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write mock pdf");
        path
    }

    #[derive(Default)]
    pub struct MockRenderer {
        pub opened: AtomicUsize,
        pub closed: std::sync::Arc<AtomicUsize>,
    }

    impl MockRenderer {
        pub fn open_documents(&self) -> usize {
            self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
        }
    }

    impl PdfRenderer for MockRenderer {
        fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderDocument + 'a>, RendererError> {
            let text = fs::read_to_string(path).map_err(|e| RendererError::Open(e.to_string()))?;
            let mut lines = text.lines();
            if lines.next() != Some(MAGIC) {
                return Err(RendererError::Open("cabeçalho inválido".to_string()));
            }

            let mut document = MockDocument {
                pages: 0,
                fail_page: None,
                metadata: DocumentMetadata::default(),
                closed: std::sync::Arc::clone(&self.closed),
            };
            for line in lines {
                match line.split_once('=') {
                    Some(("pages", v)) => document.pages = v.trim().parse().unwrap_or(0),
                    Some(("fail_page", v)) => document.fail_page = v.trim().parse().ok(),
                    Some(("title", v)) => document.metadata.title = v.to_string(),
                    Some(("author", v)) => document.metadata.author = v.to_string(),
                    _ => {}
                }
            }

            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(document))
        }
    }

    struct MockDocument {
        pages: usize,
        /// Página (1-based) cuja renderização falha.
        fail_page: Option<usize>,
        metadata: DocumentMetadata,
        closed: std::sync::Arc<AtomicUsize>,
    }

    impl Drop for MockDocument {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RenderDocument for MockDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render_page(&self, index: usize, dpi: u16) -> Result<DynamicImage, RendererError> {
            if index >= self.pages || self.fail_page == Some(index + 1) {
                return Err(RendererError::Page {
                    page: index + 1,
                    message: "conteúdo corrompido".to_string(),
                });
            }

            let side = (PAGE_POINTS * f32::from(dpi) / POINTS_PER_INCH).round() as u32;
            let shade = (index * 40 % 256) as u8;
            let image = RgbaImage::from_pixel(side, side, Rgba([shade, 255 - shade, 128, 255]));
            Ok(DynamicImage::ImageRgba8(image))
        }

        fn metadata(&self) -> DocumentMetadata {
            self.metadata.clone()
        }
    }
}
