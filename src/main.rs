//! PDF2PNG - Conversor de PDF para imagens PNG
//!
//! Aplicação desktop que converte arquivos PDF em sequências de PNG,
//! uma imagem por página, com arrastar e soltar

mod config;
mod converter;
mod error;
mod renderer;
mod session;
mod worker;

use config::AppConfig;
use converter::{display_name, Converter, PdfInfo, PdfValidity, DEFAULT_DPI};
use eframe::egui;
use log::{error, info, warn};
use renderer::PdfiumRenderer;
use session::{OutputOrigin, Session};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use worker::{ConversionResult, ConversionWorker, ProgressEvent, RunOutcome, WorkerEvent, WorkerState};

// Paleta de cores (Dark Theme First)
struct AppColors;

impl AppColors {
    // Fundo Principal (Deep Blue/Black)
    const BG_MAIN: egui::Color32 = egui::Color32::from_rgb(13, 17, 23);

    // Cores primárias (Electric Blue)
    const PRIMARY: egui::Color32 = egui::Color32::from_rgb(56, 189, 248); // Light Blue 400

    // Sucesso (Neon Green)
    const SUCCESS: egui::Color32 = egui::Color32::from_rgb(74, 222, 128); // Green 400
    const SUCCESS_BG: egui::Color32 = egui::Color32::from_rgb(20, 83, 45); // Green 900

    // Erro (Soft Red)
    const ERROR: egui::Color32 = egui::Color32::from_rgb(248, 113, 113);
    const ERROR_BG: egui::Color32 = egui::Color32::from_rgb(69, 10, 10);

    // Neutros
    const TEXT_PRIMARY: egui::Color32 = egui::Color32::from_rgb(241, 245, 249); // Slate 100
    const TEXT_SECONDARY: egui::Color32 = egui::Color32::from_rgb(148, 163, 184); // Slate 400

    const CARD_BG: egui::Color32 = egui::Color32::from_rgb(30, 41, 59); // Slate 800
    const CARD_BORDER: egui::Color32 = egui::Color32::from_rgb(51, 65, 85); // Slate 700

    const PROGRESS_BG: egui::Color32 = egui::Color32::from_rgb(51, 65, 85);
}

fn main() -> eframe::Result<()> {
    let config = AppConfig::from_env();
    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .init();
    info!("[PDF2PNG] Iniciando (saída padrão: {:?})", config.fallback_output_dir);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 680.0])
            .with_min_inner_size([520.0, 560.0])
            .with_title("PDF2PNG")
            .with_resizable(true)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "PDF2PNG",
        options,
        Box::new(|cc| {
            let mut style = (*cc.egui_ctx.style()).clone();

            // Forçar Dark Mode
            style.visuals = egui::Visuals::dark();
            style.visuals.window_fill = AppColors::BG_MAIN;
            style.visuals.panel_fill = AppColors::BG_MAIN;

            // Espaçamento e Layout
            style.spacing.item_spacing = egui::vec2(12.0, 12.0);
            style.spacing.button_padding = egui::vec2(18.0, 10.0);

            // Cores Globais
            style.visuals.widgets.noninteractive.fg_stroke.color = AppColors::TEXT_PRIMARY;
            style.visuals.hyperlink_color = AppColors::PRIMARY;

            // Fontes
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(32.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Button,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );

            cc.egui_ctx.set_style(style);

            Ok(Box::new(Pdf2PngApp::new(config)))
        }),
    )
}

struct Pdf2PngApp {
    config: AppConfig,
    session: Session,
    worker: ConversionWorker,
    /// Conversor da thread da interface, usado só para validar e ler
    /// informações dos arquivos que entram na fila
    inspector: Option<Converter<PdfiumRenderer>>,
    file_info: HashMap<PathBuf, PdfInfo>,
    progress: Option<ProgressEvent>,
    result: Option<ConversionResult>,
    errors: Vec<String>,
}

impl Pdf2PngApp {
    fn new(config: AppConfig) -> Self {
        Self {
            session: Session::new(config.fallback_output_dir.clone()),
            config,
            worker: ConversionWorker::new(),
            inspector: None,
            file_info: HashMap::new(),
            progress: None,
            result: None,
            errors: Vec::new(),
        }
    }
}

impl eframe::App for Pdf2PngApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_worker_events();

        let is_converting = self.worker.state() == WorkerState::Running;

        let (hovering, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.raw
                    .dropped_files
                    .iter()
                    .filter_map(|file| file.path.clone())
                    .collect::<Vec<_>>(),
            )
        });
        if !dropped.is_empty() && !is_converting {
            self.add_files(dropped);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .fill(ui.visuals().window_fill())
                .inner_margin(20.0)
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.set_max_width(520.0);
                        ui.add_space(6.0);

                        // Header
                        ui.label(
                            egui::RichText::new("🖼 PDF2PNG")
                                .size(34.0)
                                .color(AppColors::PRIMARY)
                                .strong(),
                        );
                        ui.label(
                            egui::RichText::new(format!(
                                "Converta PDFs em imagens PNG ({} DPI).",
                                DEFAULT_DPI
                            ))
                            .color(AppColors::TEXT_SECONDARY),
                        );
                        ui.add_space(12.0);

                        self.drop_zone(ui, hovering, is_converting);
                        self.error_panel(ui);
                        self.file_list(ui, is_converting);
                        self.output_row(ui, is_converting);
                        self.progress_panel(ui, is_converting);
                        self.summary(ui, is_converting);
                        self.actions(ui, ctx, is_converting);
                    });
                });
        });
    }
}

impl Pdf2PngApp {
    fn drain_worker_events(&mut self) {
        for event in self.worker.poll() {
            match event {
                WorkerEvent::Progress(progress) => self.progress = Some(progress),
                WorkerEvent::Completed(result) => {
                    info!(
                        "[PDF2PNG] Conversão finalizada: {} ok, {} erro(s)",
                        result.succeeded,
                        result.failures.len()
                    );
                    self.result = Some(result);
                }
            }
        }
    }

    fn add_files(&mut self, paths: Vec<PathBuf>) {
        if self.inspector.is_none() {
            match PdfiumRenderer::bind(&self.config.library_dirs) {
                Ok(renderer) => self.inspector = Some(Converter::new(renderer)),
                Err(e) => {
                    error!("[PDF2PNG] {}", e);
                    self.errors.push(e.to_string());
                    return;
                }
            }
        }
        let Some(inspector) = &self.inspector else {
            return;
        };

        let file_info = &mut self.file_info;
        let rejections = self.session.add_files(&paths, |path| {
            let inspected = inspector.inspect(path);
            let validity = PdfValidity::from(inspected.clone().map(|info| info.page_count));
            if let Ok(info) = inspected {
                file_info.insert(path.to_path_buf(), info);
            }
            validity
        });
        for rejection in rejections {
            self.errors.push(format!(
                "PDF inválido: {}\n{}",
                rejection.file_name, rejection.reason
            ));
        }

        // Nova fila, novo resultado
        self.result = None;
        self.progress = None;
    }

    fn select_files(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .set_title("Selecionar arquivos PDF")
            .add_filter("PDF", &["pdf", "PDF"])
            .pick_files()
        {
            self.add_files(paths);
        }
    }

    fn select_output_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_title("Selecionar pasta de saída")
            .pick_folder()
        {
            self.session.choose_output_dir(dir);
        }
    }

    fn start_conversion(&mut self, ctx: &egui::Context) {
        self.errors.clear();

        let request = match self.session.prepare_run(DEFAULT_DPI) {
            Ok(request) => request,
            Err(e) => {
                error!("[PDF2PNG] {}", e);
                self.errors.push(e.to_string());
                return;
            }
        };

        self.result = None;
        self.progress = Some(ProgressEvent {
            index: 0,
            total: request.files.len(),
            message: "Inicializando...".to_string(),
        });

        // Uma instância do PDFium por vez: a da interface é recriada no
        // próximo arquivo adicionado
        self.inspector = None;

        let library_dirs = self.config.library_dirs.clone();
        let repaint = ctx.clone();
        match self.worker.start(
            request,
            move || PdfiumRenderer::bind(&library_dirs),
            move || repaint.request_repaint(),
        ) {
            Ok(true) => {}
            Ok(false) => warn!("[PDF2PNG] Já existe uma conversão em andamento"),
            Err(e) => {
                error!("[PDF2PNG] Falha ao iniciar a thread: {}", e);
                self.progress = None;
                self.errors.push(format!("Falha ao iniciar a conversão: {}", e));
            }
        }
    }

    // --- DROP ZONE ---
    fn drop_zone(&mut self, ui: &mut egui::Ui, hovering: bool, is_converting: bool) {
        let border_color = if hovering && !is_converting {
            AppColors::PRIMARY
        } else {
            AppColors::CARD_BORDER
        };

        let card_response = egui::Frame::group(ui.style())
            .inner_margin(24.0)
            .rounding(16.0)
            .stroke(egui::Stroke::new(2.0, border_color))
            .fill(AppColors::CARD_BG)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.set_min_height(110.0);

                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new("📂").size(40.0).color(AppColors::TEXT_SECONDARY));
                    ui.label(
                        egui::RichText::new("Solte os arquivos PDF aqui")
                            .size(18.0)
                            .strong()
                            .color(AppColors::TEXT_PRIMARY),
                    );
                    ui.label(
                        egui::RichText::new("ou clique para selecionar")
                            .size(12.0)
                            .color(AppColors::TEXT_SECONDARY),
                    );
                });
            })
            .response;

        if !is_converting {
            if card_response.hovered() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }
            if card_response.interact(egui::Sense::click()).clicked() {
                self.select_files();
            }
        }
    }

    fn error_panel(&mut self, ui: &mut egui::Ui) {
        if self.errors.is_empty() {
            return;
        }

        let mut dismiss = false;
        egui::Frame::none()
            .fill(AppColors::ERROR_BG)
            .inner_margin(12.0)
            .rounding(8.0)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                for message in &self.errors {
                    ui.label(egui::RichText::new(format!("Erro: {}", message)).color(AppColors::ERROR));
                }
                if ui.small_button("Fechar").clicked() {
                    dismiss = true;
                }
            });

        if dismiss {
            self.errors.clear();
        }
    }

    // --- FILA ---
    fn file_list(&mut self, ui: &mut egui::Ui, is_converting: bool) {
        if self.session.files().is_empty() {
            return;
        }

        let mut remove_index = None;
        let mut clear = false;

        egui::Frame::none()
            .fill(AppColors::CARD_BG)
            .inner_margin(12.0)
            .rounding(10.0)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                egui::ScrollArea::vertical()
                    .max_height(160.0)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for (index, path) in self.session.files().iter().enumerate() {
                            ui.horizontal(|ui| {
                                let info = self.file_info.get(path);
                                let pages = info
                                    .map(|info| format!("{} pág.", info.page_count))
                                    .unwrap_or_default();

                                let label = ui.label(
                                    egui::RichText::new(display_name(path)).color(AppColors::TEXT_PRIMARY),
                                );
                                if let Some(info) = info {
                                    label.on_hover_text(describe(path, info));
                                }
                                ui.label(egui::RichText::new(pages).size(12.0).color(AppColors::TEXT_SECONDARY));

                                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                    if ui.add_enabled(!is_converting, egui::Button::new("✕").small()).clicked() {
                                        remove_index = Some(index);
                                    }
                                });
                            });
                        }
                    });

                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("{} arquivo(s)", self.session.files().len()))
                            .color(AppColors::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(!is_converting, egui::Button::new("Limpar lista")).clicked() {
                            clear = true;
                        }
                    });
                });
            });

        if let Some(index) = remove_index {
            if let Some(path) = self.session.remove(index) {
                self.file_info.remove(&path);
            }
        }
        if clear {
            self.session.clear();
            self.file_info.clear();
        }
    }

    fn output_row(&mut self, ui: &mut egui::Ui, is_converting: bool) {
        ui.horizontal(|ui| {
            let origin = match self.session.origin() {
                OutputOrigin::Fallback => "padrão",
                OutputOrigin::Derived => "ao lado do PDF",
                OutputOrigin::Chosen => "escolhida",
            };
            ui.label(
                egui::RichText::new(format!("Saída ({}): {}", origin, self.session.output_dir().display()))
                    .size(12.0)
                    .color(AppColors::TEXT_SECONDARY),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.add_enabled(!is_converting, egui::Button::new("📁 Pasta de saída")).clicked() {
                    self.select_output_folder();
                }
            });
        });
    }

    fn progress_panel(&self, ui: &mut egui::Ui, is_converting: bool) {
        let Some(progress) = &self.progress else {
            return;
        };

        ui.add_space(8.0);
        if is_converting {
            ui.spinner();
        }

        // Custom Progress Bar Dark
        let w = ui.available_width();
        let h = 8.0;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(w, h), egui::Sense::hover());
        let fraction = progress.fraction();

        ui.painter().rect_filled(rect, 4.0, AppColors::PROGRESS_BG);
        if fraction > 0.0 {
            let fill_rect = egui::Rect::from_min_size(rect.min, egui::vec2(w * fraction, h));
            ui.painter().rect_filled(fill_rect, 4.0, AppColors::PRIMARY);
        }

        ui.label(
            egui::RichText::new(format!(
                "{} ({}/{}) - {:.0}%",
                progress.message,
                progress.index,
                progress.total,
                fraction * 100.0
            ))
            .color(AppColors::TEXT_SECONDARY),
        );
    }

    fn summary(&self, ui: &mut egui::Ui, is_converting: bool) {
        let Some(result) = &self.result else {
            return;
        };
        if is_converting {
            return;
        }

        let clean = result.failures.is_empty() && result.outcome == RunOutcome::Completed;
        egui::Frame::group(ui.style())
            .inner_margin(20.0)
            .rounding(16.0)
            .stroke(egui::Stroke::new(
                2.0,
                if clean { AppColors::SUCCESS } else { AppColors::CARD_BORDER },
            ))
            .fill(if clean { AppColors::SUCCESS_BG } else { AppColors::CARD_BG })
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(
                    egui::RichText::new(format!(
                        "🚀 {} arquivo(s) convertido(s), {} página(s)",
                        result.succeeded, result.pages
                    ))
                    .size(18.0)
                    .strong()
                    .color(AppColors::SUCCESS),
                );

                if result.outcome == RunOutcome::Cancelled {
                    ui.label(
                        egui::RichText::new("Conversão cancelada; os arquivos restantes não foram processados.")
                            .color(AppColors::TEXT_SECONDARY),
                    );
                }

                if !result.failures.is_empty() {
                    ui.label(
                        egui::RichText::new(format!("{} erro(s):", result.failures.len()))
                            .strong()
                            .color(AppColors::ERROR),
                    );
                    for failure in &result.failures {
                        ui.label(
                            egui::RichText::new(format!(" - {}: {}", failure.file_name, failure.message))
                                .color(AppColors::ERROR),
                        );
                    }
                }
            });
    }

    // --- ACTIONS ---
    fn actions(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, is_converting: bool) {
        let has_files = !self.session.files().is_empty();

        ui.add_space(12.0);
        ui.columns(3, |cols| {
            cols[0].vertical_centered_justified(|ui| {
                let enabled = has_files && !is_converting;
                let btn = egui::Button::new(
                    egui::RichText::new("Converter")
                        .strong()
                        .color(if enabled { egui::Color32::BLACK } else { AppColors::TEXT_SECONDARY }),
                )
                .min_size(egui::vec2(0.0, 48.0))
                .fill(if enabled { AppColors::PRIMARY } else { AppColors::CARD_BORDER })
                .rounding(10.0);

                if ui.add_enabled(enabled, btn).clicked() {
                    self.start_conversion(ctx);
                }
            });

            cols[1].vertical_centered_justified(|ui| {
                let btn = egui::Button::new(egui::RichText::new("Cancelar").strong().color(AppColors::TEXT_PRIMARY))
                    .min_size(egui::vec2(0.0, 48.0))
                    .fill(egui::Color32::TRANSPARENT)
                    .stroke(egui::Stroke::new(1.0, AppColors::CARD_BORDER))
                    .rounding(10.0);

                if ui.add_enabled(is_converting, btn).clicked() {
                    self.worker.stop();
                }
            });

            cols[2].vertical_centered_justified(|ui| {
                let btn = egui::Button::new(egui::RichText::new("📂 Abrir pasta").strong().color(AppColors::TEXT_PRIMARY))
                    .min_size(egui::vec2(0.0, 48.0))
                    .fill(egui::Color32::TRANSPARENT)
                    .stroke(egui::Stroke::new(1.0, AppColors::CARD_BORDER))
                    .rounding(10.0);

                let finished = self.result.as_ref().filter(|_| !is_converting);
                if ui.add_enabled(finished.is_some(), btn).clicked() {
                    if let Some(result) = finished {
                        open_folder(&result.output_dir);
                    }
                }
            });
        });
    }
}

/// Texto do tooltip de um arquivo da fila.
fn describe(path: &Path, info: &PdfInfo) -> String {
    let mut lines = vec![path.display().to_string()];
    if !info.title.is_empty() {
        lines.push(format!("Título: {}", info.title));
    }
    if !info.author.is_empty() {
        lines.push(format!("Autor: {}", info.author));
    }
    lines.push(format!("Páginas: {}", info.page_count));
    lines.push(format!("Tamanho: {}", format_file_size(info.file_size)));
    lines.join("\n")
}

fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let size = bytes as f64;
    if size >= MB {
        format!("{:.1} MB", size / MB)
    } else if size >= KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn open_folder(path: &Path) {
    #[cfg(target_os = "macos")]
    let program = "open";
    #[cfg(target_os = "windows")]
    let program = "explorer";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let program = "xdg-open";

    if let Err(e) = Command::new(program).arg(path).spawn() {
        warn!("[PDF2PNG] Não foi possível abrir {:?}: {}", path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn tooltip_skips_empty_metadata() {
        let info = PdfInfo {
            page_count: 3,
            title: String::new(),
            author: "Karan".to_string(),
            file_size: 100,
        };

        let text = describe(Path::new("/tmp/a.pdf"), &info);

        assert!(!text.contains("Título"));
        assert!(text.contains("Autor: Karan"));
        assert!(text.contains("Páginas: 3"));
    }
}
