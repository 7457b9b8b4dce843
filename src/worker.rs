//! Worker de conversão em segundo plano
//!
//! Processa a fila de PDFs um por vez, numa thread própria, e envia o
//! progresso para a interface por um canal. A thread da interface nunca
//! abre nem renderiza documentos durante uma conversão.

use crate::converter::{display_name, Converter};
use crate::error::{ConvertError, RendererError};
use crate::renderer::PdfRenderer;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Pedido de conversão, imutável depois que o worker começa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub dpi: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Índice (0-based) do arquivo atual; igual a `total` no evento final.
    pub index: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.index as f32 / self.total as f32
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub succeeded: usize,
    pub pages: usize,
    pub failures: Vec<FileFailure>,
    pub outcome: RunOutcome,
    /// Pasta onde esta execução gravou os PNGs.
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Progress(ProgressEvent),
    /// Sempre o último evento de uma execução.
    Completed(ConversionResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
}

/// Permite cancelar a execução atual a partir de outro lugar.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ConversionWorker {
    state: WorkerState,
    cancel: CancelHandle,
    events: Option<Receiver<WorkerEvent>>,
    thread: Option<JoinHandle<()>>,
}

impl Default for ConversionWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionWorker {
    pub fn new() -> Self {
        Self {
            state: WorkerState::Idle,
            cancel: CancelHandle(Arc::new(AtomicBool::new(false))),
            events: None,
            thread: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == WorkerState::Running
    }

    /// Inicia uma execução em uma nova thread.
    ///
    /// `make_renderer` roda dentro da thread do worker, já que o renderer
    /// não precisa ser `Send`. `notify` é chamado depois de cada evento
    /// enviado, para acordar a interface.
    ///
    /// # Returns
    /// `false` se já existe uma execução em andamento (nada é feito)
    pub fn start<R, F, N>(
        &mut self,
        request: ConversionRequest,
        make_renderer: F,
        notify: N,
    ) -> std::io::Result<bool>
    where
        R: PdfRenderer + 'static,
        F: FnOnce() -> Result<R, RendererError> + Send + 'static,
        N: Fn() + Send + 'static,
    {
        if self.is_running() {
            return Ok(false);
        }

        self.cancel.0.store(false, Ordering::SeqCst);
        let cancel = self.cancel.clone();
        let (sender, receiver) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("pdf2png-worker".to_string())
            .spawn(move || {
                let emit = |event: WorkerEvent| {
                    // O receptor só some se a interface foi fechada
                    let _ = sender.send(event);
                    notify();
                };

                match make_renderer() {
                    Ok(renderer) => {
                        let converter = Converter::new(renderer);
                        run_conversion(
                            &request,
                            &cancel,
                            |path| converter.convert(path, &request.output_dir, request.dpi),
                            emit,
                        );
                    }
                    Err(e) => {
                        warn!("[Worker] {}", e);
                        run_conversion(
                            &request,
                            &cancel,
                            |_| Err(ConvertError::Render(e.clone())),
                            emit,
                        );
                    }
                }
            })?;

        self.events = Some(receiver);
        self.thread = Some(thread);
        self.state = WorkerState::Running;
        Ok(true)
    }

    /// Pede o cancelamento. O arquivo atual termina normalmente e os
    /// seguintes são pulados.
    pub fn stop(&self) {
        if self.is_running() {
            info!("[Worker] Cancelamento solicitado");
            self.cancel.cancel();
        }
    }

    /// Drena os eventos pendentes sem bloquear.
    pub fn poll(&mut self) -> Vec<WorkerEvent> {
        let mut drained = Vec::new();
        let Some(events) = &self.events else {
            return drained;
        };

        let mut finished = false;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    finished = matches!(event, WorkerEvent::Completed(_));
                    drained.push(event);
                    if finished {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // A thread terminou sem enviar `Completed` (panic)
                    warn!("[Worker] Thread encerrada sem resultado");
                    finished = true;
                    break;
                }
            }
        }

        if finished {
            self.finish();
        }
        drained
    }

    fn finish(&mut self) {
        self.events = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("[Worker] Thread terminou com panic");
            }
        }
        self.state = WorkerState::Idle;
    }
}

/// Laço sequencial de uma execução.
///
/// Emite `Progress` antes de cada arquivo, um `Progress` final com
/// `index == total` e por último `Completed`. Falhas de um arquivo ficam
/// registradas e não interrompem os demais.
pub fn run_conversion<C, E>(request: &ConversionRequest, cancel: &CancelHandle, mut convert: C, mut emit: E)
where
    C: FnMut(&Path) -> Result<usize, ConvertError>,
    E: FnMut(WorkerEvent),
{
    let total = request.files.len();
    let mut result = ConversionResult {
        succeeded: 0,
        pages: 0,
        failures: Vec::new(),
        outcome: RunOutcome::Completed,
        output_dir: request.output_dir.clone(),
    };

    info!(
        "[Worker] Convertendo {} arquivo(s) para {:?}",
        total, request.output_dir
    );

    for (index, path) in request.files.iter().enumerate() {
        if cancel.is_cancelled() {
            result.outcome = RunOutcome::Cancelled;
            break;
        }

        let file_name = display_name(path);
        emit(WorkerEvent::Progress(ProgressEvent {
            index,
            total,
            message: format!("Processando: {}", file_name),
        }));

        match convert(path) {
            Ok(pages) => {
                info!("[Worker] ✓ {} ({} páginas)", file_name, pages);
                result.succeeded += 1;
                result.pages += pages;
            }
            Err(e) => {
                warn!("[Worker] ✗ {}: {}", file_name, e);
                result.failures.push(FileFailure {
                    file_name,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        "[Worker] Fim: {} ok, {} erro(s), {:?}",
        result.succeeded,
        result.failures.len(),
        result.outcome
    );

    emit(WorkerEvent::Progress(ProgressEvent {
        index: total,
        total,
        message: "Concluído".to_string(),
    }));
    emit(WorkerEvent::Completed(result));
}
