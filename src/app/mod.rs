use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Context as _;
use eframe::egui::{self, Context, Pos2};
use eframe::glow;

use crate::engine::{Engine, EventBus, GpuDevice, HeadlessDevice, SubscriptionId};
use crate::settings::Settings;
use crate::tree::{TreeGraph, generate_tree, load_records};

mod canvas;
mod glow_device;
mod graph;
mod node_renderer;
mod ui;

use glow_device::GlowDevice;
use node_renderer::NodeRenderer;
use ui::FpsCounter;

type LoadResult = Result<TreeGraph, String>;

enum Transition {
    Loaded(LoadResult),
    Retry,
}

pub struct EvoTreeApp {
    data_path: PathBuf,
    seed: u64,
    settings: Settings,
    gl: Option<Arc<glow::Context>>,
    node_renderer: Option<Arc<NodeRenderer>>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    engine: Engine,
    node_renderer: Option<Arc<NodeRenderer>>,
    bus: EventBus<Engine>,
    subscriptions: Vec<SubscriptionId>,
    data_path: PathBuf,
    search: String,
    lod_threshold: f32,
    show_labels: bool,
    info_node: Option<String>,
    context_menu: Option<ContextMenuState>,
    annotation_draft: String,
    status: Option<String>,
    screenshot_path: String,
    screenshot_pending: Option<PathBuf>,
    show_fps_bar: bool,
    fps: FpsCounter,
}

struct ContextMenuState {
    node: String,
    at: Pos2,
}

/// Reads, groups and lays out the records in `path`. Runs on a worker thread.
fn build_tree(path: &Path, seed: u64) -> anyhow::Result<TreeGraph> {
    let records =
        load_records(path).with_context(|| format!("could not load {}", path.display()))?;
    Ok(generate_tree(&records, seed))
}

impl EvoTreeApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        data_path: PathBuf,
        settings: Settings,
        seed: u64,
    ) -> Self {
        let state = Self::start_load(data_path.clone(), seed);
        let node_renderer = cc.gl.as_deref().and_then(|gl| match NodeRenderer::new(gl) {
            Ok(renderer) => Some(Arc::new(renderer)),
            Err(error) => {
                log::warn!("{error}; nodes will be drawn with the egui painter");
                None
            }
        });
        Self {
            data_path,
            seed,
            settings,
            gl: cc.gl.clone(),
            node_renderer,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(data_path: PathBuf, seed: u64) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = build_tree(&data_path, seed).map_err(|error| {
                log::error!("{error:#}");
                format!("{error:#}")
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_path: PathBuf, seed: u64) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(data_path, seed),
        }
    }

    fn device(&self) -> Box<dyn GpuDevice> {
        match &self.gl {
            Some(gl) => Box::new(GlowDevice::new(gl.clone())),
            None => {
                log::warn!("no OpenGL context available, vertex data stays on the CPU");
                Box::new(HeadlessDevice::new())
            }
        }
    }

    fn ready_state(&self, tree: TreeGraph) -> AppState {
        let mut engine = Engine::new(self.device());
        engine.set_appearance(self.settings.color_map(), self.settings.frame_style());
        engine.update_lod(self.settings.lod_threshold);
        engine.set_selection_radius(self.settings.selection_radius);

        match engine.update_tree(tree.nodes, tree.edges) {
            Ok(()) => AppState::Ready(Box::new(ViewModel::new(
                engine,
                self.node_renderer.clone(),
                self.data_path.clone(),
                &self.settings,
            ))),
            Err(error) => AppState::Error(format!("{error:#}")),
        }
    }
}

impl eframe::App for EvoTreeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(Transition::Loaded(result)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Transition::Loaded(Err(
                            "Background load worker disconnected".to_owned(),
                        )));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Building evolutionary tree...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load species data");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Transition::Retry);
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.data_path.clone(), self.seed));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        // A reload swaps the graph inside the running engine; a
                        // failure keeps the current scene on screen.
                        Ok(Ok(tree)) => model.apply_reload(tree),
                        Ok(Err(error)) => model.status = Some(error),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.status = Some("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        match transition {
            Some(Transition::Loaded(Ok(tree))) => self.state = self.ready_state(tree),
            Some(Transition::Loaded(Err(error))) => self.state = AppState::Error(error),
            Some(Transition::Retry) => {
                self.state = Self::start_load(self.data_path.clone(), self.seed);
            }
            None => {
                if matches!(self.state, AppState::Loading { .. }) {
                    ctx.request_repaint();
                }
            }
        }
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        if let AppState::Ready(model) = &mut self.state {
            model.shutdown();
        }
        if let (Some(gl), Some(renderer)) = (gl, self.node_renderer.take()) {
            renderer.destroy(gl);
        }
    }
}

impl ViewModel {
    fn new(
        engine: Engine,
        node_renderer: Option<Arc<NodeRenderer>>,
        data_path: PathBuf,
        settings: &Settings,
    ) -> Self {
        let mut bus = EventBus::new();
        let subscriptions = Engine::subscribe(&mut bus);
        Self {
            lod_threshold: engine.camera().lod_threshold,
            show_labels: settings.show_labels,
            engine,
            node_renderer,
            bus,
            subscriptions,
            data_path,
            search: String::new(),
            info_node: None,
            context_menu: None,
            annotation_draft: String::new(),
            status: None,
            screenshot_path: "screenshot.png".to_owned(),
            screenshot_pending: None,
            show_fps_bar: true,
            fps: FpsCounter::default(),
        }
    }

    fn apply_reload(&mut self, tree: TreeGraph) {
        match self.engine.update_tree(tree.nodes, tree.edges) {
            Ok(()) => {
                self.status = Some(format!(
                    "Reloaded {} species",
                    self.engine.scene().node_count()
                ));
                if self
                    .info_node
                    .as_deref()
                    .is_some_and(|id| !self.engine.scene().contains(id))
                {
                    self.info_node = None;
                }
                self.context_menu = None;
            }
            Err(error) => self.status = Some(format!("Reload rejected: {error}")),
        }
    }

    /// Drops the bus subscriptions and frees the vertex buffer while the GL
    /// context is still alive.
    fn shutdown(&mut self) {
        Engine::unsubscribe(&mut self.bus, &self.subscriptions);
        self.subscriptions.clear();
        self.engine.release_gpu();
        self.node_renderer = None;
        log::info!("released GPU resources");
    }
}
