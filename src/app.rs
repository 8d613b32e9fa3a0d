// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait, managing the project, the frame on screen and its
//! hints, and the colorization backend, and coordinating between the UI
//! components.

use crate::backend::{
    local::LocalBackend,
    remote::{Credentials, RemoteBackend},
    session::InferenceSession,
    Backend, BackendError, BackendEvent, BackendOutput,
};
use crate::config::{BackendSettings, Settings};
use crate::io::{
    cache::FrameCache,
    export::{self, ExportEvent, ExportHandle},
    media::{self, VideoSource},
    serialization,
};
use crate::models::{
    color_point::{ColorPoint, FramePointSet, Rgb},
    frame::Frame,
    project::ProjectState,
};
use crate::tracking;
use crate::ui::{canvas, properties, timeline, toolbar};
use crate::util::geometry::ViewTransform;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

/// History system for undo/redo of the current frame's hints.
struct History {
    /// Undo stack (past states)
    undo_stack: Vec<FramePointSet>,
    /// Redo stack (future states after undo)
    redo_stack: Vec<FramePointSet>,
    /// Maximum history size
    max_size: usize,
}

impl History {
    fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: 50, // Keep last 50 states
        }
    }

    /// Save current state before making a change
    fn push(&mut self, points: FramePointSet) {
        self.undo_stack.push(points);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Undo: restore previous state
    fn undo(&mut self, current: FramePointSet) -> Option<FramePointSet> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Redo: restore next state
    fn redo(&mut self, current: FramePointSet) -> Option<FramePointSet> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history
    fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Current editing tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Hand,
    Eyedropper,
    AddPoint,
    EditPoint,
    RemovePoint,
}

/// Which rendition of the frame the canvas shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneMode {
    Original,
    Grayscale,
    Colorized,
}

/// Request the backend is currently working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Colorize,
    Extrapolate,
}

/// Result of background media loading.
struct LoadedMedia {
    source: Box<dyn VideoSource>,
    project: ProjectState,
    project_path: Option<PathBuf>,
}

/// Textures of the frame on screen.
struct FrameTextures {
    original: egui::TextureHandle,
    gray: egui::TextureHandle,
    colorized: Option<egui::TextureHandle>,
}

impl FrameTextures {
    fn new(ctx: &egui::Context, frame: &Frame) -> Self {
        Self {
            original: load_texture(ctx, "frame_original", frame.rgb()),
            gray: load_texture(ctx, "frame_gray", &frame.gray_rgb()),
            colorized: None,
        }
    }

    fn for_mode(&self, mode: SceneMode) -> &egui::TextureHandle {
        match mode {
            SceneMode::Original => &self.original,
            SceneMode::Grayscale => &self.gray,
            SceneMode::Colorized => self.colorized.as_ref().unwrap_or(&self.gray),
        }
    }
}

fn load_texture(ctx: &egui::Context, name: &str, image: &RgbImage) -> egui::TextureHandle {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = egui::ColorImage::from_rgb(size, image.as_raw());
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

/// Fields of the "connect to server" window.
#[derive(Default)]
struct RemoteForm {
    url: String,
    username: String,
    password: String,
}

/// Main application state.
pub struct ChromaHintApp {
    settings: Settings,

    /// Currently selected editing tool
    current_tool: Tool,
    scene_mode: SceneMode,
    /// Color given to new hints
    current_color: Rgb,

    /// Current project (if a video is loaded)
    project: Option<ProjectState>,
    /// Where the project was last saved or loaded from
    project_path: Option<PathBuf>,
    frames: Option<FrameCache>,

    /// Frame on screen and its hints
    frame: Option<Arc<Frame>>,
    points: FramePointSet,
    textures: Option<FrameTextures>,

    selected_point: Option<usize>,
    dragging_point: Option<usize>,

    /// History for undo/redo
    history: History,

    /// Network for the local backend, kept across backend switches
    session: InferenceSession,
    backend: Box<dyn Backend>,
    request: Option<Request>,

    view: ViewTransform,

    /// Receiver for background media loading
    media_loader: Option<Receiver<Result<LoadedMedia, String>>>,
    /// Loading state message
    loading_message: Option<String>,

    export: Option<ExportHandle>,
    export_progress: (usize, usize),

    remote_form: Option<RemoteForm>,

    /// Frame pixel under the cursor
    hover: Option<(u32, u32)>,
    status: String,
}

impl ChromaHintApp {
    /// Create a new application instance.
    pub fn new(settings: Settings) -> Self {
        let session = InferenceSession::new();
        let local: Box<dyn Backend> = Box::new(LocalBackend::new(
            session.clone(),
            tracking::default_tracker(settings.tracker),
        ));

        let mut app = Self {
            current_color: settings.default_color,
            settings,
            current_tool: Tool::Hand,
            scene_mode: SceneMode::Original,
            project: None,
            project_path: None,
            frames: None,
            frame: None,
            points: FramePointSet::new(),
            textures: None,
            selected_point: None,
            dragging_point: None,
            history: History::new(),
            session,
            backend: local,
            request: None,
            view: ViewTransform::default(),
            media_loader: None,
            loading_message: None,
            export: None,
            export_progress: (0, 0),
            remote_form: None,
            hover: None,
            status: "Ready".to_string(),
        };

        if let BackendSettings::Remote { url, .. } = &app.settings.backend {
            let url = url.clone();
            let credentials = app.settings.backend.credentials();
            app.connect_remote(&url, credentials);
        }
        app
    }

    fn is_busy(&self) -> bool {
        self.request.is_some() || self.backend.is_busy() || self.export.is_some()
    }

    /// Hints on screen are about to be replaced by a propagation result and
    /// cannot be edited until it arrives.
    fn hints_locked(&mut self) -> bool {
        let locked = self.request == Some(Request::Extrapolate);
        if locked {
            self.status = "Hints are read-only until propagation finishes".to_string();
        }
        locked
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| f.size())
    }

    fn use_local_backend(&mut self) {
        self.backend = Box::new(LocalBackend::new(
            self.session.clone(),
            tracking::default_tracker(self.settings.tracker),
        ));
        self.request = None;
        log::info!("Using {}", self.backend.describe());
    }

    /// Switch to a remote server if it accepts our credentials.
    fn connect_remote(&mut self, url: &str, credentials: Option<Credentials>) {
        let mut backend = match RemoteBackend::connect(url, credentials) {
            Ok(backend) => backend,
            Err(e) => {
                log::error!("Cannot connect to {}: {}", url, e);
                self.status = format!("Cannot connect: {}", e);
                return;
            }
        };
        match backend.authenticate() {
            Ok(()) => {
                self.backend = Box::new(backend);
                self.request = None;
                self.status = format!("Connected to {}", url);
                log::info!("Using {}", self.backend.describe());
            }
            Err(e) => {
                log::error!("Authentication with {} failed: {}", url, e);
                self.status = format!("Authentication failed: {}", e);
            }
        }
    }

    /// Open a video, image sequence or image as a new project (asynchronously).
    fn new_project(&mut self, path: PathBuf) {
        self.start_loading("Opening video...", move || {
            let source = media::open_source(&path).map_err(|e| e.to_string())?;
            let project = ProjectState::new(source.identifier());
            Ok(LoadedMedia {
                source,
                project,
                project_path: None,
            })
        });
    }

    /// Load a project file and the video it refers to (asynchronously).
    fn open_project(&mut self, path: PathBuf) {
        self.start_loading("Loading project and video...", move || {
            let project = serialization::load_project(&path).map_err(|e| format!("{:#}", e))?;
            let source = media::open_source(Path::new(&project.video_file))
                .map_err(|e| format!("Referenced video cannot be opened: {}", e))?;
            Ok(LoadedMedia {
                source,
                project,
                project_path: Some(path),
            })
        });
    }

    fn start_loading<F>(&mut self, message: &str, load: F)
    where
        F: FnOnce() -> Result<LoadedMedia, String> + Send + 'static,
    {
        let (sender, receiver) = channel();
        self.media_loader = Some(receiver);
        self.loading_message = Some(message.to_string());

        // Spawn background thread for loading
        std::thread::spawn(move || {
            let _ = sender.send(load());
        });
    }

    /// Install freshly loaded media. Nothing changes if its first frame
    /// cannot be decoded.
    fn finish_loading(&mut self, ctx: &egui::Context, loaded: LoadedMedia) {
        let LoadedMedia {
            source,
            mut project,
            project_path,
        } = loaded;

        let mut frames = FrameCache::new(source, self.settings.frame_cache_size);
        let (width, height) = frames.frame_size();
        let last = frames.frame_count().saturating_sub(1);
        project.current_frame = project.current_frame.min(last);

        let dropped = project.retain_within(width, height);
        if dropped > 0 {
            log::warn!("Dropped {} stored points outside the {}x{} frame", dropped, width, height);
        }

        let frame = match frames.get_frame(project.current_frame) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to decode frame {}: {}", project.current_frame + 1, e);
                self.status = format!("Failed to open video: {}", e);
                return;
            }
        };

        log::info!(
            "Opened {} ({} frames, {}x{})",
            project.video_file,
            frames.frame_count(),
            width,
            height
        );

        self.points = project.get_points(project.current_frame);
        self.project = Some(project);
        self.project_path = project_path;
        self.frames = Some(frames);
        self.show_frame(ctx, frame);
        self.view.reset();
        self.status = "Project loaded".to_string();
    }

    fn close_project(&mut self) {
        self.project = None;
        self.project_path = None;
        self.frames = None;
        self.frame = None;
        self.textures = None;
        self.points.clear();
        self.selected_point = None;
        self.dragging_point = None;
        self.history.clear();
        self.status = "Ready".to_string();
    }

    /// Make `frame` the frame on screen. Hints must already be loaded.
    fn show_frame(&mut self, ctx: &egui::Context, frame: Arc<Frame>) {
        self.textures = Some(FrameTextures::new(ctx, &frame));
        self.frame = Some(frame);
        self.selected_point = None;
        self.dragging_point = None;
        self.history.clear();
    }

    /// Write the on-screen hints back to the project.
    fn commit_points(&mut self) {
        if let Some(ref mut project) = self.project {
            project.set_points(project.current_frame, self.points.clone());
        }
    }

    /// Leave the current frame for `index`, optionally carrying the hints.
    fn go_to_frame(&mut self, ctx: &egui::Context, index: usize, propagate: bool) {
        if self.is_busy() {
            log::warn!("Ignoring frame switch while a request is running");
            return;
        }
        let Some(from_index) = self.project.as_ref().map(|p| p.current_frame) else {
            return;
        };
        if index == from_index {
            return;
        }

        // Flush edits before anything else
        self.commit_points();
        let carried = self.points.clone();
        let previous = self.frame.clone();

        let Some(frames) = self.frames.as_mut() else {
            return;
        };
        let next = match frames.get_frame(index) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to load frame {}: {}", index + 1, e);
                self.status = format!("Failed to load frame {}: {}", index + 1, e);
                return;
            }
        };

        if let Some(ref mut project) = self.project {
            project.current_frame = index;
            self.points = project.get_points(index);
        }
        self.show_frame(ctx, Arc::clone(&next));
        log::info!("Switched to frame {}", index + 1);

        match (propagate, previous) {
            (true, Some(previous)) => {
                let result = self.backend.extrapolate(previous, carried, next);
                self.track_request(Request::Extrapolate, result, true);
            }
            _ if self.settings.auto_colorize => self.colorize_current(false),
            _ => {}
        }
    }

    /// Ask the backend to colorize the frame on screen. A missing model is
    /// only reported when the user asked explicitly.
    fn colorize_current(&mut self, explicit: bool) {
        if self.is_busy() {
            log::warn!("Colorization already running");
            return;
        }
        let Some(frame) = self.frame.clone() else {
            return;
        };
        let result = self.backend.colorize(frame, self.points.clone());
        self.track_request(Request::Colorize, result, explicit);
    }

    fn track_request(&mut self, request: Request, result: Result<(), BackendError>, explicit: bool) {
        match result {
            Ok(()) => {
                self.request = Some(request);
                self.status = match request {
                    Request::Colorize => "Colorizing...".to_string(),
                    Request::Extrapolate => "Propagating hints...".to_string(),
                };
            }
            Err(BackendError::NoModel) if !explicit => {}
            Err(e) => {
                log::error!("Request rejected: {}", e);
                self.status = e.to_string();
            }
        }
    }

    fn handle_backend_event(&mut self, ctx: &egui::Context, event: BackendEvent) {
        let request = self.request.take();
        match event {
            BackendEvent::Finished(output) => self.apply_output(ctx, request, output),
            BackendEvent::Failed(e) => {
                log::error!("Backend request failed: {}", e);
                self.status = e.to_string();
            }
            BackendEvent::Disconnected(reason) => {
                log::warn!("Lost connection to {}: {}", self.backend.describe(), reason);
                self.status = format!("Disconnected: {}", reason);
                self.use_local_backend();
            }
        }
    }

    fn apply_output(&mut self, ctx: &egui::Context, request: Option<Request>, output: BackendOutput) {
        let Some(ref mut project) = self.project else {
            return;
        };

        if output.frame_index != project.current_frame {
            // Frame changed under the request; keep propagated hints only.
            if request == Some(Request::Extrapolate) {
                project.set_points(output.frame_index, output.points);
            }
            return;
        }

        if request == Some(Request::Extrapolate) {
            self.history.push(self.points.clone());
            self.points = output.points;
            self.selected_point = None;
            self.commit_points();
        }

        match output.image {
            Some(image) => {
                if let Some(ref mut textures) = self.textures {
                    textures.colorized = Some(load_texture(ctx, "frame_colorized", &image));
                }
                self.status = "Colorized".to_string();
            }
            None => {
                self.status = format!("{} hints carried over", self.points.len());
                if request == Some(Request::Extrapolate) && self.settings.auto_colorize {
                    self.colorize_current(false);
                }
            }
        }
    }

    // Point editing

    fn add_point(&mut self, x: u32, y: u32) {
        if self.hints_locked() {
            return;
        }
        let Some((w, h)) = self.frame_size() else {
            return;
        };
        let before = self.points.clone();
        if self.points.add(ColorPoint::new(x, y, self.current_color), w, h) {
            self.history.push(before);
            self.selected_point = Some(self.points.len() - 1);
            self.commit_points();
            log::info!("Added hint at ({}, {}), total: {}", x, y, self.points.len());
        }
    }

    fn remove_point(&mut self, idx: usize) {
        if self.hints_locked() {
            return;
        }
        if idx >= self.points.len() {
            return;
        }
        self.history.push(self.points.clone());
        self.points.remove(idx);
        self.selected_point = None;
        self.commit_points();
        log::info!("Removed hint, total: {}", self.points.len());
    }

    fn recolor_point(&mut self, idx: usize, color: Rgb) {
        if self.hints_locked() {
            return;
        }
        if self.points.get(idx).map_or(true, |p| p.color == color) {
            return;
        }
        self.history.push(self.points.clone());
        self.points.set_color(idx, color);
        self.commit_points();
    }

    fn clear_points(&mut self) {
        if self.hints_locked() {
            return;
        }
        if self.points.is_empty() {
            return;
        }
        self.history.push(self.points.clone());
        self.points.clear();
        self.selected_point = None;
        self.commit_points();
    }

    fn undo(&mut self) {
        if self.hints_locked() {
            return;
        }
        if let Some(previous) = self.history.undo(self.points.clone()) {
            self.points = previous;
            self.selected_point = None;
            self.commit_points();
            log::info!("Undo");
        }
    }

    fn redo(&mut self) {
        if self.hints_locked() {
            return;
        }
        if let Some(next) = self.history.redo(self.points.clone()) {
            self.points = next;
            self.selected_point = None;
            self.commit_points();
            log::info!("Redo");
        }
    }

    // Files

    fn save_project(&mut self, path: Option<PathBuf>) {
        self.commit_points();
        let Some(ref project) = self.project else {
            return;
        };
        let Some(path) = path.or_else(|| self.project_path.clone()) else {
            return;
        };
        match serialization::save_project(project, &path) {
            Ok(()) => {
                self.status = format!("Saved {}", path.display());
                self.project_path = Some(path);
            }
            Err(e) => {
                log::error!("Failed to save project: {:#}", e);
                self.status = format!("Save failed: {}", e);
            }
        }
    }

    fn import_points(&mut self, path: PathBuf) {
        if self.hints_locked() {
            return;
        }
        let Some((w, h)) = self.frame_size() else {
            return;
        };
        match serialization::import_points(&path, w, h) {
            Ok(points) => {
                self.history.push(self.points.clone());
                self.points = points;
                self.selected_point = None;
                self.commit_points();
                self.status = format!("Imported {} hints", self.points.len());
            }
            Err(e) => {
                log::error!("Failed to import points: {:#}", e);
                self.status = format!("Import failed: {}", e);
            }
        }
    }

    fn export_points(&mut self, path: PathBuf) {
        if let Err(e) = serialization::export_points(&self.points, &path) {
            log::error!("Failed to export points: {:#}", e);
            self.status = format!("Export failed: {}", e);
        }
    }

    /// Colorize every frame into `dir` on a background thread.
    fn export_sequence(&mut self, dir: PathBuf) {
        if self.is_busy() {
            return;
        }
        self.commit_points();
        let Some(ref project) = self.project else {
            return;
        };
        // The export gets its own decoder so the editor keeps seeking freely.
        let source = match media::open_source(Path::new(&project.video_file)) {
            Ok(source) => source,
            Err(e) => {
                log::error!("Cannot reopen video for export: {}", e);
                self.status = format!("Export failed: {}", e);
                return;
            }
        };
        let total = source.frame_count();
        log::info!("Exporting {} frames to {}", total, dir.display());
        self.export = Some(export::spawn_export(
            source,
            self.backend.colorizer(),
            project.clone(),
            dir,
            0..total,
        ));
        self.export_progress = (0, total);
    }

    fn poll_export(&mut self) {
        let Some(ref handle) = self.export else {
            return;
        };
        let events: Vec<ExportEvent> = handle.events.try_iter().collect();
        for event in events {
            match event {
                ExportEvent::Progress { done, total } => self.export_progress = (done, total),
                ExportEvent::Finished { written } => {
                    self.status = format!("Exported {} frames", written);
                    self.export = None;
                }
                ExportEvent::Cancelled { written } => {
                    self.status = format!("Export cancelled after {} frames", written);
                    self.export = None;
                }
                ExportEvent::Failed(message) => {
                    self.status = format!("Export failed: {}", message);
                    self.export = None;
                }
            }
        }
    }

    // Panels

    fn menu_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("New Project...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Videos and images", &video_and_image_extensions())
                        .pick_file()
                    {
                        self.new_project(path);
                    }
                    ui.close_menu();
                }
                if ui.button("New Project from Image Folder...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.new_project(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Open Project...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Projects", &["yaml", "yml", "json"])
                        .pick_file()
                    {
                        self.open_project(path);
                    }
                    ui.close_menu();
                }

                let has_project = self.project.is_some();
                ui.separator();
                if ui.add_enabled(has_project, egui::Button::new("Save Project (Ctrl+S)")).clicked() {
                    self.save_or_ask();
                    ui.close_menu();
                }
                if ui.add_enabled(has_project, egui::Button::new("Save Project As...")).clicked() {
                    if let Some(path) = save_dialog("Projects", "project.yaml") {
                        self.save_project(Some(path));
                    }
                    ui.close_menu();
                }

                ui.separator();
                if ui.add_enabled(has_project, egui::Button::new("Import Points...")).clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Points", &["json", "yaml", "yml"])
                        .pick_file()
                    {
                        self.import_points(path);
                    }
                    ui.close_menu();
                }
                if ui.add_enabled(has_project, egui::Button::new("Export Points...")).clicked() {
                    if let Some(path) = save_dialog("Points", "points.json") {
                        self.export_points(path);
                    }
                    ui.close_menu();
                }
                if ui
                    .add_enabled(has_project && !self.is_busy(), egui::Button::new("Export Colorized Frames..."))
                    .clicked()
                {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.export_sequence(dir);
                    }
                    ui.close_menu();
                }

                ui.separator();
                if ui.add_enabled(has_project, egui::Button::new("Close Project")).clicked() {
                    self.close_project();
                    ui.close_menu();
                }
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui.add_enabled(self.history.can_undo(), egui::Button::new("Undo (Ctrl+Z)")).clicked() {
                    self.undo();
                    ui.close_menu();
                }
                if ui.add_enabled(self.history.can_redo(), egui::Button::new("Redo (Ctrl+Shift+Z)")).clicked() {
                    self.redo();
                    ui.close_menu();
                }
                ui.separator();
                let selected = self.selected_point;
                if ui.add_enabled(selected.is_some(), egui::Button::new("Delete Selected")).clicked() {
                    if let Some(idx) = selected {
                        self.remove_point(idx);
                    }
                    ui.close_menu();
                }
                if ui.add_enabled(!self.points.is_empty(), egui::Button::new("Clear Frame")).clicked() {
                    self.clear_points();
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset Zoom").clicked() {
                    self.view.reset();
                    ui.close_menu();
                }
                ui.separator();
                ui.checkbox(&mut self.settings.auto_colorize, "Colorize on frame change");
            });

            ui.menu_button("Backend", |ui| {
                ui.label(egui::RichText::new(self.backend.describe()).weak());
                ui.separator();
                let idle = !self.is_busy();
                if ui.add_enabled(idle, egui::Button::new("Use Local Model")).clicked() {
                    self.use_local_backend();
                    ui.close_menu();
                }
                if ui.add_enabled(idle, egui::Button::new("Connect to Server...")).clicked() {
                    let mut form = RemoteForm::default();
                    if let BackendSettings::Remote { url, username, .. } = &self.settings.backend {
                        form.url = url.clone();
                        form.username = username.clone().unwrap_or_default();
                    }
                    self.remote_form = Some(form);
                    ui.close_menu();
                }
            });
        });
    }

    fn save_or_ask(&mut self) {
        if self.project_path.is_some() {
            self.save_project(None);
        } else if let Some(path) = save_dialog("Projects", "project.yaml") {
            self.save_project(Some(path));
        }
    }

    fn remote_window(&mut self, ctx: &egui::Context) {
        let Some(mut form) = self.remote_form.take() else {
            return;
        };
        let mut open = true;
        let mut connect = false;

        egui::Window::new("Connect to Server")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("remote_form").num_columns(2).show(ui, |ui| {
                    ui.label("Server URL");
                    ui.text_edit_singleline(&mut form.url);
                    ui.end_row();
                    ui.label("Username");
                    ui.text_edit_singleline(&mut form.username);
                    ui.end_row();
                    ui.label("Password");
                    ui.add(egui::TextEdit::singleline(&mut form.password).password(true));
                    ui.end_row();
                });
                ui.separator();
                connect = ui.add_enabled(!form.url.is_empty(), egui::Button::new("Connect")).clicked();
            });

        if connect {
            let credentials = (!form.username.is_empty()).then(|| Credentials {
                username: form.username.clone(),
                password: form.password.clone(),
            });
            self.connect_remote(&form.url, credentials);
        } else if open {
            self.remote_form = Some(form);
        }
    }

    fn export_window(&mut self, ctx: &egui::Context) {
        let Some(ref handle) = self.export else {
            return;
        };
        let (done, total) = self.export_progress;
        egui::Window::new("Exporting")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let fraction = if total == 0 { 0.0 } else { done as f32 / total as f32 };
                ui.add(egui::ProgressBar::new(fraction).text(format!("{} / {}", done, total)));
                if ui.button("Cancel").clicked() {
                    handle.cancel();
                }
            });
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.selected_point = None;
            self.dragging_point = None;
        }

        // Only process if no text field is focused
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            if let Some(idx) = self.selected_point {
                self.remove_point(idx);
            }
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.undo();
        }
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.redo();
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::S)) && self.project.is_some() {
            self.save_or_ask();
        }

        let Some(current) = self.project.as_ref().map(|p| p.current_frame) else {
            return;
        };
        let count = self.frames.as_ref().map_or(0, FrameCache::frame_count);
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) && current > 0 {
            self.go_to_frame(ctx, current - 1, false);
        } else if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) && current + 1 < count {
            let propagate = ctx.input(|i| i.modifiers.shift);
            self.go_to_frame(ctx, current + 1, propagate);
        }
    }

    fn handle_canvas_action(&mut self, action: canvas::CanvasAction) {
        match action {
            canvas::CanvasAction::PickColor(x, y) => {
                if let Some(ref frame) = self.frame {
                    self.current_color = frame.rgb().get_pixel(x, y).0;
                }
            }
            canvas::CanvasAction::AddPoint(x, y) => self.add_point(x, y),
            canvas::CanvasAction::SelectPoint(idx) => {
                self.selected_point = Some(idx);
            }
            canvas::CanvasAction::Deselect => {
                self.selected_point = None;
            }
            canvas::CanvasAction::StartDragging(idx) => {
                if self.hints_locked() {
                    return;
                }
                self.history.push(self.points.clone());
                self.dragging_point = Some(idx);
                self.selected_point = Some(idx);
            }
            canvas::CanvasAction::DragPoint(x, y) => {
                if let (Some(idx), Some((w, h))) = (self.dragging_point, self.frame_size()) {
                    self.points.move_to(idx, x, y, w, h);
                }
            }
            canvas::CanvasAction::StopDragging => {
                self.dragging_point = None;
                self.commit_points();
            }
            canvas::CanvasAction::RemovePoint(idx) => self.remove_point(idx),
            canvas::CanvasAction::None => {}
        }
    }
}

fn video_and_image_extensions() -> Vec<&'static str> {
    media::IMAGE_EXTENSIONS
        .iter()
        .chain(media::VIDEO_EXTENSIONS.iter())
        .copied()
        .collect()
}

fn save_dialog(filter: &str, default_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(filter, &["yaml", "yml", "json"])
        .set_file_name(default_name)
        .save_file()
}

impl eframe::App for ChromaHintApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed media loading
        if let Some(ref receiver) = self.media_loader {
            if let Ok(result) = receiver.try_recv() {
                self.media_loader = None;
                self.loading_message = None;

                match result {
                    Ok(loaded) => self.finish_loading(ctx, loaded),
                    Err(e) => {
                        log::error!("Failed to load: {}", e);
                        self.status = e;
                    }
                }
            }
        }

        while let Some(event) = self.backend.poll() {
            self.handle_backend_event(ctx, event);
        }
        self.poll_export();

        // Keep polling while background work is running
        if self.loading_message.is_some() || self.is_busy() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui, ctx);
        });

        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(ui, &mut self.current_tool, &mut self.scene_mode, &mut self.current_color)
            })
            .inner;
        if let toolbar::ToolbarAction::ColorChanged(color) = toolbar_action {
            if let Some(idx) = self.selected_point {
                self.recolor_point(idx, color);
            }
        }

        // Status line
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match self.hover {
                    Some((x, y)) => ui.label(format!("x: {}  y: {}", x, y)),
                    None => ui.label("x: -  y: -"),
                };
                ui.separator();
                if let (Some(project), Some(frames)) = (&self.project, &self.frames) {
                    ui.label(format!("Frame {} / {}", project.current_frame + 1, frames.frame_count()));
                    ui.separator();
                }
                ui.label(self.backend.describe());
                ui.separator();
                ui.label(&self.status);
            });
        });

        // Timeline
        if let (Some(project), Some(frames)) = (&self.project, &self.frames) {
            let (current, count) = (project.current_frame, frames.frame_count());
            let busy = self.is_busy();
            let timeline_action = egui::TopBottomPanel::bottom("timeline")
                .show(ctx, |ui| timeline::show(ui, current, count, busy, self.frame.is_some()))
                .inner;
            match timeline_action {
                timeline::TimelineAction::Seek(index) => self.go_to_frame(ctx, index, false),
                timeline::TimelineAction::Previous => self.go_to_frame(ctx, current.saturating_sub(1), false),
                timeline::TimelineAction::Next => self.go_to_frame(ctx, current + 1, false),
                timeline::TimelineAction::NextWithPropagation => self.go_to_frame(ctx, current + 1, true),
                timeline::TimelineAction::Colorize => self.colorize_current(true),
                timeline::TimelineAction::None => {}
            }
        }

        // Properties panel (right side)
        let properties_action = egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| {
                properties::show(ui, self.project.as_ref(), &self.points, self.selected_point)
            })
            .inner;
        match properties_action {
            properties::PropertiesAction::SelectPoint(idx) => self.selected_point = Some(idx),
            properties::PropertiesAction::DeletePoint(idx) => self.remove_point(idx),
            properties::PropertiesAction::RecolorPoint(idx, color) => self.recolor_point(idx, color),
            properties::PropertiesAction::ClearPoints => self.clear_points(),
            properties::PropertiesAction::None => {}
        }

        self.handle_keyboard(ctx);
        self.remote_window(ctx);
        self.export_window(ctx);

        // Main canvas (center)
        let frame_size = self.frame_size().unwrap_or((1, 1));
        let canvas_output = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    return None;
                }

                let view = canvas::CanvasView {
                    texture: self.textures.as_ref().map(|t| t.for_mode(self.scene_mode)),
                    frame_size,
                    points: &self.points,
                    selected: self.selected_point,
                    dragging: self.dragging_point,
                    tool: self.current_tool,
                    point_radius: self.settings.point_radius,
                };
                Some(canvas::show(ui, view, &mut self.view))
            })
            .inner;

        if let Some(output) = canvas_output {
            self.hover = output.hover;
            self.handle_canvas_action(output.action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::session::tests::ConstantNetwork;
    use crate::io::media::MediaError;
    use crate::tracking::{PointTracker, TrackedPoint};
    use image::GrayImage;
    use std::time::{Duration, Instant};

    const SIZE: (u32, u32) = (40, 30);

    /// Flat frames of increasing brightness.
    struct TestSource {
        frames: usize,
    }

    impl VideoSource for TestSource {
        fn frame_count(&self) -> usize {
            self.frames
        }

        fn frame_size(&self) -> (u32, u32) {
            SIZE
        }

        fn read_frame(&mut self, index: usize) -> Result<RgbImage, MediaError> {
            let v = (index * 40) as u8;
            Ok(RgbImage::from_pixel(SIZE.0, SIZE.1, image::Rgb([v, v, v])))
        }

        fn identifier(&self) -> String {
            "clip".to_string()
        }
    }

    /// Leaves every point where it was.
    struct StillTracker;

    impl PointTracker for StillTracker {
        fn track(&self, _: &GrayImage, _: &GrayImage, points: &[(f32, f32)]) -> Vec<TrackedPoint> {
            points
                .iter()
                .map(|&(x, y)| TrackedPoint {
                    x,
                    y,
                    found: true,
                    error: 0.0,
                })
                .collect()
        }
    }

    fn loaded_app(network: Option<ConstantNetwork>, auto_colorize: bool) -> (ChromaHintApp, egui::Context) {
        let mut app = ChromaHintApp::new(Settings {
            auto_colorize,
            ..Settings::default()
        });
        if let Some(network) = network {
            app.session.load(Box::new(network));
        }
        app.backend = Box::new(LocalBackend::new(app.session.clone(), Box::new(StillTracker)));

        let ctx = egui::Context::default();
        app.finish_loading(
            &ctx,
            LoadedMedia {
                source: Box::new(TestSource { frames: 3 }),
                project: ProjectState::new("clip".to_string()),
                project_path: None,
            },
        );
        (app, ctx)
    }

    /// Feed backend events to the app until no request is outstanding.
    fn settle(app: &mut ChromaHintApp, ctx: &egui::Context) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.request.is_some() {
            assert!(Instant::now() < deadline, "request did not finish");
            while let Some(event) = app.backend.poll() {
                app.handle_backend_event(ctx, event);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn coords(points: &FramePointSet) -> Vec<(u32, u32)> {
        points.iter().map(|p| (p.x, p.y)).collect()
    }

    fn stored(app: &ChromaHintApp, frame: usize) -> FramePointSet {
        app.project.as_ref().unwrap().get_points(frame)
    }

    fn set(n: u32) -> FramePointSet {
        (0..n).map(|i| ColorPoint::new(i, i, [i as u8; 3])).collect()
    }

    #[test]
    fn test_history_undo_redo() {
        let mut history = History::new();
        assert!(!history.can_undo());

        history.push(set(0));
        history.push(set(1));
        let restored = history.undo(set(2)).unwrap();
        assert_eq!(restored, set(1));
        assert!(history.can_redo());
        assert_eq!(history.redo(set(1)).unwrap(), set(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_history_push_clears_redo_and_is_bounded() {
        let mut history = History::new();
        for i in 0..60 {
            history.push(set(i % 3));
        }
        assert_eq!(history.undo_stack.len(), 50);

        history.undo(set(0));
        assert!(history.can_redo());
        history.push(set(1));
        assert!(!history.can_redo());

        history.clear();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_file_filter_lists_images_and_videos() {
        let extensions = video_and_image_extensions();
        assert!(extensions.contains(&"png"));
        assert!(extensions.contains(&"mp4"));
    }

    #[test]
    fn test_frame_switch_stores_edits_first() {
        let (mut app, ctx) = loaded_app(None, false);
        app.add_point(5, 5);
        // Moved on screen but not yet committed
        app.points.move_to(0, 8, 9, SIZE.0, SIZE.1);

        app.go_to_frame(&ctx, 1, false);
        assert_eq!(app.project.as_ref().unwrap().current_frame, 1);
        assert_eq!(coords(&stored(&app, 0)), vec![(8, 9)]);
        assert!(app.points.is_empty());

        app.go_to_frame(&ctx, 0, false);
        assert_eq!(coords(&app.points), vec![(8, 9)]);
    }

    #[test]
    fn test_propagation_carries_hints_to_next_frame() {
        let (mut app, ctx) = loaded_app(None, false);
        app.add_point(5, 5);
        let color = app.current_color;

        app.go_to_frame(&ctx, 1, true);
        assert_eq!(app.request, Some(Request::Extrapolate));
        settle(&mut app, &ctx);

        assert_eq!(app.points.as_slice(), &[ColorPoint::new(5, 5, color)]);
        assert_eq!(stored(&app, 1), app.points);
        assert_eq!(coords(&stored(&app, 0)), vec![(5, 5)]);
    }

    #[test]
    fn test_edits_wait_for_pending_propagation() {
        let (mut app, ctx) = loaded_app(None, false);
        app.add_point(5, 5);
        app.go_to_frame(&ctx, 1, true);

        app.add_point(20, 20);
        app.handle_canvas_action(canvas::CanvasAction::StartDragging(0));
        assert!(app.points.is_empty());
        assert_eq!(app.dragging_point, None);

        settle(&mut app, &ctx);
        assert_eq!(coords(&app.points), vec![(5, 5)]);

        app.add_point(20, 20);
        assert_eq!(coords(&app.points), vec![(5, 5), (20, 20)]);
        assert_eq!(coords(&stored(&app, 1)), vec![(5, 5), (20, 20)]);
    }

    #[test]
    fn test_colorize_output_keeps_hints_and_stale_extrapolation_is_stored() {
        let (mut app, ctx) = loaded_app(None, false);
        app.add_point(5, 5);
        let other: FramePointSet = [ColorPoint::new(1, 1, [0, 0, 0])].into_iter().collect();

        app.apply_output(
            &ctx,
            Some(Request::Colorize),
            BackendOutput {
                frame_index: 0,
                image: Some(RgbImage::new(SIZE.0, SIZE.1)),
                points: other.clone(),
            },
        );
        assert_eq!(coords(&app.points), vec![(5, 5)]);
        assert!(app.textures.as_ref().unwrap().colorized.is_some());

        app.apply_output(
            &ctx,
            Some(Request::Extrapolate),
            BackendOutput {
                frame_index: 2,
                image: None,
                points: other.clone(),
            },
        );
        assert_eq!(stored(&app, 2), other);
        assert_eq!(coords(&app.points), vec![(5, 5)]);
    }

    #[test]
    fn test_empty_propagation_then_auto_colorizes() {
        let network = ConstantNetwork {
            resolution: 8,
            chroma: [40.0, 0.0],
        };
        let (mut app, ctx) = loaded_app(Some(network), true);

        app.go_to_frame(&ctx, 1, true);
        settle(&mut app, &ctx);

        assert!(app.points.is_empty());
        assert!(app.textures.as_ref().unwrap().colorized.is_some());
        assert_eq!(app.status, "Colorized");
    }
}
