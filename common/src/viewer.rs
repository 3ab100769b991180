//! Interactive viewer loop.
//!
//! Controls:
//! - Left mouse drag: Orbit camera
//! - Right mouse drag: Pan look-at target
//! - Scroll: Zoom in/out
//! - Backspace: Reset view
//! - G: Toggle grid
//! - Escape: Close

use std::fmt;

use thiserror::Error;
use winit::{
    error::EventLoopError,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ControlFlow,
    keyboard::{KeyCode, PhysicalKey},
};

use crate::camera::ViewerCamera;
use crate::context::SimContext;
use crate::graphics::{GraphicsContext, GraphicsError};
use crate::renderer::SceneRenderer;
use crate::scene::Scene;

const ORBIT_SPEED: f32 = 0.01;

/// Lifecycle of a viewer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

impl ViewerPhase {
    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: ViewerPhase) -> bool {
        use ViewerPhase::*;
        matches!(
            (self, next),
            (Initializing, Running)
                | (Initializing, Terminated)
                | (Running, ShuttingDown)
                | (ShuttingDown, Terminated)
        )
    }
}

impl fmt::Display for ViewerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewerPhase::Initializing => "initializing",
            ViewerPhase::Running => "running",
            ViewerPhase::ShuttingDown => "shutting down",
            ViewerPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Viewer initialization failed: {0}")]
    Init(#[from] GraphicsError),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
}

/// Window settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub show_grid: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Simulation Viewer".to_string(),
            width: 800,
            height: 600,
            show_grid: true,
        }
    }
}

/// Mouse drag state turned into camera motion.
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    orbiting: bool,
    panning: bool,
    last_cursor: Option<(f64, f64)>,
}

impl CameraInput {
    pub fn button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.orbiting = pressed,
            MouseButton::Right => self.panning = pressed,
            _ => return,
        }
        if !self.orbiting && !self.panning {
            self.last_cursor = None;
        }
    }

    /// Button event from the window. Presses over UI widgets are ignored,
    /// releases always end the drag.
    pub fn mouse_input(&mut self, button: MouseButton, pressed: bool, over_ui: bool) {
        if pressed && over_ui {
            return;
        }
        self.button(button, pressed);
    }

    /// Apply a cursor move; `viewport_height` scales panning to the window.
    pub fn cursor_moved(&mut self, camera: &mut ViewerCamera, x: f64, y: f64, viewport_height: f32) {
        if !self.orbiting && !self.panning {
            return;
        }
        if let Some((last_x, last_y)) = self.last_cursor {
            let dx = (x - last_x) as f32;
            let dy = (y - last_y) as f32;
            if self.orbiting {
                camera.orbit(-dx * ORBIT_SPEED, dy * ORBIT_SPEED);
            } else {
                let scale = viewport_height.max(1.0);
                camera.pan(dx / scale, dy / scale);
            }
        }
        self.last_cursor = Some((x, y));
    }

    pub fn scroll(&mut self, camera: &mut ViewerCamera, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
        };
        camera.zoom(lines);
    }
}

struct EguiState {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

struct ViewerApp {
    gfx: GraphicsContext,
    renderer: SceneRenderer,
    camera: ViewerCamera,
    input: CameraInput,
    context: SimContext,
    show_grid: bool,
    phase: ViewerPhase,
    egui: EguiState,
}

impl ViewerApp {
    fn new(gfx: GraphicsContext, context: SimContext, config: &ViewerConfig) -> Self {
        let renderer = SceneRenderer::new(&gfx);
        let mut camera = ViewerCamera::new(gfx.aspect_ratio());
        let scene = Scene::from_state(context.model(), &context.snapshot());
        if let Some((center, radius)) = scene.extent() {
            camera.fit(center, radius);
        }

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &gfx.window,
            Some(gfx.window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Self {
            gfx,
            renderer,
            camera,
            input: CameraInput::default(),
            context,
            show_grid: config.show_grid,
            phase: ViewerPhase::Initializing,
            egui: EguiState {
                ctx: egui_ctx,
                state: egui_state,
                renderer: egui_renderer,
            },
        }
    }

    fn set_phase(&mut self, next: ViewerPhase) {
        if self.phase == next {
            return;
        }
        debug_assert!(self.phase.can_transition_to(next), "{} -> {}", self.phase, next);
        log::info!("Viewer {}", next);
        self.phase = next;
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.gfx.resize(new_size);
        self.camera.update_aspect_ratio(self.gfx.aspect_ratio());
        self.renderer
            .resize(&self.gfx.device, new_size.width, new_size.height);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // Lock held only while copying the state.
        let state = self.context.snapshot();
        let scene = Scene::from_state(self.context.model(), &state);

        let output = self.gfx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.update_camera(&self.gfx.queue, &self.camera);
        let batches = self
            .renderer
            .update_scene(&self.gfx.device, &self.gfx.queue, &scene);

        let raw_input = self.egui.state.take_egui_input(&self.gfx.window);
        let phase = self.phase;
        let full_output = self.egui.ctx.run(raw_input, |ctx| {
            draw_status_bar(ctx, &scene, phase);
        });

        self.egui
            .state
            .handle_platform_output(&self.gfx.window, full_output.platform_output);
        let tris = self
            .egui
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui
                .renderer
                .update_texture(&self.gfx.device, &self.gfx.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gfx.size.width, self.gfx.size.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.renderer
            .render(&mut encoder, &view, &batches, self.show_grid);

        self.egui.renderer.update_buffers(
            &self.gfx.device,
            &self.gfx.queue,
            &mut encoder,
            &tris,
            &screen_descriptor,
        );
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui
                .renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui.renderer.free_texture(id);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Returns `true` when the key asks the viewer to close.
    fn handle_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        if state != ElementState::Pressed {
            return false;
        }
        match key {
            KeyCode::Escape => return true,
            KeyCode::Backspace => self.camera.reset(),
            KeyCode::KeyG => self.show_grid = !self.show_grid,
            _ => {}
        }
        false
    }

    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.egui
            .state
            .on_window_event(&self.gfx.window, event)
            .consumed
    }
}

fn draw_status_bar(ctx: &egui::Context, scene: &Scene, phase: ViewerPhase) {
    egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(&scene.model_name).strong());
            ui.separator();
            ui.label(format!("t = {:.3} s", scene.time));
            for (name, value) in &scene.controls {
                ui.separator();
                ui.label(egui::RichText::new(format!("{name}: {value:.3}")).monospace());
            }
            ui.separator();
            let color = match phase {
                ViewerPhase::Running => egui::Color32::GREEN,
                _ => egui::Color32::YELLOW,
            };
            ui.label(egui::RichText::new(phase.to_string().to_uppercase()).color(color));
        });
    });
}

/// Open a window and draw `context` until it is closed or shutdown is requested.
///
/// Must be called on the main thread. Initialization failures are logged and
/// returned before the loop starts; the simulation keeps running regardless.
pub fn run_viewer(context: SimContext, config: ViewerConfig) -> Result<(), ViewerError> {
    log::info!("Viewer {}", ViewerPhase::Initializing);

    let (gfx, event_loop) =
        pollster::block_on(GraphicsContext::new(&config.title, config.width, config.height))
            .inspect_err(|err| {
                log::error!("{err}");
                log::info!("Viewer {}", ViewerPhase::Terminated);
            })?;

    let mut app = ViewerApp::new(gfx, context, &config);
    app.set_phase(ViewerPhase::Running);

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { ref event, .. } => {
                let consumed = app.handle_window_event(event);

                match event {
                    WindowEvent::CloseRequested => {
                        app.set_phase(ViewerPhase::ShuttingDown);
                        elwt.exit();
                    }
                    WindowEvent::Resized(size) => app.resize(*size),
                    WindowEvent::RedrawRequested => match app.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            app.resize(app.gfx.size)
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("Out of GPU memory");
                            app.set_phase(ViewerPhase::ShuttingDown);
                            elwt.exit();
                        }
                        Err(e) => log::warn!("Render error: {:?}", e),
                    },
                    WindowEvent::MouseInput { state, button, .. } => {
                        app.input
                            .mouse_input(*button, *state == ElementState::Pressed, consumed);
                    }
                    _ if consumed => {}
                    WindowEvent::CursorMoved { position, .. } => {
                        let height = app.gfx.size.height as f32;
                        app.input
                            .cursor_moved(&mut app.camera, position.x, position.y, height);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        app.input.scroll(&mut app.camera, *delta);
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                physical_key: PhysicalKey::Code(key),
                                state,
                                ..
                            },
                        ..
                    } => {
                        if app.handle_key(*key, *state) {
                            app.set_phase(ViewerPhase::ShuttingDown);
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if app.context.is_running() {
                    app.gfx.window.request_redraw();
                } else {
                    app.set_phase(ViewerPhase::ShuttingDown);
                    elwt.exit();
                }
            }
            Event::LoopExiting => {
                app.set_phase(ViewerPhase::ShuttingDown);
                log::info!("Releasing graphics resources");
            }
            _ => {}
        }
    })?;

    log::info!("Viewer {}", ViewerPhase::Terminated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        use ViewerPhase::*;
        assert!(Initializing.can_transition_to(Running));
        assert!(Initializing.can_transition_to(Terminated));
        assert!(Running.can_transition_to(ShuttingDown));
        assert!(ShuttingDown.can_transition_to(Terminated));

        assert!(!Running.can_transition_to(Initializing));
        assert!(!Running.can_transition_to(Terminated));
        assert!(!Terminated.can_transition_to(Running));
        assert_eq!(ShuttingDown.to_string(), "shutting down");
    }

    #[test]
    fn test_left_drag_orbits() {
        let mut camera = ViewerCamera::new(1.0);
        let mut input = CameraInput::default();
        let azimuth = camera.azimuth;

        // Moves without a button held do nothing.
        input.cursor_moved(&mut camera, 10.0, 10.0, 600.0);
        assert_eq!(camera.azimuth, azimuth);

        input.button(MouseButton::Left, true);
        input.cursor_moved(&mut camera, 10.0, 10.0, 600.0);
        input.cursor_moved(&mut camera, 60.0, 10.0, 600.0);
        assert!((camera.azimuth - (azimuth - 0.5)).abs() < 1e-5);

        input.button(MouseButton::Left, false);
        input.cursor_moved(&mut camera, 200.0, 10.0, 600.0);
        assert!((camera.azimuth - (azimuth - 0.5)).abs() < 1e-5);
    }

    #[test]
    fn test_release_over_ui_ends_drag() {
        let mut camera = ViewerCamera::new(1.0);
        let mut input = CameraInput::default();
        input.mouse_input(MouseButton::Left, true, false);
        input.cursor_moved(&mut camera, 0.0, 0.0, 600.0);

        // The release lands on the status bar.
        input.mouse_input(MouseButton::Left, false, true);
        let azimuth = camera.azimuth;
        input.cursor_moved(&mut camera, 100.0, 0.0, 600.0);
        assert_eq!(camera.azimuth, azimuth);

        // A press over the status bar does not start a drag.
        input.mouse_input(MouseButton::Left, true, true);
        input.cursor_moved(&mut camera, 200.0, 0.0, 600.0);
        assert_eq!(camera.azimuth, azimuth);
    }

    #[test]
    fn test_right_drag_pans() {
        let mut camera = ViewerCamera::new(1.0);
        let mut input = CameraInput::default();
        input.button(MouseButton::Right, true);
        input.cursor_moved(&mut camera, 0.0, 0.0, 600.0);
        input.cursor_moved(&mut camera, 0.0, 60.0, 600.0);
        assert!(camera.target.length() > 0.0);
        assert_eq!(camera.azimuth, ViewerCamera::new(1.0).azimuth);
    }

    #[test]
    fn test_scroll_zooms() {
        let mut camera = ViewerCamera::new(1.0);
        let mut input = CameraInput::default();
        let before = camera.distance;
        input.scroll(&mut camera, MouseScrollDelta::LineDelta(0.0, 2.0));
        assert!(camera.distance < before);
    }
}
