use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{present_scene, App, AppControl, FrameCtx};
use crate::device::{Gpu, GpuInit};
use crate::render::{PixelRenderer, RenderConfig, Scene};
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "pixcanvas".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            resizable: true,
        }
    }
}

/// Entry point: opens one window and drives `app` until it exits or the
/// window closes.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, render_config: RenderConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            gpu_init,
            render_config,
            app,
            window: None,
            exit_requested: false,
            failure: None,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    renderer: Option<PixelRenderer>,
    scene: Scene,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    render_config: RenderConfig,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    /// First setup error, reported from `Runtime::run`.
    failure: Option<anyhow::Error>,
}

fn physical(size: PhysicalSize<u32>) -> (u32, u32) {
    (size.width, size.height)
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure.get_or_insert(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let mut entry = WindowEntryTryBuilder {
            renderer: None,
            scene: Scene::new(),
            clock: FrameClock::new(),
            window,
            gpu_builder: |w: &Window| pollster::block_on(Gpu::new(w, physical(w.inner_size()), gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let render_config = self.render_config.clone();
        let app = &mut self.app;
        entry.with_mut(|fields| -> Result<()> {
            let device = fields.gpu.device();
            let mut renderer = PixelRenderer::new(device, render_config)?;

            let mut builder = renderer.sheet_builder(device, "sprites");
            app.build_sheet(&mut builder).context("building the sprite sheet failed")?;
            renderer.upload_sheet(device, fields.gpu.queue(), builder.build());

            *fields.renderer = Some(renderer);
            Ok(())
        })?;

        Ok(entry)
    }

    fn redraw(&mut self) -> AppControl {
        let Some(entry) = self.window.as_mut() else {
            return AppControl::Continue;
        };
        let app = &mut self.app;

        entry.with_mut(|fields| {
            let Some(renderer) = fields.renderer.as_mut() else {
                return AppControl::Continue;
            };

            fields.scene.clear();
            let mut ctx = FrameCtx {
                canvas: renderer.canvas_info(),
                time: fields.clock.tick(),
                scene: fields.scene,
                sprites: renderer.sprite_entries(),
            };
            if app.on_frame(&mut ctx) == AppControl::Exit {
                return AppControl::Exit;
            }

            let window: &Window = fields.window;
            present_scene(fields.gpu, renderer, fields.scene, || window.pre_present_notify())
        })
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.window = Some(entry);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw; frame pacing comes from the present mode.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.exit_requested = true;
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(physical(*new_size)));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(physical(new_size)));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => {
                if self.redraw() == AppControl::Exit {
                    self.exit_requested = true;
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}
