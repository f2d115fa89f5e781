//! Flow control and application event loop.
//!
//! The event loop owns a [`Stage`] (the GPU-free scene state) and, once the
//! window exists, a [`Context`] (surface, device and renderer). Three event
//! sources drive it:
//!
//! 1. Window events: resizes, pointer input and `RedrawRequested`
//! 2. The model load completion, sent exactly once through the
//!    [`EventLoopProxy`](winit::event_loop::EventLoopProxy) as
//!    [`AppEvent::ModelLoaded`]
//! 3. On wasm, the asynchronously created context as [`AppEvent::Initialized`]
//!
//! Each `RedrawRequested` runs one iteration of the [`FrameLoop`]: read the
//! elapsed time, update the stage, upload, render and request the next
//! redraw. Cancelling the [`LoopHandle`] makes the next iteration exit the
//! event loop instead.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use instant::Duration;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    clock::{FrameClock, FrameTime, Stopwatch},
    config::SceneConfig,
    context::Context,
    data_structures::scene_graph::SceneNode,
    error::LoadError,
    resources::load_model_gltf,
    stage::Stage,
    viewport::Viewport,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal: no further frames are produced.
    Cancelled,
}

/// Cancels a [`FrameLoop`] from anywhere, including other threads.
#[derive(Clone, Debug, Default)]
pub struct LoopHandle {
    cancelled: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The per-frame loop: a frame clock plus the running/cancelled state.
#[derive(Debug)]
pub struct FrameLoop {
    handle: LoopHandle,
    clock: FrameClock,
    state: LoopState,
}

impl FrameLoop {
    pub fn new(handle: LoopHandle) -> Self {
        Self {
            handle,
            clock: FrameClock::new(),
            state: LoopState::Running,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Returns the timing of the next frame, or `None` once cancelled.
    pub fn next_frame(&mut self, elapsed: Duration) -> Option<FrameTime> {
        if self.state == LoopState::Cancelled {
            return None;
        }
        if self.handle.is_cancelled() {
            info!("Frame loop cancelled after {} frames", self.clock.frames());
            self.state = LoopState::Cancelled;
            return None;
        }
        Some(self.clock.advance(elapsed))
    }
}

pub enum AppEvent {
    /// The context created by `spawn_local` on wasm.
    #[allow(dead_code)]
    Initialized(Box<Context>),
    ModelLoaded(Result<Box<dyn SceneNode>, LoadError>),
    #[allow(dead_code)]
    Exit,
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::ModelLoaded(result) => f
                .debug_tuple("ModelLoaded")
                .field(&result.as_ref().map(|node| node.name().to_owned()))
                .finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    stage: Stage,
    ctx: Option<Context>,
    stopwatch: Stopwatch,
    load_started: bool,
}

impl App {
    fn new(
        event_loop: &EventLoop<AppEvent>,
        config: SceneConfig,
        handle: LoopHandle,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        let viewport = Viewport::new(1, 1, 1.0, config.max_pixel_ratio);
        let stage = Stage::with_handle(config, viewport, handle);

        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        {
            let handle = stage.loop_handle();
            async_runtime.spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C received, stopping the frame loop");
                    handle.cancel();
                }
            });
        }

        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            stage,
            ctx: None,
            stopwatch: Stopwatch::start(),
            load_started: false,
        })
    }

    /// Starts the model load; its result arrives as [`AppEvent::ModelLoaded`].
    fn spawn_model_load(&mut self) {
        if self.load_started {
            return;
        }
        self.load_started = true;
        let path = self.stage.config.model_path.clone();
        let proxy = self.proxy.clone();
        let load = async move {
            let result = load_model_gltf(&path).await;
            if proxy.send_event(AppEvent::ModelLoaded(result)).is_err() {
                warn!("Event loop closed before {} finished loading", path);
            }
        };
        info!("Loading model {}", self.stage.config.model_path);

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);
    }

    fn resize_to_window(&mut self) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        let size = ctx.window.inner_size();
        let scale_factor = ctx.window.scale_factor();
        if self.stage.resize_physical(size, scale_factor) {
            ctx.resize(&self.stage.viewport);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        if self.stage.frame(self.stopwatch.elapsed()).is_none() {
            event_loop.exit();
            return;
        }
        ctx.prepare(&mut self.stage);
        match ctx.render(&self.stage) {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.resize(&self.stage.viewport);
            }
            Err(e) => {
                error!("Unable to render {}", e);
            }
        }
        ctx.window.request_redraw();
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // resumed may fire again (e.g. after a suspend); the window and the
        // load are created once
        if self.ctx.is_some() || self.load_started {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("occlusion-scene");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document
                .get_element_by_id(&self.stage.config.canvas_id)
                .unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.stage
            .resize_physical(window.inner_size(), window.scale_factor());

        let init_future = Context::new(
            window,
            self.stage.viewport,
            self.stage.rig.clone(),
            self.stage.lights_uniform(),
            self.stage.config.clone(),
        );

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(ctx) => {
                    ctx.window.request_redraw();
                    self.ctx = Some(ctx);
                }
                Err(e) => {
                    error!("GPU setup failed: {:#}", e);
                    event_loop.exit();
                    return;
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(ctx) => {
                        if proxy.send_event(AppEvent::Initialized(Box::new(ctx))).is_err() {
                            error!("Event loop closed during GPU setup");
                        }
                    }
                    Err(e) => {
                        error!("GPU setup failed: {:#}", e);
                        let _ = proxy.send_event(AppEvent::Exit);
                    }
                }
            });
        }

        self.spawn_model_load();
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Initialized(ctx) => {
                // This is the message from our wasm `spawn_local`
                self.ctx = Some(*ctx);
                self.resize_to_window();
                if let Some(ctx) = &self.ctx {
                    ctx.window.request_redraw();
                }
            }
            AppEvent::ModelLoaded(result) => {
                self.stage.on_model_loaded(result);
            }
            AppEvent::Exit => {
                self.stage.loop_handle().cancel();
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.ctx.is_none() {
            return;
        }

        self.stage.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.stage.loop_handle().cancel();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize_to_window();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Runs the scene until the window closes or the loop is cancelled.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    run_with_handle(config, LoopHandle::new())
}

/// Like [`run`], with a handle that can stop the frame loop from outside.
pub fn run_with_handle(config: SceneConfig, handle: LoopHandle) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, handle)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(SceneConfig::default()).map_err(|e| JsValue::from_str(&e.to_string()))
}
