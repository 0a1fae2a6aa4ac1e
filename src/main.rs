use std::error::Error;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{value_parser, Arg, ArgAction, Command};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::window::{Window, WindowId};

use scene_renderer::{Gpu, Renderer, RendererConfig};

/// A window with a current OpenGL 3.3 core context.
struct GlWindow {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

#[cfg(target_os = "windows")]
fn display_preference(window_handle: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Wgl(Some(window_handle))
}

#[cfg(target_os = "macos")]
fn display_preference(_window_handle: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn display_preference(_window_handle: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

fn create_gl_window(
    event_loop: &ActiveEventLoop,
    width: u32,
    height: u32,
) -> Result<(GlWindow, glow::Context), Box<dyn Error>> {
    let attributes = Window::default_attributes()
        .with_title("Scene Renderer")
        .with_inner_size(PhysicalSize::new(width, height));
    let window = event_loop.create_window(attributes)?;

    let display_handle = window.display_handle()?.as_raw();
    let window_handle = window.window_handle()?.as_raw();

    let display = unsafe { Display::new(display_handle, display_preference(window_handle))? };

    let template = ConfigTemplateBuilder::new().with_depth_size(24).build();
    let config = unsafe { display.find_configs(template)? }
        .next()
        .ok_or("no OpenGL config matches the requested template")?;

    let size = window.inner_size();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        window_handle,
        NonZeroU32::new(size.width).ok_or("window has zero width")?,
        NonZeroU32::new(size.height).ok_or("window has zero height")?,
    );
    let surface = unsafe { display.create_window_surface(&config, &surface_attributes)? };

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .with_profile(GlProfile::Core)
        .build(Some(window_handle));
    let context = unsafe { display.create_context(&config, &context_attributes)? }
        .make_current(&surface)?;

    let gl = unsafe { glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name)) };

    Ok((
        GlWindow {
            surface,
            context,
            window,
        },
        gl,
    ))
}

struct App {
    renderer: Renderer,
    gl_window: Option<GlWindow>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let config = self.renderer.config();
        let (gl_window, gl) = create_gl_window(event_loop, config.width, config.height)?;

        let gpu: Gpu = Rc::new(gl);
        self.renderer.load(gpu)?;
        self.renderer.setup()?;

        let size = gl_window.window.inner_size();
        self.renderer.resize(size.width, size.height);
        gl_window.window.request_redraw();
        self.gl_window = Some(gl_window);
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), Box<dyn Error>> {
        let Some(gl_window) = self.gl_window.as_ref() else {
            return Ok(());
        };
        self.renderer.frame()?;
        gl_window.surface.swap_buffers(&gl_window.context)?;
        gl_window.window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl_window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            error!("Failed to start renderer: {}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, stopping");
                self.renderer.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(gl_window), Some(width), Some(height)) = (
                    self.gl_window.as_ref(),
                    NonZeroU32::new(size.width),
                    NonZeroU32::new(size.height),
                ) {
                    gl_window.surface.resize(&gl_window.context, width, height);
                    self.renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    error!("Frame failed: {}", e);
                    self.renderer.shutdown();
                    event_loop.exit();
                }
            }
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // GPU objects must go before the context does.
        self.renderer.shutdown();
        self.gl_window = None;
    }
}

fn command() -> Command {
    Command::new("scene_renderer")
        .about("Renders glTF models and built-in shapes with a forward shading pass")
        .arg(
            Arg::new("models")
                .help("glTF files to load at startup")
                .num_args(0..)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(value_parser!(u32))
                .default_value("800"),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(value_parser!(u32))
                .default_value("600"),
        )
        .arg(
            Arg::new("fov")
                .long("fov")
                .help("Vertical field of view in degrees")
                .value_parser(value_parser!(f32))
                .default_value("90"),
        )
        .arg(
            Arg::new("no-shapes")
                .long("no-shapes")
                .help("Skip the built-in cylinder, torus and sphere")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-flip-uvs")
                .long("no-flip-uvs")
                .action(ArgAction::SetTrue),
        )
}

fn config_from_args() -> RendererConfig {
    let matches = command().get_matches();
    let mut config = RendererConfig::default();

    if let Some(models) = matches.get_many::<PathBuf>("models") {
        config.models = models.cloned().collect();
    }
    if let Some(width) = matches.get_one::<u32>("width") {
        config.width = *width;
    }
    if let Some(height) = matches.get_one::<u32>("height") {
        config.height = *height;
    }
    if let Some(fov) = matches.get_one::<f32>("fov") {
        config.fov = *fov;
    }
    if matches.get_flag("no-shapes") {
        config.stored_meshes.clear();
    }
    if matches.get_flag("no-flip-uvs") {
        config.import_flags.flip_uvs = false;
    }
    config
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config_from_args();
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        renderer: Renderer::new(config),
        gl_window: None,
    };
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop stopped with an error: {}", e);
        std::process::exit(1);
    }
}
