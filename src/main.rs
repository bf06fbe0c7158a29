use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    DeviceEvent, ElementState, Event, KeyboardInput, MouseScrollDelta, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use lamplit::{AssetRoot, FrameClock, InitError, KeyCode, Renderer, Viewer, ViewerConfig};

/// Scroll distance of one wheel notch on touchpads reporting pixels.
const PIXELS_PER_LINE: f64 = 20.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        let code = if err.downcast_ref::<InitError>().is_some() {
            InitError::EXIT_CODE
        } else {
            1
        };
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let config = ViewerConfig::from_env()?;
    info!("pipeline stages: {:?}", config.stages);

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop =
        event_loop.map_err(|panic| InitError::window("event loop", panic_message(panic)))?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .build(&event_loop)
            .map_err(|err| InitError::window("window", err))?,
    );

    let assets = AssetRoot::new(config.asset_root.clone());
    let renderer = block_on(Renderer::new(Arc::clone(&window), config.stages, &assets))
        .map_err(|err| InitError::gpu(&err))?;
    capture_cursor(&window, true);

    let mut app = AppState {
        renderer,
        viewer: Viewer::new(config.stages),
        clock: FrameClock::start(Instant::now()),
        focused: true,
        last_error: None,
    };

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    info!("exiting after {:.1}s", app.clock.elapsed().as_secs_f32());
    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct AppState {
    renderer: Renderer,
    viewer: Viewer,
    clock: FrameClock,
    /// Pointer motion only turns the camera while the window has focus.
    focused: bool,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => control_flow.set_exit(),
                    WindowEvent::Resized(size) => self.renderer.resize(*size),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                    }
                    WindowEvent::Focused(focused) => {
                        self.focused = *focused;
                        if !focused {
                            self.viewer.reset_input();
                        }
                        capture_cursor(self.renderer.window(), *focused);
                    }
                    WindowEvent::KeyboardInput { input, .. } => self.handle_keyboard(input),
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(position) => {
                                (position.y / PIXELS_PER_LINE) as f32
                            }
                        };
                        self.viewer.scrolled(lines);
                    }
                    _ => {}
                }
                if self.viewer.exit_requested() {
                    control_flow.set_exit();
                }
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } if self.focused => {
                self.viewer
                    .mouse_moved(Vec2::new(delta.0 as f32, delta.1 as f32));
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                let (delta, time) = self.clock.tick(Instant::now());
                self.viewer.update(delta);
                let plan = self.viewer.plan_frame(time, self.renderer.aspect());
                if let Err(err) = self.renderer.render(&plan) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput) {
        let Some(key) = input.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        self.viewer
            .key_event(key, input.state == ElementState::Pressed);
    }
}

/// Hides and pins the cursor while the window has focus.
///
/// Look input comes from raw device motion, so a locked or confined cursor
/// does not limit how far the camera can turn.
fn capture_cursor(window: &Window, captured: bool) {
    let grab = if captured {
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(err) = grab {
        warn!("cursor grab unavailable: {err}");
    }
    window.set_cursor_visible(!captured);
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<KeyCode> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::W => KeyCode::W,
        Key::A => KeyCode::A,
        Key::S => KeyCode::S,
        Key::D => KeyCode::D,
        Key::L => KeyCode::L,
        Key::E => KeyCode::E,
        Key::Escape => KeyCode::Escape,
        _ => return None,
    })
}
