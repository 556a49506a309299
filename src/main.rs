use glutin::dpi::PhysicalSize;
use glutin::event::{Event, WindowEvent};
use glutin::event_loop::{ControlFlow, EventLoop};
use glutin::window::WindowBuilder;
use glutin::{Api, ContextBuilder, ContextWrapper, GlRequest, PossiblyCurrent};
use std::process;

use glquad::gl_api::native::NativeContext;
use glquad::logging::init_logging;
use glquad::{QuadPipeline, QuadScene, RenderConfig, RenderError, RenderResult, RenderedQuad};

type WindowedContext = ContextWrapper<PossiblyCurrent, glutin::window::Window>;

fn load_config() -> RenderResult<RenderConfig> {
    match std::env::args().nth(1) {
        Some(path) => Ok(RenderConfig::load(path)?),
        None => Ok(RenderConfig::default()),
    }
}

fn open_window(
    config: &RenderConfig,
    event_loop: &EventLoop<()>,
) -> RenderResult<(WindowedContext, NativeContext)> {
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.width, config.height));
    let context = ContextBuilder::new()
        .with_gl(GlRequest::Specific(Api::OpenGlEs, (2, 0)))
        .with_vsync(true)
        .build_windowed(window, event_loop)
        .map_err(|err| RenderError::ContextUnavailable(err.to_string()))?;

    unsafe {
        let context = context
            .make_current()
            .map_err(|(_, err)| RenderError::ContextUnavailable(err.to_string()))?;
        let gl = NativeContext::load_with(|symbol| context.get_proc_address(symbol) as *const _)?;
        Ok((context, gl))
    }
}

fn present(context: &WindowedContext) -> RenderResult<()> {
    context
        .swap_buffers()
        .map_err(|err| RenderError::ContextUnavailable(err.to_string()))
}

fn setup(
    config: &RenderConfig,
    event_loop: &EventLoop<()>,
) -> RenderResult<(WindowedContext, NativeContext, RenderedQuad)> {
    let (context, mut gl) = open_window(config, event_loop)?;
    let quad = QuadPipeline::new(QuadScene::default()).run(&mut gl, config)?;
    present(&context)?;
    Ok((context, gl, quad))
}

fn main() {
    init_logging(None);

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    };

    let event_loop = EventLoop::new();
    let (context, mut gl, quad) = match setup(&config, &event_loop) {
        Ok(setup) => setup,
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    };

    let mut quad = Some(quad);
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    if let Some(quad) = quad.take() {
                        if let Err(err) = quad.release(&mut gl) {
                            log::warn!("failed to release the quad: {}", err);
                        }
                    }
                    *control_flow = ControlFlow::Exit;
                }
                _ => (),
            },
            Event::RedrawRequested(_) => {
                if let Some(quad) = &quad {
                    if let Err(err) = quad.redraw(&mut gl).and_then(|()| present(&context)) {
                        log::error!("{}", err);
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }
            _ => (),
        }
    });
}
