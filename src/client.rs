//! Client orchestration
//!
//! Wires the pieces together in dependency order: connect, discover and
//! bind globals, prepare the buffer, create the window, run the event loop,
//! tear everything down.

use log::{info, warn};
use wayland_client::Connection;

use crate::buffer::{BufferGeometry, SharedBuffer};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::event_loop::{self, LoopStats};
use crate::handshake::HandshakeStats;
use crate::wayland::{LiveSink, WaylandApp};

/// Everything needed to bring up the window
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub title: String,
    pub geometry: BufferGeometry,
}

impl ClientOptions {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            title: config.window.title.clone(),
            geometry: BufferGeometry::new(
                config.window.width,
                config.window.height,
                config.window.pixel_format(),
            )?,
        })
    }
}

/// What happened during a clean run
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub handshake: HandshakeStats,
    pub event_loop: LoopStats,
}

/// Runs the client until the compositor closes the toplevel
pub fn run(options: &ClientOptions) -> Result<RunSummary> {
    let connection =
        Connection::connect_to_env().map_err(|e| ClientError::Connection(e.to_string()))?;
    info!("🔌 Connection established");

    let mut event_queue = connection.new_event_queue::<WaylandApp>();
    let qh = event_queue.handle();
    let mut app = WaylandApp::new(LiveSink::new(connection.clone()));

    app.ctx.begin_discovery()?;
    let _registry = connection.display().get_registry(&qh, ());
    event_queue
        .roundtrip(&mut app)
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    info!(
        "🔍 Discovery finished: {} globals advertised",
        app.registry.advertised_count()
    );
    let globals = app.registry.complete()?;
    app.ctx.sink_mut().adopt_globals(&globals);

    let buffer = SharedBuffer::create(&globals.shm, options.geometry, &qh)?;
    app.ctx.sink_mut().adopt_buffer(buffer.buffer.clone());
    app.ctx.buffers_ready()?;

    let surface = globals.compositor.create_surface(&qh, ());
    let xdg_surface = globals.wm_base.get_xdg_surface(&surface, &qh, ());
    let toplevel = xdg_surface.get_toplevel(&qh, ());
    toplevel.set_title(options.title.clone());
    app.ctx.sink_mut().adopt_window(surface, xdg_surface, toplevel);
    app.ctx.surface_created()?;
    info!("🪟 Toplevel \"{}\" created, awaiting configure", options.title);

    let outcome = event_loop::run_until_closed(&mut app, &mut event_queue);
    if outcome.is_err() {
        warn!("⚠️ Tearing down after transport failure");
    }
    app.ctx.teardown();

    let event_loop = outcome?;
    Ok(RunSummary {
        handshake: app.ctx.handshake().stats(),
        event_loop,
    })
}
