//! `wayland-client` glue
//!
//! Decodes protocol events into the handler traits of [`crate::events`] and
//! turns [`Request`] values back into proxy calls. No handshake logic
//! lives here.

use log::{debug, trace, warn};
use wayland_client::protocol::{
    wl_buffer::{self, WlBuffer},
    wl_compositor::WlCompositor,
    wl_registry::{self, WlRegistry},
    wl_shm::{self, WlShm},
    wl_shm_pool::WlShmPool,
    wl_surface::WlSurface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, QueueHandle, WEnum};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

use crate::events::{
    BufferEvents, ClientContext, RunState, ShellBaseEvents, ShellSurfaceEvents, ToplevelEvents,
};
use crate::registry::{BoundGlobals, GlobalAdvertisement, GlobalBinder, RegistryBindings};
use crate::wire::{ProtocolObject, Request, RequestSink};

pub type LiveGlobals = BoundGlobals<WlShm, WlCompositor, XdgWmBase>;

/// Forwards requests to live proxies
///
/// Holds every proxy the handshake may address. Destroying an object drops
/// the proxy so later requests on it become no-ops with a warning.
#[derive(Debug, Default)]
pub struct LiveSink {
    connection: Option<Connection>,
    shm: Option<WlShm>,
    compositor: Option<WlCompositor>,
    wm_base: Option<XdgWmBase>,
    buffer: Option<WlBuffer>,
    surface: Option<WlSurface>,
    xdg_surface: Option<XdgSurface>,
    toplevel: Option<XdgToplevel>,
}

impl LiveSink {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
            ..Default::default()
        }
    }

    pub fn adopt_globals(&mut self, globals: &LiveGlobals) {
        self.shm = Some(globals.shm.clone());
        self.compositor = Some(globals.compositor.clone());
        self.wm_base = Some(globals.wm_base.clone());
    }

    pub fn adopt_buffer(&mut self, buffer: WlBuffer) {
        self.buffer = Some(buffer);
    }

    pub fn adopt_window(&mut self, surface: WlSurface, xdg_surface: XdgSurface, toplevel: XdgToplevel) {
        self.surface = Some(surface);
        self.xdg_surface = Some(xdg_surface);
        self.toplevel = Some(toplevel);
    }

    fn destroy(&mut self, object: ProtocolObject) {
        match object {
            ProtocolObject::Toplevel => {
                if let Some(toplevel) = self.toplevel.take() {
                    toplevel.destroy();
                }
            }
            ProtocolObject::ShellSurface => {
                if let Some(xdg_surface) = self.xdg_surface.take() {
                    xdg_surface.destroy();
                }
            }
            ProtocolObject::Surface => {
                if let Some(surface) = self.surface.take() {
                    surface.destroy();
                }
            }
            ProtocolObject::Buffer => {
                if let Some(buffer) = self.buffer.take() {
                    buffer.destroy();
                }
            }
            ProtocolObject::ShellBase => {
                if let Some(wm_base) = self.wm_base.take() {
                    wm_base.destroy();
                }
            }
            // wl_compositor and wl_shm v1 have no destructor request
            ProtocolObject::Compositor => {
                self.compositor.take();
            }
            ProtocolObject::Shm => {
                self.shm.take();
            }
        }
        trace!("Destroyed {:?}", object);
    }
}

impl RequestSink for LiveSink {
    fn send(&mut self, request: Request) {
        match request {
            Request::Pong(serial) => match &self.wm_base {
                Some(wm_base) => wm_base.pong(serial),
                None => warn!("⚠️ Pong {} without a shell base", serial),
            },
            Request::AckConfigure(serial) => match &self.xdg_surface {
                Some(xdg_surface) => xdg_surface.ack_configure(serial),
                None => warn!("⚠️ Ack {} without a shell surface", serial),
            },
            Request::Attach { x, y } => match &self.surface {
                Some(surface) => surface.attach(self.buffer.as_ref(), x, y),
                None => warn!("⚠️ Attach without a surface"),
            },
            Request::Commit => match &self.surface {
                Some(surface) => surface.commit(),
                None => warn!("⚠️ Commit without a surface"),
            },
            Request::Destroy(object) => self.destroy(object),
            Request::Disconnect => {
                if let Some(connection) = self.connection.take() {
                    if let Err(e) = connection.flush() {
                        warn!("⚠️ Final flush failed: {}", e);
                    }
                    debug!("Connection released");
                }
            }
        }
    }
}

/// State handed to every `Dispatch` impl
#[derive(Debug)]
pub struct WaylandApp {
    pub registry: RegistryBindings<WlShm, WlCompositor, XdgWmBase>,
    pub ctx: ClientContext<LiveSink>,
    shm_formats: Vec<u32>,
}

impl WaylandApp {
    pub fn new(sink: LiveSink) -> Self {
        Self {
            registry: RegistryBindings::new(),
            ctx: ClientContext::new(sink),
            shm_formats: Vec::new(),
        }
    }

    /// Raw `wl_shm.format` codes the compositor announced
    pub fn shm_formats(&self) -> &[u32] {
        &self.shm_formats
    }
}

impl RunState for WaylandApp {
    fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    fn transport_failed(&mut self, reason: &str) {
        self.ctx.transport_failed(reason);
    }
}

struct ProxyBinder<'a> {
    registry: &'a WlRegistry,
    qh: &'a QueueHandle<WaylandApp>,
}

impl GlobalBinder for ProxyBinder<'_> {
    type Shm = WlShm;
    type Compositor = WlCompositor;
    type WmBase = XdgWmBase;

    fn bind_shm(&mut self, name: u32, version: u32) -> WlShm {
        self.registry.bind(name, version, self.qh, ())
    }

    fn bind_compositor(&mut self, name: u32, version: u32) -> WlCompositor {
        self.registry.bind(name, version, self.qh, ())
    }

    fn bind_wm_base(&mut self, name: u32, version: u32) -> XdgWmBase {
        self.registry.bind(name, version, self.qh, ())
    }
}

/// `xdg_toplevel` packs enum arrays as native-endian u32
fn decode_u32_array(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

impl Dispatch<WlRegistry, ()> for WaylandApp {
    fn event(
        state: &mut Self,
        proxy: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global { name, interface, version } => {
                let advert = GlobalAdvertisement { name, interface, version };
                let mut binder = ProxyBinder { registry: proxy, qh };
                state.registry.on_global(&advert, &mut binder);
            }
            wl_registry::Event::GlobalRemove { name } => {
                state.registry.on_global_remove(name);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlShm, ()> for WaylandApp {
    fn event(
        state: &mut Self,
        _: &WlShm,
        event: wl_shm::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            let code = match format {
                WEnum::Value(format) => u32::from(format),
                WEnum::Unknown(raw) => raw,
            };
            trace!("wl_shm format 0x{:08x}", code);
            state.shm_formats.push(code);
        }
    }
}

impl Dispatch<WlBuffer, ()> for WaylandApp {
    fn event(
        state: &mut Self,
        _: &WlBuffer,
        event: wl_buffer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            state.ctx.release();
        }
    }
}

impl Dispatch<XdgWmBase, ()> for WaylandApp {
    fn event(
        state: &mut Self,
        _: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            state.ctx.ping(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for WaylandApp {
    fn event(
        state: &mut Self,
        _: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            ShellSurfaceEvents::configure(&mut state.ctx, serial);
        }
    }
}

impl Dispatch<XdgToplevel, ()> for WaylandApp {
    fn event(
        state: &mut Self,
        _: &XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, states } => {
                ToplevelEvents::configure(&mut state.ctx, width, height, decode_u32_array(&states));
            }
            xdg_toplevel::Event::Close => state.ctx.close(),
            xdg_toplevel::Event::ConfigureBounds { width, height } => {
                state.ctx.configure_bounds(width, height);
            }
            xdg_toplevel::Event::WmCapabilities { capabilities } => {
                state.ctx.wm_capabilities(decode_u32_array(&capabilities));
            }
            _ => {}
        }
    }
}

delegate_noop!(WaylandApp: WlCompositor);
delegate_noop!(WaylandApp: WlShmPool);
delegate_noop!(WaylandApp: ignore WlSurface);
