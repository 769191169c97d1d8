//! Event-handler capabilities per listenable protocol object
//!
//! The transport glue decodes events and calls these traits; it never
//! touches client state directly. [`ClientContext`] implements all of them
//! over the handshake, the run flag and a request sink.

use log::info;

use crate::error::Result;
use crate::handshake::{Handshake, HandshakeState};
use crate::wire::RequestSink;

/// Events of the shell base (`xdg_wm_base`)
pub trait ShellBaseEvents {
    fn ping(&mut self, serial: u32);
}

/// Events of the shell surface (`xdg_surface`)
pub trait ShellSurfaceEvents {
    fn configure(&mut self, serial: u32);
}

/// Events of the toplevel role (`xdg_toplevel`)
pub trait ToplevelEvents {
    fn configure(&mut self, width: i32, height: i32, states: Vec<u32>);
    fn close(&mut self);
    fn configure_bounds(&mut self, _width: i32, _height: i32) {}
    fn wm_capabilities(&mut self, _capabilities: Vec<u32>) {}
}

/// Events of the pixel buffer (`wl_buffer`)
pub trait BufferEvents {
    fn release(&mut self);
}

/// Continuation test for the dispatch loop
pub trait RunState {
    fn is_running(&self) -> bool;

    /// The connection broke; the loop is already exiting
    fn transport_failed(&mut self, reason: &str);
}

/// Client state shared by every handler for the lifetime of the handshake
#[derive(Debug)]
pub struct ClientContext<S> {
    running: bool,
    handshake: Handshake,
    sink: S,
}

impl<S: RequestSink> ClientContext<S> {
    pub fn new(sink: S) -> Self {
        Self {
            running: true,
            handshake: Handshake::new(),
            sink,
        }
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn begin_discovery(&mut self) -> Result<()> {
        self.handshake.begin_discovery()
    }

    pub fn buffers_ready(&mut self) -> Result<()> {
        self.handshake.buffers_ready()
    }

    pub fn surface_created(&mut self) -> Result<()> {
        self.handshake.surface_created(&mut self.sink)
    }

    /// Ordered teardown of everything created so far
    pub fn teardown(&mut self) {
        self.handshake.teardown(&mut self.sink);
    }

    /// Consumes the context, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: RequestSink> ShellBaseEvents for ClientContext<S> {
    fn ping(&mut self, serial: u32) {
        self.handshake.on_ping(serial, &mut self.sink);
    }
}

impl<S: RequestSink> ShellSurfaceEvents for ClientContext<S> {
    fn configure(&mut self, serial: u32) {
        self.handshake.on_configure(serial, &mut self.sink);
    }
}

impl<S: RequestSink> ToplevelEvents for ClientContext<S> {
    fn configure(&mut self, width: i32, height: i32, states: Vec<u32>) {
        self.handshake.on_toplevel_configure(width, height, states);
    }

    fn close(&mut self) {
        if self.running {
            info!("🚪 Compositor asked the toplevel to close");
            self.running = false;
            self.handshake.begin_closing("toplevel close");
        }
    }

    fn configure_bounds(&mut self, width: i32, height: i32) {
        self.handshake.on_configure_bounds(width, height);
    }

    fn wm_capabilities(&mut self, capabilities: Vec<u32>) {
        self.handshake.on_wm_capabilities(capabilities);
    }
}

impl<S: RequestSink> BufferEvents for ClientContext<S> {
    fn release(&mut self) {
        self.handshake.on_buffer_release();
    }
}

impl<S: RequestSink> RunState for ClientContext<S> {
    fn is_running(&self) -> bool {
        self.running
    }

    fn transport_failed(&mut self, reason: &str) {
        self.handshake.begin_closing(reason);
    }
}
