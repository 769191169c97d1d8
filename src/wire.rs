//! Outgoing requests issued by the handshake state machine
//!
//! The state machine never talks to proxies directly. It emits [`Request`]
//! values into a [`RequestSink`]; the live sink forwards them to the
//! compositor, [`RequestLog`] keeps an ordered trace.

/// Protocol objects the client owns and eventually destroys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolObject {
    Toplevel,
    ShellSurface,
    Surface,
    Buffer,
    ShellBase,
    Compositor,
    Shm,
}

impl ProtocolObject {
    /// Teardown order: children before the factories that created them
    pub const TEARDOWN_ORDER: [ProtocolObject; 7] = [
        ProtocolObject::Toplevel,
        ProtocolObject::ShellSurface,
        ProtocolObject::Surface,
        ProtocolObject::Buffer,
        ProtocolObject::ShellBase,
        ProtocolObject::Compositor,
        ProtocolObject::Shm,
    ];

    /// Whether this is one of the bound registry globals
    pub fn is_global(self) -> bool {
        matches!(
            self,
            ProtocolObject::ShellBase | ProtocolObject::Compositor | ProtocolObject::Shm
        )
    }
}

/// A request on the wire, reduced to what the handshake cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `xdg_wm_base.pong`
    Pong(u32),
    /// `xdg_surface.ack_configure`
    AckConfigure(u32),
    /// `wl_surface.attach` of the prepared buffer
    Attach { x: i32, y: i32 },
    /// `wl_surface.commit`
    Commit,
    /// Destructor request (or proxy release for interfaces without one)
    Destroy(ProtocolObject),
    /// Flush and drop the connection
    Disconnect,
}

/// Destination for requests
#[cfg_attr(test, mockall::automock)]
pub trait RequestSink {
    fn send(&mut self, request: Request);
}

/// Sink that records every request in order
#[derive(Debug, Default, Clone)]
pub struct RequestLog {
    requests: Vec<Request>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Index of the first request matching `pred`
    pub fn position(&self, pred: impl Fn(&Request) -> bool) -> Option<usize> {
        self.requests.iter().position(pred)
    }

    /// Destroyed objects, in the order they were destroyed
    pub fn destroyed(&self) -> Vec<ProtocolObject> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                Request::Destroy(object) => Some(*object),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Request) -> bool) -> usize {
        self.requests.iter().filter(|r| pred(r)).count()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}

impl RequestSink for RequestLog {
    fn send(&mut self, request: Request) {
        self.requests.push(request);
    }
}
