//! Surface handshake state machine
//!
//! Sequences the client side of xdg-shell:
//! 1. **Discovering**: registry round-trip in flight
//! 2. **BuffersReady**: globals bound, pixel buffer prepared
//! 3. **SurfaceCreated**: wl_surface, xdg_surface and xdg_toplevel exist
//! 4. **AwaitingConfigure**: empty initial commit sent
//! 5. **Configured**: a configure was acked and the buffer committed
//! 6. **Closing** / **Terminated**: ordered teardown
//!
//! # Configure sequence
//!
//! Every `xdg_surface.configure` is answered with `ack_configure` carrying
//! its serial, then the buffer is attached and committed. The ack always
//! comes first, so no buffer commit can precede an acknowledged configure.

use log::{debug, info, trace, warn};

use crate::error::{ClientError, Result};
use crate::wire::{ProtocolObject, Request, RequestSink};

/// Lifecycle of the client connection and its window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No connection yet
    Disconnected,
    /// Registry listener registered, round-trip pending
    Discovering,
    /// Globals bound and the pixel buffer exists
    BuffersReady,
    /// Surface, shell surface and toplevel role created
    SurfaceCreated,
    /// Initial empty commit sent, waiting for the first configure
    AwaitingConfigure,
    /// At least one configure acked and the buffer committed
    Configured,
    /// Close requested or transport failed
    Closing,
    /// Everything destroyed and the connection dropped
    Terminated,
}

/// Latest toplevel hints from the compositor (bookkeeping only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToplevelHints {
    /// Suggested size, 0 means the client decides
    pub width: i32,
    pub height: i32,
    /// Raw `xdg_toplevel.state` values
    pub states: Vec<u32>,
    pub bounds: Option<(i32, i32)>,
    pub wm_capabilities: Vec<u32>,
}

/// Counters exposed for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakeStats {
    pub configures_acked: u64,
    pub buffer_commits: u64,
    pub pongs_sent: u64,
    pub buffer_releases: u64,
}

#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
    stats: HandshakeStats,
    last_acked_serial: Option<u32>,
    hints: ToplevelHints,
    /// Buffer is attached and not yet released by the compositor
    buffer_busy: bool,
    /// Objects created so far, destroyed in teardown
    owned: Vec<ProtocolObject>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Disconnected,
            stats: HandshakeStats::default(),
            last_acked_serial: None,
            hints: ToplevelHints::default(),
            buffer_busy: false,
            owned: Vec::new(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn stats(&self) -> HandshakeStats {
        self.stats
    }

    pub fn last_acked_serial(&self) -> Option<u32> {
        self.last_acked_serial
    }

    pub fn hints(&self) -> &ToplevelHints {
        &self.hints
    }

    pub fn buffer_busy(&self) -> bool {
        self.buffer_busy
    }

    /// Connection is open and the registry listener registered
    pub fn begin_discovery(&mut self) -> Result<()> {
        self.expect(HandshakeState::Disconnected, HandshakeState::Discovering)?;
        self.transition(HandshakeState::Discovering);
        Ok(())
    }

    /// Round-trip done, globals bound, buffer created
    pub fn buffers_ready(&mut self) -> Result<()> {
        self.expect(HandshakeState::Discovering, HandshakeState::BuffersReady)?;
        self.owned.extend([
            ProtocolObject::Shm,
            ProtocolObject::Compositor,
            ProtocolObject::ShellBase,
            ProtocolObject::Buffer,
        ]);
        self.transition(HandshakeState::BuffersReady);
        Ok(())
    }

    /// Surface, shell surface and toplevel exist with listeners attached
    ///
    /// Issues the empty initial commit that prompts the first configure.
    pub fn surface_created<S: RequestSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        self.expect(HandshakeState::BuffersReady, HandshakeState::SurfaceCreated)?;
        self.owned.extend([
            ProtocolObject::Surface,
            ProtocolObject::ShellSurface,
            ProtocolObject::Toplevel,
        ]);
        self.transition(HandshakeState::SurfaceCreated);

        sink.send(Request::Commit);
        self.transition(HandshakeState::AwaitingConfigure);
        Ok(())
    }

    /// `xdg_wm_base.ping`: answer immediately with the same serial
    pub fn on_ping<S: RequestSink + ?Sized>(&mut self, serial: u32, sink: &mut S) {
        if self.state == HandshakeState::Terminated {
            debug!("Ping {} after teardown ignored", serial);
            return;
        }
        trace!("Ping {} -> pong", serial);
        sink.send(Request::Pong(serial));
        self.stats.pongs_sent += 1;
    }

    /// `xdg_surface.configure`: ack, attach, commit
    ///
    /// Returns whether the configure was answered.
    pub fn on_configure<S: RequestSink + ?Sized>(&mut self, serial: u32, sink: &mut S) -> bool {
        match self.state {
            HandshakeState::AwaitingConfigure | HandshakeState::Configured => {}
            HandshakeState::Closing | HandshakeState::Terminated => {
                debug!("Configure {} while {:?} ignored", serial, self.state);
                return false;
            }
            other => {
                warn!("⚠️ Configure {} before the surface exists ({:?})", serial, other);
                return false;
            }
        }

        sink.send(Request::AckConfigure(serial));
        self.last_acked_serial = Some(serial);
        self.stats.configures_acked += 1;

        sink.send(Request::Attach { x: 0, y: 0 });
        sink.send(Request::Commit);
        self.stats.buffer_commits += 1;
        self.buffer_busy = true;

        if self.state == HandshakeState::AwaitingConfigure {
            info!("🪟 First configure acked (serial {}), window mapped", serial);
            self.transition(HandshakeState::Configured);
        } else {
            debug!("Configure {} acked and buffer recommitted", serial);
        }
        true
    }

    /// `xdg_toplevel.configure`
    pub fn on_toplevel_configure(&mut self, width: i32, height: i32, states: Vec<u32>) {
        debug!("Toplevel configure {}x{} states {:?}", width, height, states);
        self.hints.width = width;
        self.hints.height = height;
        self.hints.states = states;
    }

    /// `xdg_toplevel.configure_bounds`
    pub fn on_configure_bounds(&mut self, width: i32, height: i32) {
        debug!("Toplevel bounds {}x{}", width, height);
        self.hints.bounds = Some((width, height));
    }

    /// `xdg_toplevel.wm_capabilities`
    pub fn on_wm_capabilities(&mut self, capabilities: Vec<u32>) {
        debug!("Window manager capabilities {:?}", capabilities);
        self.hints.wm_capabilities = capabilities;
    }

    /// `wl_buffer.release`: the compositor stopped reading the buffer
    pub fn on_buffer_release(&mut self) {
        trace!("Buffer released by compositor");
        self.buffer_busy = false;
        self.stats.buffer_releases += 1;
    }

    /// Enters Closing; returns false if already closing or terminated
    pub fn begin_closing(&mut self, reason: &str) -> bool {
        match self.state {
            HandshakeState::Closing | HandshakeState::Terminated => false,
            _ => {
                info!("👋 Closing: {}", reason);
                self.transition(HandshakeState::Closing);
                true
            }
        }
    }

    /// Destroys every owned object child-first, then disconnects
    ///
    /// Calling it again after termination issues nothing.
    pub fn teardown<S: RequestSink + ?Sized>(&mut self, sink: &mut S) {
        if self.state == HandshakeState::Terminated {
            return;
        }
        let connected = self.state != HandshakeState::Disconnected;
        self.begin_closing("teardown");

        for object in ProtocolObject::TEARDOWN_ORDER {
            if self.owned.contains(&object) {
                sink.send(Request::Destroy(object));
            }
        }
        self.owned.clear();

        if connected {
            sink.send(Request::Disconnect);
        }
        self.transition(HandshakeState::Terminated);
        info!("✅ Teardown complete");
    }

    fn expect(&self, from: HandshakeState, to: HandshakeState) -> Result<()> {
        if self.state != from {
            return Err(ClientError::Handshake { from: self.state, to });
        }
        Ok(())
    }

    fn transition(&mut self, new_state: HandshakeState) {
        if self.state != new_state {
            debug!("Handshake state transition: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{MockRequestSink, RequestLog};
    use mockall::predicate::eq;

    fn configured_handshake(log: &mut RequestLog) -> Handshake {
        let mut handshake = Handshake::new();
        handshake.begin_discovery().unwrap();
        handshake.buffers_ready().unwrap();
        handshake.surface_created(log).unwrap();
        handshake
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut log = RequestLog::new();
        let mut handshake = Handshake::new();
        assert_eq!(handshake.state(), HandshakeState::Disconnected);

        handshake.begin_discovery().unwrap();
        assert_eq!(handshake.state(), HandshakeState::Discovering);

        handshake.buffers_ready().unwrap();
        assert_eq!(handshake.state(), HandshakeState::BuffersReady);

        handshake.surface_created(&mut log).unwrap();
        assert_eq!(handshake.state(), HandshakeState::AwaitingConfigure);
        assert_eq!(log.requests(), &[Request::Commit]);

        assert!(handshake.on_configure(10, &mut log));
        assert_eq!(handshake.state(), HandshakeState::Configured);
    }

    #[test]
    fn test_out_of_order_transition_is_rejected() {
        let mut handshake = Handshake::new();
        let err = handshake.buffers_ready().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Handshake {
                from: HandshakeState::Disconnected,
                to: HandshakeState::BuffersReady
            }
        ));
    }

    #[test]
    fn test_initial_commit_carries_no_buffer() {
        let mut log = RequestLog::new();
        let _handshake = configured_handshake(&mut log);
        assert!(log.position(|r| matches!(r, Request::Attach { .. })).is_none());
    }

    #[test]
    fn test_configure_acks_before_attach_and_commit() {
        let mut log = RequestLog::new();
        let mut handshake = configured_handshake(&mut log);
        log.clear();

        handshake.on_configure(77, &mut log);
        assert_eq!(
            log.requests(),
            &[Request::AckConfigure(77), Request::Attach { x: 0, y: 0 }, Request::Commit]
        );
        assert_eq!(handshake.last_acked_serial(), Some(77));
        assert!(handshake.buffer_busy());
    }

    #[test]
    fn test_every_configure_is_acked() {
        let mut log = RequestLog::new();
        let mut handshake = configured_handshake(&mut log);
        log.clear();

        let serials = [3u32, 9, 9, 120, u32::MAX];
        for serial in serials {
            handshake.on_configure(serial, &mut log);
        }

        assert_eq!(log.count(|r| matches!(r, Request::AckConfigure(_))), serials.len());
        for (chunk, serial) in log.requests().chunks(3).zip(serials) {
            assert_eq!(chunk[0], Request::AckConfigure(serial));
            assert_eq!(chunk[1], Request::Attach { x: 0, y: 0 });
            assert_eq!(chunk[2], Request::Commit);
        }
        assert_eq!(handshake.stats().configures_acked, 5);
        assert_eq!(handshake.stats().buffer_commits, 5);
    }

    #[test]
    fn test_configure_after_close_is_ignored() {
        let mut log = RequestLog::new();
        let mut handshake = configured_handshake(&mut log);
        handshake.begin_closing("close event");
        log.clear();

        assert!(!handshake.on_configure(5, &mut log));
        assert!(log.requests().is_empty());
    }

    #[test]
    fn test_ping_only_pongs() {
        let mut sink = MockRequestSink::new();
        sink.expect_send()
            .with(eq(Request::Pong(0xDEAD_BEEF)))
            .times(1)
            .return_const(());

        let mut handshake = Handshake::new();
        handshake.on_ping(0xDEAD_BEEF, &mut sink);
        assert_eq!(handshake.state(), HandshakeState::Disconnected);
        assert_eq!(handshake.stats().pongs_sent, 1);
    }

    #[test]
    fn test_toplevel_hints_are_bookkeeping_only() {
        let mut log = RequestLog::new();
        let mut handshake = configured_handshake(&mut log);
        log.clear();

        handshake.on_toplevel_configure(800, 600, vec![4]);
        handshake.on_configure_bounds(1920, 1080);
        handshake.on_wm_capabilities(vec![1, 3]);

        assert!(log.requests().is_empty());
        assert_eq!(handshake.hints().width, 800);
        assert_eq!(handshake.hints().states, vec![4]);
        assert_eq!(handshake.hints().bounds, Some((1920, 1080)));
        assert_eq!(handshake.hints().wm_capabilities, vec![1, 3]);
    }

    #[test]
    fn test_buffer_release_clears_busy() {
        let mut log = RequestLog::new();
        let mut handshake = configured_handshake(&mut log);
        handshake.on_configure(1, &mut log);
        handshake.on_buffer_release();
        assert!(!handshake.buffer_busy());
        assert_eq!(handshake.stats().buffer_releases, 1);
    }

    #[test]
    fn test_teardown_order() {
        let mut log = RequestLog::new();
        let mut handshake = configured_handshake(&mut log);
        handshake.on_configure(1, &mut log);
        handshake.begin_closing("close event");
        log.clear();

        handshake.teardown(&mut log);
        assert_eq!(log.destroyed(), ProtocolObject::TEARDOWN_ORDER.to_vec());
        assert_eq!(log.requests().last(), Some(&Request::Disconnect));
        assert_eq!(handshake.state(), HandshakeState::Terminated);

        log.clear();
        handshake.teardown(&mut log);
        assert!(log.requests().is_empty());
    }

    #[test]
    fn test_teardown_before_surface_only_releases_globals() {
        let mut log = RequestLog::new();
        let mut handshake = Handshake::new();
        handshake.begin_discovery().unwrap();
        handshake.buffers_ready().unwrap();

        handshake.teardown(&mut log);
        assert_eq!(
            log.destroyed(),
            vec![
                ProtocolObject::Buffer,
                ProtocolObject::ShellBase,
                ProtocolObject::Compositor,
                ProtocolObject::Shm
            ]
        );
        assert_eq!(log.requests().last(), Some(&Request::Disconnect));
    }
}
