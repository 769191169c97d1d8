// Integration test: discover globals on the compositor reachable through
// WAYLAND_DISPLAY and create the shared-memory buffer against it.

#![cfg(feature = "live-compositor")]

use anyhow::Result;
use wayland_client::Connection;

use wlstart::buffer::{BufferGeometry, PixelFormat, SharedBuffer};
use wlstart::registry::RequiredGlobal;
use wlstart::wayland::{LiveSink, WaylandApp};
use wlstart::HandshakeState;

#[test]
fn test_live_registry_roundtrip_and_buffer() -> Result<()> {
    let _ = env_logger::try_init();

    let conn = Connection::connect_to_env()?;
    let mut event_queue = conn.new_event_queue::<WaylandApp>();
    let qh = event_queue.handle();
    let mut app = WaylandApp::new(LiveSink::new(conn.clone()));

    app.ctx.begin_discovery()?;
    let _registry = conn.display().get_registry(&qh, ());
    event_queue.roundtrip(&mut app)?;

    for global in RequiredGlobal::ALL {
        assert!(app.registry.is_bound(global), "{} not bound", global.interface());
    }
    let globals = app.registry.complete()?;

    let geometry = BufferGeometry::new(64, 64, PixelFormat::Xrgb8888)?;
    let buffer = SharedBuffer::create(&globals.shm, geometry, &qh)?;
    app.ctx.sink_mut().adopt_globals(&globals);
    app.ctx.sink_mut().adopt_buffer(buffer.buffer.clone());
    app.ctx.buffers_ready()?;

    // Second round-trip: the compositor accepted the pool and buffer
    event_queue.roundtrip(&mut app)?;
    assert!(!app.shm_formats().is_empty());

    app.ctx.teardown();
    assert_eq!(app.ctx.state(), HandshakeState::Terminated);
    Ok(())
}
