//! Blocking event dispatch loop
//!
//! The only long-lived suspension point of the client: block until at
//! least one event is queued, dispatch everything pending, re-check the run
//! flag. A dispatch error ends the loop with [`ClientError::Transport`].

use log::{debug, error, info};
use wayland_client::EventQueue;

use crate::error::{ClientError, Result};
use crate::events::RunState;

/// Source of protocol events that can block until one arrives
pub trait EventPump<S> {
    /// Blocks for events and dispatches them into `state`
    ///
    /// Returns the number of events dispatched.
    fn dispatch_blocking(&mut self, state: &mut S) -> Result<usize>;
}

impl<S: 'static> EventPump<S> for EventQueue<S> {
    fn dispatch_blocking(&mut self, state: &mut S) -> Result<usize> {
        self.blocking_dispatch(state)
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub events: u64,
}

/// Dispatches until `state` stops running or the transport fails
pub fn run_until_closed<S, P>(state: &mut S, pump: &mut P) -> Result<LoopStats>
where
    S: RunState,
    P: EventPump<S>,
{
    let mut stats = LoopStats::default();
    info!("🔄 Entering event loop");

    while state.is_running() {
        match pump.dispatch_blocking(state) {
            Ok(count) => {
                stats.iterations += 1;
                stats.events += count as u64;
                debug!("Dispatched {} events (iteration {})", count, stats.iterations);
            }
            Err(e) => {
                error!("❌ Event dispatch failed: {}", e);
                state.transport_failed(&e.to_string());
                return Err(e);
            }
        }
    }

    info!(
        "Event loop finished after {} iterations ({} events)",
        stats.iterations, stats.events
    );
    Ok(stats)
}
