//! # wlstart
//!
//! A minimal Wayland client: connects to the compositor, binds `wl_shm`,
//! `wl_compositor` and `xdg_wm_base`, paints a shared-memory buffer and
//! shows it in an xdg-shell toplevel until the compositor closes it.
//!
//! ## Architecture
//!
//! - `shm`: anonymous shared memory and scoped mappings
//! - `buffer`: buffer geometry, the checker pattern, `wl_buffer` creation
//! - `registry`: global discovery and binding
//! - `handshake`: surface handshake state machine
//! - `events`: per-object event handler traits and the client context
//! - `wire`: outgoing requests and request sinks
//! - `event_loop`: blocking dispatch loop
//! - `wayland`: `wayland-client` glue
//! - `client`: orchestration
//! - `config`: configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wlstart::{client, ClientConfig, ClientOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default();
//!     let options = ClientOptions::from_config(&config)?;
//!     client::run(&options)?;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod events;
pub mod handshake;
pub mod registry;
pub mod shm;
pub mod wayland;
pub mod wire;

// Re-export main types for easy access
pub use client::{ClientOptions, RunSummary};
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::ClientContext;
pub use handshake::{Handshake, HandshakeState};

/// Version information for wlstart
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
