//! Global discovery and binding
//!
//! The compositor advertises its globals once each during the initial
//! round-trip. Only three are interesting to this client; everything else
//! is ignored. Binding itself is delegated to a [`GlobalBinder`] so the
//! selection logic stays independent of the transport.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::error::{ClientError, Result};

/// The globals this client cannot run without
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredGlobal {
    /// `wl_shm`: shared-memory pool factory
    Shm,
    /// `wl_compositor`: surface factory
    Compositor,
    /// `xdg_wm_base`: window-manager shell base
    WmBase,
}

impl RequiredGlobal {
    pub const ALL: [RequiredGlobal; 3] =
        [RequiredGlobal::Shm, RequiredGlobal::Compositor, RequiredGlobal::WmBase];

    pub fn interface(self) -> &'static str {
        match self {
            RequiredGlobal::Shm => "wl_shm",
            RequiredGlobal::Compositor => "wl_compositor",
            RequiredGlobal::WmBase => "xdg_wm_base",
        }
    }

    /// Highest version of the interface this client implements
    pub fn max_version(self) -> u32 {
        match self {
            RequiredGlobal::Shm => 1,
            RequiredGlobal::Compositor => 4,
            RequiredGlobal::WmBase => 5,
        }
    }

    pub fn from_interface(interface: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.interface() == interface)
    }

    /// Version to bind given what the compositor advertised
    pub fn negotiate(self, advertised: u32) -> u32 {
        advertised.min(self.max_version())
    }
}

/// One `wl_registry.global` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalAdvertisement {
    pub name: u32,
    pub interface: String,
    pub version: u32,
}

/// Creates client-side proxies for advertised globals
pub trait GlobalBinder {
    type Shm;
    type Compositor;
    type WmBase;

    fn bind_shm(&mut self, name: u32, version: u32) -> Self::Shm;
    fn bind_compositor(&mut self, name: u32, version: u32) -> Self::Compositor;
    fn bind_wm_base(&mut self, name: u32, version: u32) -> Self::WmBase;
}

/// Bindings collected while the discovery round-trip is in flight
#[derive(Debug)]
pub struct RegistryBindings<S, C, W> {
    shm: Option<S>,
    compositor: Option<C>,
    wm_base: Option<W>,
    /// registry name -> (global, bound version)
    bound_names: HashMap<u32, (RequiredGlobal, u32)>,
    seen: usize,
}

impl<S, C, W> Default for RegistryBindings<S, C, W> {
    fn default() -> Self {
        Self {
            shm: None,
            compositor: None,
            wm_base: None,
            bound_names: HashMap::new(),
            seen: 0,
        }
    }
}

impl<S, C, W> RegistryBindings<S, C, W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a global advertisement, binding it when it is required
    ///
    /// Returns the global that was bound, if any.
    pub fn on_global<B>(&mut self, advert: &GlobalAdvertisement, binder: &mut B) -> Option<RequiredGlobal>
    where
        B: GlobalBinder<Shm = S, Compositor = C, WmBase = W>,
    {
        self.seen += 1;
        debug!(
            "Registry global {} v{} (name {})",
            advert.interface, advert.version, advert.name
        );

        let global = RequiredGlobal::from_interface(&advert.interface)?;
        if self.is_bound(global) {
            warn!(
                "⚠️ Duplicate {} advertised (name {}), keeping the first binding",
                advert.interface, advert.name
            );
            return None;
        }

        let version = global.negotiate(advert.version);
        match global {
            RequiredGlobal::Shm => self.shm = Some(binder.bind_shm(advert.name, version)),
            RequiredGlobal::Compositor => {
                self.compositor = Some(binder.bind_compositor(advert.name, version))
            }
            RequiredGlobal::WmBase => self.wm_base = Some(binder.bind_wm_base(advert.name, version)),
        }
        self.bound_names.insert(advert.name, (global, version));

        info!("🔗 Bound {} v{} (advertised v{})", global.interface(), version, advert.version);
        Some(global)
    }

    /// Handles `wl_registry.global_remove`; hot-unplug is not supported
    pub fn on_global_remove(&mut self, name: u32) -> Option<RequiredGlobal> {
        match self.bound_names.get(&name) {
            Some(&(global, _)) => {
                warn!("⚠️ Compositor removed bound global {} (name {})", global.interface(), name);
                Some(global)
            }
            None => {
                debug!("Registry global {} removed", name);
                None
            }
        }
    }

    pub fn is_bound(&self, global: RequiredGlobal) -> bool {
        match global {
            RequiredGlobal::Shm => self.shm.is_some(),
            RequiredGlobal::Compositor => self.compositor.is_some(),
            RequiredGlobal::WmBase => self.wm_base.is_some(),
        }
    }

    /// Version a global was bound at
    pub fn bound_version(&self, global: RequiredGlobal) -> Option<u32> {
        self.bound_names
            .values()
            .find(|(g, _)| *g == global)
            .map(|&(_, version)| version)
    }

    /// Number of advertisements seen so far
    pub fn advertised_count(&self) -> usize {
        self.seen
    }

    /// Checks the bindings once the round-trip has returned
    ///
    /// Fails with the first required global that was never advertised.
    pub fn complete(&self) -> Result<BoundGlobals<S, C, W>>
    where
        S: Clone,
        C: Clone,
        W: Clone,
    {
        match (&self.shm, &self.compositor, &self.wm_base) {
            (Some(shm), Some(compositor), Some(wm_base)) => Ok(BoundGlobals {
                shm: shm.clone(),
                compositor: compositor.clone(),
                wm_base: wm_base.clone(),
            }),
            (None, _, _) => Err(ClientError::MissingCapability(RequiredGlobal::Shm)),
            (_, None, _) => Err(ClientError::MissingCapability(RequiredGlobal::Compositor)),
            (_, _, None) => Err(ClientError::MissingCapability(RequiredGlobal::WmBase)),
        }
    }
}

/// All three required globals, guaranteed present
#[derive(Debug)]
pub struct BoundGlobals<S, C, W> {
    pub shm: S,
    pub compositor: C,
    pub wm_base: W,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Records what was bound, handing back (name, version) as the "proxy"
    #[derive(Default)]
    struct FakeBinder {
        calls: Vec<(RequiredGlobal, u32, u32)>,
    }

    impl GlobalBinder for FakeBinder {
        type Shm = (u32, u32);
        type Compositor = (u32, u32);
        type WmBase = (u32, u32);

        fn bind_shm(&mut self, name: u32, version: u32) -> (u32, u32) {
            self.calls.push((RequiredGlobal::Shm, name, version));
            (name, version)
        }

        fn bind_compositor(&mut self, name: u32, version: u32) -> (u32, u32) {
            self.calls.push((RequiredGlobal::Compositor, name, version));
            (name, version)
        }

        fn bind_wm_base(&mut self, name: u32, version: u32) -> (u32, u32) {
            self.calls.push((RequiredGlobal::WmBase, name, version));
            (name, version)
        }
    }

    type Bindings = RegistryBindings<(u32, u32), (u32, u32), (u32, u32)>;

    fn advert(name: u32, interface: &str, version: u32) -> GlobalAdvertisement {
        GlobalAdvertisement { name, interface: interface.to_string(), version }
    }

    #[test]
    fn test_typical_compositor_globals() {
        let mut bindings = Bindings::new();
        let mut binder = FakeBinder::default();

        for ad in [
            advert(1, "wl_compositor", 6),
            advert(2, "wl_subcompositor", 1),
            advert(3, "wl_shm", 1),
            advert(4, "wl_seat", 9),
            advert(5, "xdg_wm_base", 6),
            advert(6, "wl_output", 4),
        ] {
            bindings.on_global(&ad, &mut binder);
        }

        assert_eq!(bindings.advertised_count(), 6);
        assert_eq!(binder.calls.len(), 3);
        assert_eq!(bindings.bound_version(RequiredGlobal::Compositor), Some(4));
        assert_eq!(bindings.bound_version(RequiredGlobal::WmBase), Some(5));

        let globals = bindings.complete().unwrap();
        assert_eq!(globals.shm, (3, 1));
        assert_eq!(globals.compositor, (1, 4));
        assert_eq!(globals.wm_base, (5, 5));
    }

    #[test]
    fn test_older_advertised_version_is_kept() {
        let mut bindings = Bindings::new();
        let mut binder = FakeBinder::default();
        bindings.on_global(&advert(9, "xdg_wm_base", 2), &mut binder);
        assert_eq!(binder.calls, vec![(RequiredGlobal::WmBase, 9, 2)]);
    }

    #[test]
    fn test_missing_wm_base_fails() {
        let mut bindings = Bindings::new();
        let mut binder = FakeBinder::default();
        bindings.on_global(&advert(1, "wl_compositor", 4), &mut binder);
        bindings.on_global(&advert(2, "wl_shm", 1), &mut binder);

        let err = bindings.complete().unwrap_err();
        assert!(matches!(err, ClientError::MissingCapability(RequiredGlobal::WmBase)));
    }

    #[test]
    fn test_nothing_advertised_reports_shm_first() {
        let err = Bindings::new().complete().unwrap_err();
        assert!(matches!(err, ClientError::MissingCapability(RequiredGlobal::Shm)));
    }

    #[test]
    fn test_duplicate_global_keeps_first() {
        let mut bindings = Bindings::new();
        let mut binder = FakeBinder::default();
        assert_eq!(bindings.on_global(&advert(3, "wl_shm", 1), &mut binder), Some(RequiredGlobal::Shm));
        assert_eq!(bindings.on_global(&advert(7, "wl_shm", 1), &mut binder), None);
        assert_eq!(binder.calls.len(), 1);
    }

    #[test]
    fn test_global_remove() {
        let mut bindings = Bindings::new();
        let mut binder = FakeBinder::default();
        bindings.on_global(&advert(3, "wl_shm", 1), &mut binder);

        assert_eq!(bindings.on_global_remove(3), Some(RequiredGlobal::Shm));
        assert_eq!(bindings.on_global_remove(42), None);
        // Removal does not unbind
        assert!(bindings.is_bound(RequiredGlobal::Shm));
    }

    proptest! {
        #[test]
        fn prop_bound_iff_required(
            interface in prop_oneof![
                Just("wl_shm".to_string()),
                Just("wl_compositor".to_string()),
                Just("xdg_wm_base".to_string()),
                "[a-z_]{1,24}",
            ],
            name in any::<u32>(),
            version in 1u32..16,
        ) {
            let mut bindings = Bindings::new();
            let mut binder = FakeBinder::default();
            let bound = bindings.on_global(&advert(name, &interface, version), &mut binder);

            let required = RequiredGlobal::from_interface(&interface);
            prop_assert_eq!(bound, required);
            prop_assert_eq!(binder.calls.len(), usize::from(required.is_some()));
            if let Some(global) = required {
                prop_assert!(binder.calls[0].2 <= global.max_version());
                prop_assert!(binder.calls[0].2 <= version);
            }
        }
    }
}
