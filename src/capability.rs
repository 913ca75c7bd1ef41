//! Explicit holder for an external capability (embedding model, keyword extractor).
//!
//! A [`Capability`] is constructed once at startup and shared with every component
//! that needs it. Initialization is attempted at most once; the outcome is cached as
//! [`CapabilityStatus::Available`] or [`CapabilityStatus::Unavailable`]. A failed
//! *call* on an available capability does not change its status.

use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::Result;

type Loader<T> = Box<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// Observable status of a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityStatus {
    /// Not loaded yet.
    Uninitialized,
    Available,
    /// Initialization failed (or the capability was disabled); carries the reason.
    Unavailable(String),
}

enum State<T: ?Sized> {
    Uninitialized(Loader<T>),
    Available(Arc<T>),
    Unavailable(String),
}

pub struct Capability<T: ?Sized> {
    name: &'static str,
    state: Mutex<State<T>>,
}

impl<T: ?Sized> Capability<T> {
    /// A capability that is already initialized.
    pub fn ready(name: &'static str, value: Arc<T>) -> Self {
        Self {
            name,
            state: Mutex::new(State::Available(value)),
        }
    }

    /// A capability that is known to be absent.
    pub fn disabled(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            name,
            state: Mutex::new(State::Unavailable(reason.into())),
        }
    }

    /// A capability initialized by `loader` on first use.
    pub fn lazy<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            name,
            state: Mutex::new(State::Uninitialized(Box::new(loader))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn status(&self) -> CapabilityStatus {
        match &*self.lock() {
            State::Uninitialized(_) => CapabilityStatus::Uninitialized,
            State::Available(_) => CapabilityStatus::Available,
            State::Unavailable(reason) => CapabilityStatus::Unavailable(reason.clone()),
        }
    }

    /// Return the capability, probing the loader if this is the first request.
    ///
    /// `Err` carries the reason the capability is unavailable.
    pub fn get(&self) -> std::result::Result<Arc<T>, String> {
        let mut state = self.lock();
        if let State::Uninitialized(loader) = &*state {
            *state = match loader() {
                Ok(value) => {
                    tracing::info!(capability = self.name, "capability initialized");
                    State::Available(value)
                }
                Err(e) => {
                    tracing::warn!(capability = self.name, error = %format!("{e:#}"), "capability unavailable");
                    State::Unavailable(format!("{e:#}"))
                }
            };
        }
        match &*state {
            State::Available(value) => Ok(Arc::clone(value)),
            State::Unavailable(reason) => Err(reason.clone()),
            State::Uninitialized(_) => unreachable!("loader outcome recorded above"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        // A poisoned lock only means a loader panicked; the state itself is still coherent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: ?Sized> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}
