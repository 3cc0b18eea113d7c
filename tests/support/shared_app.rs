//! A Bevy `App` that rspec environments can clone and share.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::{App, World};

struct AppCell(App);

// SAFETY: scenarios run serially and every access goes through the mutex in
// `SharedApp`, so the app is never touched from two threads at once.
unsafe impl Send for AppCell {}
unsafe impl Sync for AppCell {}

/// Cloneable handle to one app; clones drive the same world.
#[derive(Clone)]
pub struct SharedApp(Arc<Mutex<AppCell>>);

impl fmt::Debug for SharedApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedApp").finish_non_exhaustive()
    }
}

impl SharedApp {
    pub fn new(app: App) -> Self {
        Self(Arc::new(Mutex::new(AppCell(app))))
    }

    fn lock(&self) -> MutexGuard<'_, AppCell> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one frame.
    pub fn update(&self) {
        self.lock().0.update();
    }

    /// Reads from the world.
    pub fn read<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(self.lock().0.world())
    }

    /// Mutates the world between frames.
    pub fn write<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(self.lock().0.world_mut())
    }
}
