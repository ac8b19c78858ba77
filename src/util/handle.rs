use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, exclusively locked value. Cloning the handle shares the value.
pub struct Handle<T>(Arc<Mutex<T>>);

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Default> Default for Handle<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(T::default())))
    }
}

impl<T> From<T> for Handle<T> {
    fn from(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }
}

impl<T> Handle<T> {
    /// Locks the value. Poisoning is ignored, so critical sections run through
    /// a handle must never leave the value half-updated.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
