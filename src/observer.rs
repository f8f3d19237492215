//! Observer position lookup.

use glam::Vec3;
use parking_lot::Mutex;

/// Source of the observer's world position, polled once per streaming tick.
///
/// The streaming manager cannot be constructed without one; there is no
/// fallback position.
pub trait ObserverSource: Send + Sync {
    fn position(&self) -> Vec3;
}

/// Observer position written by whatever moves the camera and read by the
/// streaming control thread.
#[derive(Default)]
pub struct SharedObserver {
    position: Mutex<Vec3>,
}

impl SharedObserver {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: Mutex::new(position),
        }
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.lock() = position;
    }
}

impl ObserverSource for SharedObserver {
    fn position(&self) -> Vec3 {
        *self.position.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_observer_roundtrip() {
        let observer = SharedObserver::new(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(observer.position(), Vec3::new(1.0, 2.0, 3.0));
        observer.set_position(Vec3::new(-8.0, 0.5, 64.0));
        assert_eq!(observer.position(), Vec3::new(-8.0, 0.5, 64.0));
    }
}
