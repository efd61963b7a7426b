//! Which backends this build can profile.
//!
//! Availability is decided once per process. Registration consults the
//! flags instead of trying a backend and recovering from the failure.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::frame::BackendKind;

/// Backend availability for the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendAvailability {
    pub cluster: bool,
    pub lazy: bool,
}

impl BackendAvailability {
    fn probe() -> Self {
        let availability = Self {
            cluster: cfg!(feature = "cluster"),
            lazy: cfg!(feature = "lazy"),
        };
        tracing::debug!(
            cluster = availability.cluster,
            lazy = availability.lazy,
            "probed backend availability"
        );
        availability
    }
}

static AVAILABILITY: Lazy<BackendAvailability> = Lazy::new(BackendAvailability::probe);

/// Returns the cached availability flags.
pub fn availability() -> BackendAvailability {
    *AVAILABILITY
}

/// Returns true if `backend` can be profiled by this build.
pub fn is_available(backend: BackendKind) -> bool {
    match backend {
        BackendKind::Memory => true,
        BackendKind::Cluster => AVAILABILITY.cluster,
        BackendKind::Lazy => AVAILABILITY.lazy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_always_available() {
        assert!(is_available(BackendKind::Memory));
    }

    #[test]
    fn test_flags_follow_features() {
        assert_eq!(is_available(BackendKind::Cluster), cfg!(feature = "cluster"));
        assert_eq!(is_available(BackendKind::Lazy), cfg!(feature = "lazy"));
        assert_eq!(availability(), availability());
    }
}
