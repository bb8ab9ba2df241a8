use thiserror::Error;

/// Result code returned by every driver entry point.
///
/// Only [`Status::Success`] and [`Status::Incomplete`] count as success;
/// callers must check against [`Status::is_success`] before consuming any
/// out-value. Drivers encode failures as `Err(status)` with a non-success
/// code, so a well-formed `Ok` always carries a success status implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Status {
    #[error("success")]
    Success,
    /// Enumeration returned fewer entries than exist; still success.
    #[error("incomplete enumeration")]
    Incomplete,

    #[error("out of host memory")]
    ErrorOutOfHostMemory,
    #[error("driver initialization failed")]
    ErrorInitializationFailed,
    #[error("requested layer not present")]
    ErrorLayerNotPresent,
    #[error("requested extension not present")]
    ErrorExtensionNotPresent,
    #[error("requested feature not present")]
    ErrorFeatureNotPresent,
    #[error("incompatible driver")]
    ErrorIncompatibleDriver,
    #[error("device lost")]
    ErrorDeviceLost,
    #[error("surface lost")]
    ErrorSurfaceLost,
    /// A handle passed to the driver does not name a live object.
    #[error("unknown handle")]
    ErrorUnknownHandle,
    /// The call violated the API contract (e.g. destroying a parent object
    /// with live children). A conformant caller never sees this.
    #[error("validation failed")]
    ErrorValidationFailed,
}

impl Status {
    /// The small success set every status check compares against.
    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success | Status::Incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_set_is_exactly_success_and_incomplete() {
        assert!(Status::Success.is_success());
        assert!(Status::Incomplete.is_success());
        for status in [
            Status::ErrorOutOfHostMemory,
            Status::ErrorInitializationFailed,
            Status::ErrorLayerNotPresent,
            Status::ErrorExtensionNotPresent,
            Status::ErrorFeatureNotPresent,
            Status::ErrorIncompatibleDriver,
            Status::ErrorDeviceLost,
            Status::ErrorSurfaceLost,
            Status::ErrorUnknownHandle,
            Status::ErrorValidationFailed,
        ] {
            assert!(!status.is_success(), "{status:?}");
        }
    }
}
