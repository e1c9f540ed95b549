//! Macros for building [`crate::error::DistribError`] values.

/// Creates a [`crate::error::DistribError`] from a kind and a static description.
///
/// Optionally takes a dynamic detail (anything implementing `ToString`) and a `source:` error.
#[macro_export]
macro_rules! distrib_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::DistribError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::DistribError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::DistribError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::DistribError::from(($kind, $desc, $detail.to_string()))
            .with_source($source)
    };
}

