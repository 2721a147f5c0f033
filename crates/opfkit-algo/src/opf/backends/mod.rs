//! Built-in OPF solver backends.
//!
//! Each backend wraps an existing solver and exposes it through
//! the `OpfBackend` trait.

mod clarabel;

pub use clarabel::ClarabelBackend;

use super::traits::OpfBackend;

/// Backend registered under `id`, if any.
pub fn backend_by_id(id: &str) -> Option<Box<dyn OpfBackend>> {
    match id {
        "clarabel" => Some(Box::new(ClarabelBackend)),
        _ => None,
    }
}

/// Identifiers accepted by [`backend_by_id`].
pub fn available_backends() -> &'static [&'static str] {
    &["clarabel"]
}
