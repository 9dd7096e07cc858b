//! Database entities for the reference catalog.

pub mod prelude;

pub mod reference_object;
