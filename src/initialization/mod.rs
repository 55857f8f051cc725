//! Application initialization.
//!
//! Logger setup lives here; the heavier resources (lookup cache, geo
//! database, bulk client) are opened by `Pipeline::from_config`, which
//! keeps their failure modes on the typed [`crate::error_handling`]
//! surface.

mod logger;

pub use logger::init_logger_with;
