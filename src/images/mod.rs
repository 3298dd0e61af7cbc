//! Image records
//!
//! An image record is the unit of work: one uploaded photo, its processing
//! status and, once processed, the extracted serial code. Records live in two
//! places that are kept consistent:
//!
//! - the in-memory [`ImageRegistry`], the source of truth for the API surface
//! - the SQLite [`ImageStore`], a durable mirror reloaded at startup

mod registry;
mod store;
mod types;

pub use registry::{ImageRegistry, StatusCounts};
pub use store::ImageStore;
pub use types::{CodeOutcome, ImageRecord, ProcessingStatus, NOT_FOUND_CODE};
