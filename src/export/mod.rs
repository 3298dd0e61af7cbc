//! Export Module
//!
//! Renames processed photos to their extracted codes and packs them into a
//! single downloadable zip. The naming rule lives here, in one place, so the
//! single-file download and the bulk archive always agree.

mod archive;
mod naming;

pub use archive::{build_archive, ARCHIVE_FILE_NAME, ARCHIVE_FOLDER};
pub use naming::export_file_name;
