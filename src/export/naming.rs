//! Export file naming
//!
//! Pure naming rule shared by the single-file download and the bulk
//! archive: a record downloads as its sanitized extracted code, or as a
//! `no-encontrado_` fallback when there is no usable code.

use crate::images::{ImageRecord, ProcessingStatus};

/// Compute the download name for a record
///
/// Rule: records that are not `success`, have no extracted code, or whose
/// sanitized code is the not-found fallback, are named
/// `no-encontrado_<first 8 chars of id>`. Everything else is named after the
/// code itself, lower-cased with every non-alphanumeric character replaced
/// by `_`. The original file extension is kept, defaulting to `jpg`.
pub fn export_file_name(record: &ImageRecord) -> String {
    let extension = record
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("jpg");

    let base = usable_code(record)
        .unwrap_or_else(|| format!("no-encontrado_{}", short_id(record)));

    format!("{}.{}", base, extension)
}

fn usable_code(record: &ImageRecord) -> Option<String> {
    if record.status != ProcessingStatus::Success {
        return None;
    }
    let code = record.extracted_code.as_deref()?;
    if code.trim().is_empty() {
        return None;
    }
    let sanitized = sanitize(code);
    if sanitized == "no_encontrado" {
        return None;
    }
    Some(sanitized)
}

fn sanitize(code: &str) -> String {
    code.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn short_id(record: &ImageRecord) -> String {
    record.id.to_string().chars().take(8).collect()
}
