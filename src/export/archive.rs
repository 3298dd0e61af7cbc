//! Zip archive packing

use std::io::{Cursor, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Folder inside the archive holding the renamed photos
pub const ARCHIVE_FOLDER: &str = "luminarias_procesadas";

/// Download name of the archive itself
pub const ARCHIVE_FILE_NAME: &str = "luminarias_procesadas.zip";

/// Pack `(file name, bytes)` pairs into one in-memory zip archive
///
/// Entries land under [`ARCHIVE_FOLDER`]; the caller is responsible for
/// name uniqueness.
pub fn build_archive(entries: &[(String, Vec<u8>)]) -> ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(format!("{}/{}", ARCHIVE_FOLDER, name), options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use zip::ZipArchive;

    #[test]
    fn archive_round_trips_entries() {
        let entries = vec![
            ("08390.jpg".to_string(), b"first image".to_vec()),
            ("12345.png".to_string(), b"second image".to_vec()),
        ];

        let bytes = build_archive(&entries).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = Vec::new();
        archive
            .by_name("luminarias_procesadas/08390.jpg")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"first image");

        content.clear();
        archive
            .by_name("luminarias_procesadas/12345.png")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"second image");
    }

    #[test]
    fn empty_archive_is_still_valid() {
        let bytes = build_archive(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
