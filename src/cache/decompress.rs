//! bzip2 decompression of downloaded indexes

use super::staging::StagingFile;
use crate::error::{RepoCacheError, RepoCacheResult};
use bzip2::read::MultiBzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use tracing::{info, warn};

/// Size of each decoded block
pub const BLOCK_SIZE: usize = 16 * 1024;

const BZIP2_MAGIC: &[u8] = b"BZh";

/// Decompress a bzip2 staging file into a new staging file.
///
/// Returns `(false, staged)` with the original file untouched when it cannot
/// be opened or does not start with a readable bzip2 stream. Read errors after
/// the first block are fatal rather than producing a truncated index.
pub fn decompress(staged: StagingFile) -> RepoCacheResult<(bool, StagingFile)> {
    info!("Decompressing metadata from {}", staged.path().display());

    let source = match File::open(staged.path()) {
        Ok(file) => file,
        Err(e) => {
            warn!("Could not open {}: {}", staged.path().display(), e);
            return Ok((false, staged));
        }
    };

    let mut reader = BufReader::with_capacity(BLOCK_SIZE, source);
    let has_magic = reader
        .fill_buf()
        .map(|buf| buf.starts_with(BZIP2_MAGIC))
        .unwrap_or(false);
    if !has_magic {
        warn!("Could not decompress {}: not a bzip2 stream", staged.path().display());
        return Ok((false, staged));
    }

    // Concatenated streams (pbzip2 output) decode as one payload
    let mut decoder = MultiBzDecoder::new(reader);
    let mut block = vec![0u8; BLOCK_SIZE];
    let mut size = match decoder.read(&mut block) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not decompress {}: {}", staged.path().display(), e);
            return Ok((false, staged));
        }
    };

    let decoded = StagingFile::new().map_err(|e| RepoCacheError::io("creating staging file", e))?;
    let mut out = BufWriter::new(decoded.as_file());
    let mut total = 0u64;

    while size > 0 {
        out.write_all(&block[..size])
            .map_err(|e| RepoCacheError::io("writing decompressed index", e))?;
        total += size as u64;

        size = decoder.read(&mut block).map_err(|e| RepoCacheError::Decompress {
            path: staged.path().to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    out.flush()
        .map_err(|e| RepoCacheError::io("writing decompressed index", e))?;
    drop(out);

    info!(
        "Decompressed {} bytes into {}",
        total,
        decoded.path().display()
    );
    Ok((true, decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::fs;

    fn staged_with(bytes: &[u8]) -> StagingFile {
        let staged = StagingFile::new().unwrap();
        fs::write(staged.path(), bytes).unwrap();
        staged
    }

    fn compress(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decompresses_multiple_blocks() {
        let payload = format!(r#"{{"packages":"{}"}}"#, "abc".repeat(BLOCK_SIZE));
        let staged = staged_with(&compress(payload.as_bytes()));
        let source = staged.path().to_path_buf();

        let (ok, decoded) = decompress(staged).unwrap();

        assert!(ok);
        assert_ne!(decoded.path(), source.as_path());
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(decoded.path()).unwrap(), payload);
    }

    #[test]
    fn decodes_concatenated_streams() {
        let mut bytes = compress(br#"{"packages":{"a":1,"#);
        bytes.extend(compress(br#""b":2}}"#));
        let staged = staged_with(&bytes);

        let (ok, decoded) = decompress(staged).unwrap();

        assert!(ok);
        assert_eq!(
            fs::read_to_string(decoded.path()).unwrap(),
            r#"{"packages":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn truncated_tail_is_fatal() {
        // Several 100k bzip2 blocks so the first block decodes before the cut
        let payload: String = (0..200_000).map(|i| format!("\"p{}\":{},", i, i * 7)).collect();
        let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(payload.as_bytes()).unwrap();
        let mut bytes = encoder.finish().unwrap();
        bytes.truncate(bytes.len() * 3 / 4);
        let staged = staged_with(&bytes);

        let err = decompress(staged).unwrap_err();

        assert!(matches!(err, RepoCacheError::Decompress { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn garbage_keeps_original_bytes() {
        let staged = staged_with(b"definitely not bzip2");
        let source = staged.path().to_path_buf();

        let (ok, kept) = decompress(staged).unwrap();

        assert!(!ok);
        assert_eq!(kept.path(), source.as_path());
        assert_eq!(fs::read(kept.path()).unwrap(), b"definitely not bzip2");
    }

    #[test]
    fn corrupt_header_is_not_fatal() {
        let staged = staged_with(b"BZh9 this is not a valid block header");
        let (ok, kept) = decompress(staged).unwrap();
        assert!(!ok);
        assert!(fs::read(kept.path()).unwrap().starts_with(b"BZh9"));
    }
}
