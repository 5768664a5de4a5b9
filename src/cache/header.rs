//! Revalidation headers embedded at the head of a cached index
//!
//! A JSON cache file starts with exactly four string keys, in this order:
//!
//! ```text
//! {"_url": "https://conda.anaconda.org/conda-forge/linux-64/repodata.json",
//!  "_etag": "W/\"6092e6a2b6cec6ea5aade4e177c3edda-8\"",
//!  "_mod": "Sat, 04 Apr 2020 03:29:49 GMT",
//!  "_cache_control": "public, max-age=1200",
//!  ...the repository index itself...}
//! ```
//!
//! Indexes can run to hundreds of megabytes, so the headers are recovered by
//! scanning only the leading bytes, and new headers are written by splicing
//! them in front of the downloaded payload instead of re-serializing it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Keys of the embedded headers, in the order they must appear
pub const HEADER_KEYS: [&str; 4] = ["_url", "_etag", "_mod", "_cache_control"];

/// Each key/value pair contributes an opening and closing quote for both the
/// key and the value.
const HEADER_QUOTES: usize = HEADER_KEYS.len() * 4;

/// Revalidation metadata stored at the head of a JSON cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMetadata {
    /// URL the index was fetched from
    #[serde(rename = "_url")]
    pub url: String,

    /// `ETag` response header
    #[serde(rename = "_etag")]
    pub etag: String,

    /// `Last-Modified` response header
    #[serde(rename = "_mod")]
    pub last_modified: String,

    /// `Cache-Control` response header
    #[serde(rename = "_cache_control")]
    pub cache_control: String,
}

/// Read the embedded headers from the head of a JSON cache file.
///
/// Returns `None` when the file cannot be read, ends before the four headers
/// are complete, or does not start with exactly the expected keys.
pub fn read_header(path: &Path) -> Option<HeaderMetadata> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Could not open {}: {}", path.display(), e);
            return None;
        }
    };

    let Some(head) = scan_header(BufReader::new(file)) else {
        warn!("Could not find mod / etag header in {}", path.display());
        return None;
    };

    let header = parse_header(&head);
    if header.is_none() {
        warn!("Could not parse mod / etag header in {}", path.display());
    }
    header
}

/// Collect bytes up to the closing quote of the fourth header value and close
/// the object, yielding a standalone JSON document.
fn scan_header<R: Read>(reader: R) -> Option<Vec<u8>> {
    let mut head = Vec::new();
    let mut escaped = false;
    let mut quotes = 0;

    for byte in reader.bytes() {
        let byte = byte.ok()?;
        head.push(byte);

        if escaped {
            escaped = false;
            continue;
        }

        match byte {
            b'\\' => escaped = true,
            b'"' => {
                quotes += 1;
                if quotes == HEADER_QUOTES {
                    head.push(b'}');
                    return Some(head);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_header(head: &[u8]) -> Option<HeaderMetadata> {
    let object: Map<String, Value> = serde_json::from_slice(head).ok()?;

    if !object.keys().map(String::as_str).eq(HEADER_KEYS) {
        debug!(
            "Unexpected cache header keys: {:?}",
            object.keys().collect::<Vec<_>>()
        );
        return None;
    }

    serde_json::from_value(Value::Object(object)).ok()
}

/// Write `header` followed by the members of the JSON object in `payload`.
///
/// The payload's leading byte (its opening `{`) is skipped and the remainder
/// copied verbatim, so the result is a single object whose first keys are the
/// headers. Returns the number of payload bytes copied.
pub fn write_spliced<R: BufRead, W: Write>(
    header: &HeaderMetadata,
    mut payload: R,
    out: &mut W,
) -> io::Result<u64> {
    let mut prefix = serde_json::to_vec(header).map_err(io::Error::other)?;

    let mut first = [0u8; 1];
    payload.read_exact(&mut first)?;
    skip_whitespace(&mut payload)?;

    let empty_object = payload.fill_buf()?.first() == Some(&b'}');
    if empty_object {
        payload.consume(1);
    } else {
        // replace `}` with `,`
        prefix.pop();
        prefix.push(b',');
    }

    out.write_all(&prefix)?;
    let copied = io::copy(&mut payload, out)?;
    out.flush()?;
    Ok(copied)
}

fn skip_whitespace<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(());
        }
        let n = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let done = n < buf.len();
        reader.consume(n);
        if done {
            return Ok(());
        }
    }
}
