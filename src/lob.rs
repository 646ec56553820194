//! LOB Materializer: resolves a logical LOB path through the Archive
//! Accessor and appends its bytes as a SQLite hex blob literal (spec §4.H).

use std::fs::File;
use std::io::Read;

use crate::archive::ArchiveAccessor;
use crate::hex;
use crate::logger::Logger;

/// 10 KiB read buffer, matching the spec's buffered-reads requirement.
const READ_BUFFER_SIZE: usize = 10 * 1024;

/// Resolves `lob_uri`, reads it whole, and appends `X'<hex>'` to `out`.
///
/// On resolution or read failure, appends the empty blob literal `X''`,
/// logs a warning, and returns `false` so the caller can bump a failure
/// counter; the row is never aborted over an unreadable LOB.
pub fn materialize(
    accessor: &mut ArchiveAccessor<'_>,
    lob_uri: &str,
    out: &mut String,
    logger: &mut Logger,
) -> bool {
    match read_lob(accessor, lob_uri) {
        Ok(bytes) => {
            out.push_str("X'");
            hex::encode_into(&bytes, out);
            out.push('\'');
            true
        }
        Err(message) => {
            logger.warn(format!("lob {} unreadable: {}", lob_uri, message));
            out.push_str("X''");
            false
        }
    }
}

fn read_lob(accessor: &mut ArchiveAccessor<'_>, lob_uri: &str) -> Result<Vec<u8>, String> {
    let path = accessor.resolve(lob_uri).map_err(|err| err.to_string())?;
    let mut file = File::open(&path).map_err(|err| err.to_string())?;

    let mut bytes = Vec::new();
    let mut chunk = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut chunk).map_err(|err| err.to_string())?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
    }

    accessor.forget_after_use(&path);
    Ok(bytes)
}
