use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Read up to `len` bytes of `file` starting at `offset`.
/// Returns fewer bytes only when end of file is reached.
///
/// The buffer is sized to what is left in the file, not to `len`.
pub fn read_chunk(file: &mut File, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    let remaining = file.metadata()?.len().saturating_sub(offset);
    let want = remaining.min(len as u64);

    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(want as usize);
    // read_to_end retries on Interrupted
    file.take(want).read_to_end(&mut buf)?;
    Ok(buf)
}

/// `Content-Range` value for a chunk of `len` bytes at `start` of a
/// `total`-byte upload. An empty chunk uses the `*` form.
pub fn content_range(start: u64, len: usize, total: u64) -> String {
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{}", start, start + len as u64 - 1, total)
    }
}
