use rayon::prelude::*;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Digest width kept for identity: 128 bits.
pub const DIGEST_BYTES: usize = 16;

const READ_CHUNK: usize = 64 * 1024;

/// Content digest of a file, streamed in fixed-size chunks.
///
/// Used only as a dedup key. Fails if the file vanished or became unreadable
/// after it was discovered.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(render(hasher.finalize()))
}

pub fn hash_data(data: &[u8]) -> String {
    render(blake3::hash(data))
}

fn render(hash: blake3::Hash) -> String {
    hash.as_bytes()[..DIGEST_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Hash many files on the rayon pool. Results keep input order; a failure
/// for one file does not affect the others. `on_progress` receives the
/// running count of finished files.
pub fn hash_files<F>(paths: &[PathBuf], on_progress: F) -> Vec<io::Result<String>>
where
    F: Fn(usize) + Sync,
{
    let done = AtomicUsize::new(0);
    paths
        .par_iter()
        .map(|path| {
            let result = hash_file(path);
            on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);
            result
        })
        .collect()
}
