//! Filesystem helpers shared by the batch processor, directory watcher, and
//! HTTP boundary: writers use case-canonical uppercase names, finders use
//! case-insensitive lookup, and overwrites are permitted and are the defined
//! semantics for sequence wraparound.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Case-insensitive search for `name` inside `dir`. Returns the first match
/// found; on the hub's own writes there should only ever be one.
pub async fn find_case_insensitive(dir: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.eq_ignore_ascii_case(name) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Move `src` into `dest_dir` under `canonical_name` (already uppercase),
/// deleting any existing case-variant first. This is the "sequence
/// wraparound overwrite" rule: same logical name, new contents wins.
pub async fn move_with_overwrite(
    src: &Path,
    dest_dir: &Path,
    canonical_name: &str,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dest_dir).await?;
    if let Some(existing) = find_case_insensitive(dest_dir, canonical_name).await? {
        fs::remove_file(&existing).await?;
    }
    let dest = dest_dir.join(canonical_name);
    fs::rename(src, &dest).await?;
    Ok(dest)
}

/// Copy (not move) `src` into `dest_dir` under its own filename.
pub async fn copy_into(src: &Path, dest_dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dest_dir).await?;
    let file_name = src
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"))?;
    let dest = dest_dir.join(file_name);
    fs::copy(src, &dest).await?;
    Ok(dest)
}

pub async fn sha256_hex_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
