use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content-addressed location of an uploaded receipt image.
/// Layout: `<base>/<first_2_hex_chars>/<full_hex>.<ext>`
pub fn upload_path(uploads_dir: &Path, hash_hex: &str, ext: &str) -> PathBuf {
    uploads_dir
        .join(&hash_hex[..2])
        .join(format!("{hash_hex}.{ext}"))
}

/// Lower-cased extension of an uploaded file name, `jpg` when it has none.
pub fn upload_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "jpg".to_string())
}
