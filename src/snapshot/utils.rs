use std::path::Path;

use super::types::{StoreError, StoreResult};

/// Map a resource key to a directory name.
///
/// ASCII letters, digits and `-` are kept; every other byte becomes `_xx`
/// (lowercase hex). The mapping is injective, so distinct keys never share
/// a directory, and the result never contains a path separator or `..`.
pub fn escape_key(key: &str) -> String {
    if key.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{:02x}", byte));
        }
    }
    out
}

/// Write `data` to `path` through a temporary sibling and a rename
pub async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Read a file, mapping "not found" to `None`
pub async fn read_optional(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
