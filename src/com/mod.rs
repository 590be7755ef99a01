//! COM interop with the Windows shell. Windows-only.

pub mod shell_link;

/// Convert a Rust string to a null-terminated UTF-16 vector.
pub(crate) fn to_wstring(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Convert a null-terminated UTF-16 buffer back to a Rust string.
pub(crate) fn from_wstring(buf: &[u16]) -> String {
    let len = buf.iter().position(|&w| w == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}
