//! File system utility helpers (BOM-aware readers, etc.)
use std::fs;
use std::path::Path;

use super::AnalysisError;

/// Extensions of files the analyzer picks up when walking directories
pub const SCRIPT_EXTENSIONS: &[&str] = &["ps1", "psm1", "psd1"];

/// Returns true when the path has a script extension (case-insensitive)
pub fn is_script_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SCRIPT_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Reads a script file with encoding detection and BOM handling.
/// Returns the content as UTF-8 with the BOM removed.
pub fn read_script_file(path: &Path) -> Result<String, AnalysisError> {
    let bytes = fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    Ok(decode_script_bytes(&bytes))
}

/// Decodes raw script bytes: UTF-16 by BOM, else UTF-8, else Windows-1252.
pub fn decode_script_bytes(bytes: &[u8]) -> String {
    let content = match bytes {
        // UTF-16LE BOM: FF FE
        [0xFF, 0xFE, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16LE script");
            }
            decoded.into_owned()
        }
        // UTF-16BE BOM: FE FF
        [0xFE, 0xFF, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16BE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16BE script");
            }
            decoded.into_owned()
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                // Windows PowerShell 5.1 writes ANSI files by default
                tracing::debug!("UTF-8 decoding failed, trying Windows-1252");
                let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
                if had_errors {
                    tracing::warn!("Errors detected while decoding Windows-1252 script");
                }
                decoded.into_owned()
            }
        },
    };

    match content.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"function f {}");
        assert_eq!(decode_script_bytes(&bytes), "function f {}");
    }

    #[test]
    fn test_utf16le_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "param($a)".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_script_bytes(&bytes), "param($a)");
    }

    #[test]
    fn test_script_extensions() {
        assert!(is_script_file(Path::new("Module.PSM1")));
        assert!(is_script_file(Path::new("build.ps1")));
        assert!(!is_script_file(Path::new("notes.txt")));
    }
}
