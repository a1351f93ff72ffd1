//! Store directory layout.
//!
//! ```text
//! <root>/
//! ├─ LOCK              # Advisory lock for single-writer
//! ├─ <owner>.cbor      # One row per owner
//! └─ <owner>.cbor.tmp  # In-flight write, renamed over the row
//! ```
//!
//! Owner keys are mapped onto file names by escaping every byte outside
//! `[A-Za-z0-9_-]` as `%XX`, which keeps the mapping reversible and keeps
//! separators, dots and the anonymous marker out of paths.

use std::path::{Path, PathBuf};
use tandem_core::OwnerKey;

pub(crate) const LOCK_FILE: &str = "LOCK";
pub(crate) const ROW_EXTENSION: &str = "cbor";
const TEMP_SUFFIX: &str = ".tmp";

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

/// Escapes an owner key into a file stem.
pub(crate) fn file_stem(owner: &OwnerKey) -> String {
    let mut stem = String::with_capacity(owner.as_str().len());
    for &byte in owner.as_str().as_bytes() {
        if is_plain(byte) {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

/// Reverses `file_stem`. Returns `None` for names no owner maps to.
pub(crate) fn owner_from_stem(stem: &str) -> Option<OwnerKey> {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = stem.get(i + 1..i + 3)?;
                if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return None;
                }
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            byte if is_plain(byte) => {
                decoded.push(byte);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(decoded).ok().map(OwnerKey::new)
}

/// Path of the row file of `owner`.
pub(crate) fn row_path(root: &Path, owner: &OwnerKey) -> PathBuf {
    root.join(format!("{}.{ROW_EXTENSION}", file_stem(owner)))
}

/// Path of the temporary file used to replace the row of `owner`.
pub(crate) fn temp_path(root: &Path, owner: &OwnerKey) -> PathBuf {
    root.join(format!("{}.{ROW_EXTENSION}{TEMP_SUFFIX}", file_stem(owner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_keys_are_kept() {
        assert_eq!(file_stem(&OwnerKey::new("user_42-a")), "user_42-a");
    }

    #[test]
    fn separators_are_escaped() {
        let stem = file_stem(&OwnerKey::new("../etc/passwd"));
        assert!(!stem.contains('/'));
        assert!(!stem.contains('.'));
        assert_eq!(owner_from_stem(&stem), Some(OwnerKey::new("../etc/passwd")));
    }

    #[test]
    fn anonymous_key_has_a_file() {
        let stem = file_stem(&OwnerKey::anonymous());
        assert_eq!(owner_from_stem(&stem), Some(OwnerKey::anonymous()));
    }

    #[test]
    fn foreign_names_are_ignored() {
        assert_eq!(owner_from_stem("bad name"), None);
        assert_eq!(owner_from_stem("trailing%4"), None);
    }

    #[test]
    fn paths() {
        let root = Path::new("/cache");
        let owner = OwnerKey::new("alice");
        assert_eq!(row_path(root, &owner), PathBuf::from("/cache/alice.cbor"));
        assert_eq!(temp_path(root, &owner), PathBuf::from("/cache/alice.cbor.tmp"));
    }

    proptest! {
        #[test]
        fn stems_are_reversible(key in "\\PC{0,24}") {
            let owner = OwnerKey::new(key);
            prop_assert_eq!(owner_from_stem(&file_stem(&owner)), Some(owner));
        }
    }
}
