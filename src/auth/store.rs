// Token file persistence

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::types::TokenPair;
use crate::error::{EcobeeError, Result};

/// Returns true if a readable token file is present
pub fn exists(location: &Path) -> bool {
    fs::metadata(location)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
        && fs::File::open(location).is_ok()
}

/// Load the token pair from disk
pub fn load(location: &Path) -> Result<TokenPair> {
    let data = fs::read(location).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EcobeeError::TokenFileNotFound(location.to_path_buf()),
        _ => EcobeeError::TokenFileCorrupt {
            path: location.to_path_buf(),
            reason: format!("unreadable: {}", e),
        },
    })?;

    let pair: TokenPair =
        serde_json::from_slice(&data).map_err(|e| EcobeeError::TokenFileCorrupt {
            path: location.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !pair.is_complete() {
        return Err(EcobeeError::TokenFileCorrupt {
            path: location.to_path_buf(),
            reason: "incomplete token pair".to_string(),
        });
    }

    Ok(pair)
}

/// Persist the token pair, replacing any previous file
///
/// The pair is written to a sibling temp file and renamed over the target,
/// so a failed write leaves the previous file untouched.
pub fn save(pair: &TokenPair, location: &Path) -> Result<()> {
    if !pair.is_complete() {
        return Err(EcobeeError::IncompleteTokenPair);
    }

    let write_err = |source| EcobeeError::TokenFileWrite {
        path: location.to_path_buf(),
        source,
    };

    let data = serde_json::to_vec(pair).map_err(|e| write_err(e.into()))?;
    let tmp = temp_path(location);

    if let Err(e) = fs::write(&tmp, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }

    if let Err(e) = fs::rename(&tmp, location) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }

    tracing::debug!("Wrote tokens to {}", location.display());
    Ok(())
}

fn temp_path(location: &Path) -> PathBuf {
    let mut name = location
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tokens".into());
    name.push(".tmp");
    location.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_exists_before_and_after_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");

        assert!(!exists(&path));
        save(&TokenPair::new("access", "refresh"), &path).unwrap();
        assert!(exists(&path));
    }

    #[test]
    fn test_exists_is_false_for_directory() {
        let dir = TempDir::new().unwrap();
        assert!(!exists(dir.path()));
    }

    #[test]
    fn test_load_reads_original_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(
            &path,
            r#"{"access_token": "some_token", "refresh_token": "another_token"}"#,
        )
        .unwrap();

        let tokens = load(&path).unwrap();
        assert_eq!(tokens.access_token, "some_token");
        assert_eq!(tokens.refresh_token, "another_token");
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, EcobeeError::TokenFileNotFound(_)));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, b"access=foo\nrefresh=bar").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, EcobeeError::TokenFileCorrupt { .. }));
    }

    #[test]
    fn test_load_missing_field_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"access_token": "only"}"#).unwrap();

        assert!(matches!(
            load(&path),
            Err(EcobeeError::TokenFileCorrupt { .. })
        ));
    }

    #[test]
    fn test_load_empty_tokens_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"access_token": "", "refresh_token": ""}"#).unwrap();

        match load(&path) {
            Err(EcobeeError::TokenFileCorrupt { reason, .. }) => {
                assert_eq!(reason, "incomplete token pair");
            }
            other => panic!("expected corrupt token file, got {:?}", other),
        }
    }

    #[test]
    fn test_save_overwrites_previous_pair() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");

        save(&TokenPair::new("a1", "r1"), &path).unwrap();
        save(&TokenPair::new("a2", "r2"), &path).unwrap();

        assert_eq!(load(&path).unwrap(), TokenPair::new("a2", "r2"));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_save_incomplete_pair_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        save(&TokenPair::new("a1", "r1"), &path).unwrap();

        let err = save(&TokenPair::new("a2", ""), &path).unwrap_err();
        assert!(matches!(err, EcobeeError::IncompleteTokenPair));
        assert_eq!(load(&path).unwrap(), TokenPair::new("a1", "r1"));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let err = save(&TokenPair::new("a", "r"), &path).unwrap_err();
        assert!(matches!(err, EcobeeError::TokenFileWrite { .. }));
        assert!(!exists(&path));
    }

    proptest! {
        #[test]
        fn prop_save_then_load_round_trips(
            access in "[A-Za-z0-9._-]{1,64}",
            refresh in "[A-Za-z0-9._-]{1,64}",
        ) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("tokens.json");
            let pair = TokenPair::new(access, refresh);

            save(&pair, &path).unwrap();
            prop_assert_eq!(load(&path).unwrap(), pair);
        }
    }
}
