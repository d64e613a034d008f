use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::AppPaths;

use super::types::{ContentDiscoveryError, ContentRequest};

pub const BASE_MOD_ID: &str = "base";

#[derive(Debug, Clone)]
pub(crate) struct ContentSource {
    pub mod_id: String,
    pub load_index: u32,
    pub source_dir: PathBuf,
}

/// Base content first, then enabled mods in request order.
pub(crate) fn discover_content_sources(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<Vec<ContentSource>, ContentDiscoveryError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = vec![ContentSource {
        mod_id: BASE_MOD_ID.to_string(),
        load_index: 0,
        source_dir: app_paths.base_content_dir.clone(),
    }];

    for (idx, mod_id) in request.enabled_mods.iter().enumerate() {
        let trimmed = mod_id.trim();
        if trimmed.is_empty() {
            return Err(ContentDiscoveryError::EmptyEnabledMod);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(ContentDiscoveryError::DuplicateEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        let mod_dir = app_paths.mods_dir.join(trimmed);
        ensure_dir_exists(trimmed, &mod_dir)?;
        sources.push(ContentSource {
            mod_id: trimmed.to_string(),
            load_index: (idx + 1) as u32,
            source_dir: mod_dir,
        });
    }

    Ok(sources)
}

fn ensure_dir_exists(mod_id: &str, path: &Path) -> Result<(), ContentDiscoveryError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ContentDiscoveryError::EnabledModMissing {
            mod_id: mod_id.to_string(),
            expected_dir: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn app_paths(root: &Path) -> AppPaths {
        AppPaths::under_root(root.to_path_buf())
    }

    #[test]
    fn base_is_first_then_enabled_order() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(&paths.base_content_dir).expect("create base");
        fs::create_dir_all(paths.mods_dir.join("b")).expect("create mod b");
        fs::create_dir_all(paths.mods_dir.join("a")).expect("create mod a");
        let request = ContentRequest {
            enabled_mods: vec!["b".to_string(), " a ".to_string()],
        };

        let sources = discover_content_sources(&paths, &request).expect("discover");
        let ids = sources
            .iter()
            .map(|source| (source.mod_id.as_str(), source.load_index))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![("base", 0), ("b", 1), ("a", 2)]);
    }

    #[test]
    fn missing_and_duplicate_mods_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(paths.mods_dir.join("a")).expect("create mod a");

        let missing = discover_content_sources(
            &paths,
            &ContentRequest {
                enabled_mods: vec!["ghost".to_string()],
            },
        )
        .expect_err("missing");
        assert!(matches!(
            missing,
            ContentDiscoveryError::EnabledModMissing { ref mod_id, .. } if mod_id == "ghost"
        ));

        let duplicate = discover_content_sources(
            &paths,
            &ContentRequest {
                enabled_mods: vec!["a".to_string(), "a".to_string()],
            },
        )
        .expect_err("duplicate");
        assert!(matches!(
            duplicate,
            ContentDiscoveryError::DuplicateEnabledMod { .. }
        ));

        let empty = discover_content_sources(
            &paths,
            &ContentRequest {
                enabled_mods: vec!["  ".to_string()],
            },
        )
        .expect_err("empty");
        assert!(matches!(empty, ContentDiscoveryError::EmptyEnabledMod));
    }
}
