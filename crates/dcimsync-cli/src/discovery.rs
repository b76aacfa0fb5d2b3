//! Finding definition files in the library and reading their metadata.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use dcimsync_core::{Definition, DefinitionMeta, EntityKind};
use dcimsync_engine::{DiscoveredItem, DocumentLoader};

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Library directory {} does not exist", .path.display())]
    MissingDirectory { path: PathBuf },

    #[error("No YAML definitions found under {}", .path.display())]
    NoDefinitions { path: PathBuf },

    #[error("Invalid search pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Find every YAML file below `dir`, sorted by relative path. Hidden files
/// and directories are ignored.
///
/// # Errors
///
/// Fails when `dir` is missing or holds no YAML file.
pub fn find_definition_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
    if !dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = BTreeSet::new();
    for ext in EXTENSIONS {
        let pattern = format!("{base}/**/*.{ext}");
        let paths = glob::glob(&pattern).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => {
                    let Ok(relative) = path.strip_prefix(dir) else {
                        continue;
                    };
                    if is_hidden(relative) {
                        continue;
                    }
                    found.insert((relative.to_string_lossy().into_owned(), path.clone()));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable library entry"),
            }
        }
    }

    if found.is_empty() {
        return Err(DiscoveryError::NoDefinitions {
            path: dir.to_path_buf(),
        });
    }
    Ok(found.into_iter().collect())
}

fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Discover definitions of `kind` under `dir`, reading each file's first
/// definition for the ledger metadata.
///
/// Files that cannot be read or parsed are still returned, with only the
/// folder manufacturer known; the run records why they fail.
///
/// # Errors
///
/// Same as [`find_definition_files`].
pub fn discover<L: DocumentLoader>(
    dir: &Path,
    kind: EntityKind,
    loader: &L,
) -> Result<Vec<DiscoveredItem>, DiscoveryError> {
    let files = find_definition_files(dir)?;
    let items = files
        .into_iter()
        .map(|(relative_path, full_path)| {
            let meta = read_meta(kind, &relative_path, &full_path, loader);
            DiscoveredItem {
                relative_path,
                full_path,
                meta,
            }
        })
        .collect::<Vec<_>>();
    debug!(kind = %kind, count = items.len(), dir = %dir.display(), "Discovered definitions");
    Ok(items)
}

fn read_meta<L: DocumentLoader>(
    kind: EntityKind,
    relative_path: &str,
    full_path: &Path,
    loader: &L,
) -> DefinitionMeta {
    let folder = full_path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned());

    let first = loader.load(full_path).ok().and_then(|document| {
        Definition::from_document(kind, document, relative_path, folder.as_deref())
            .ok()
            .and_then(|definitions| definitions.into_iter().next())
    });
    match first {
        Some(definition) => definition.meta(),
        None => DefinitionMeta {
            manufacturer: folder,
            ..DefinitionMeta::default()
        },
    }
}

/// Manufacturer folder names across every kind directory under `root`,
/// sorted and without duplicates.
pub fn manufacturer_folders(root: &Path) -> Vec<String> {
    let mut names = BTreeSet::new();
    for kind in EntityKind::ALL {
        let dir = root.join(kind.as_str());
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                names.insert(name);
            }
        }
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::YamlLoader;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = find_definition_files(&dir.path().join("device-types")).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingDirectory { .. }));
    }

    #[test]
    fn directory_without_yaml_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write(&dir.path().join("Cisco/README.md"), "# notes");
        let err = find_definition_files(dir.path()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoDefinitions { .. }));
    }

    #[test]
    fn finds_both_extensions_and_skips_hidden() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write(&dir.path().join("Cisco/a.yaml"), "model: A");
        write(&dir.path().join("Arista/b.yml"), "model: B");
        write(&dir.path().join(".git/c.yaml"), "model: C");
        write(&dir.path().join("Cisco/.draft.yaml"), "model: D");

        let files = find_definition_files(dir.path()).expect("files");
        let relative: Vec<&str> = files.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(relative, vec!["Arista/b.yml", "Cisco/a.yaml"]);
    }

    #[test]
    fn metadata_falls_back_to_folder_manufacturer() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write(
            &dir.path().join("Juniper/ex4300.yaml"),
            "model: EX4300-48T\nu_height: 1\n",
        );
        write(&dir.path().join("Juniper/broken.yaml"), "model: [");

        let items = discover(dir.path(), EntityKind::DeviceType, &YamlLoader).expect("items");
        assert_eq!(items.len(), 2);

        let broken = &items[0];
        assert_eq!(broken.relative_path, "Juniper/broken.yaml");
        assert_eq!(broken.meta.manufacturer.as_deref(), Some("Juniper"));
        assert_eq!(broken.meta.model, None);

        let good = &items[1];
        assert_eq!(good.meta.manufacturer.as_deref(), Some("Juniper"));
        assert_eq!(good.meta.model.as_deref(), Some("EX4300-48T"));
        assert_eq!(good.meta.slug.as_deref(), Some("juniper-ex4300-48t"));
    }

    #[test]
    fn lists_manufacturer_folders_across_kinds() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write(&dir.path().join("device-types/Cisco/a.yaml"), "model: A");
        write(&dir.path().join("module-types/Cisco/b.yaml"), "model: B");
        write(&dir.path().join("module-types/Arista/c.yaml"), "model: C");
        write(&dir.path().join("device-types/.github/d.yaml"), "model: D");
        write(&dir.path().join("device-types/notes.txt"), "");

        assert_eq!(manufacturer_folders(dir.path()), vec!["Arista", "Cisco"]);
    }
}
