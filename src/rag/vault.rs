// src/rag/vault.rs
// Vault file enumeration and path safety

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};
use tracing::warn;
use walkdir::WalkDir;

use super::index::Category;

const DOCUMENT_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// A document found under the vault root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated
    pub rel_path: String,
}

/// Something under the root the walk could not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub rel_path: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root for `.md`/`.txt` files, in directory-walk order
    /// (entries sorted by name within each directory).
    ///
    /// Symlinks are followed. Entries below the root that cannot be read come
    /// back as `Err` in walk order; only an unreadable root fails the scan.
    pub fn scan(&self) -> Result<Vec<Result<VaultFile, SkippedEntry>>> {
        let mut found = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    bail!("Cannot read vault {}: {}", self.root.display(), e)
                }
                Err(e) => {
                    let rel_path = e
                        .path()
                        .and_then(|p| p.strip_prefix(&self.root).ok())
                        .map(rel_path_string)
                        .unwrap_or_default();
                    warn!("Skipping unreadable vault entry {}: {}", rel_path, e);
                    found.push(Err(SkippedEntry {
                        rel_path,
                        reason: e.to_string(),
                    }));
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_document(entry.path()) {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                found.push(Ok(VaultFile {
                    rel_path: rel_path_string(rel),
                    path: entry.into_path(),
                }));
            }
        }

        Ok(found)
    }

    /// Resolve a vault-relative path, refusing anything that escapes the root
    pub fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let candidate = Path::new(rel);
        let mut resolved = self.root.clone();

        for component in candidate.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => bail!("Path '{}' escapes the vault", rel),
                Component::RootDir | Component::Prefix(_) => {
                    bail!("Path '{}' must be relative to the vault", rel)
                }
            }
        }

        if resolved == self.root {
            bail!("Path '{}' does not name a file", rel);
        }
        Ok(resolved)
    }
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Novel if the relative path contains `Novel` anywhere, world otherwise.
///
/// Substring match, so `Novelty/notes.md` also counts as novel.
// TODO: replace with a per-root category tag once vaults can declare one
pub fn classify(rel_path: &str) -> Category {
    if rel_path.contains("Novel") {
        Category::Novel
    } else {
        Category::World
    }
}

fn rel_path_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_documents_case_insensitively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Novel/part1")).unwrap();
        fs::write(dir.path().join("lore.md"), "a").unwrap();
        fs::write(dir.path().join("Novel/part1/CH1.TXT"), "b").unwrap();
        fs::write(dir.path().join("image.png"), "c").unwrap();
        fs::write(dir.path().join("README"), "d").unwrap();

        let vault = Vault::new(dir.path());
        let rels: Vec<String> = vault
            .scan()
            .unwrap()
            .into_iter()
            .map(|f| f.unwrap().rel_path)
            .collect();
        assert_eq!(rels, vec!["Novel/part1/CH1.TXT", "lore.md"]);
    }

    #[test]
    fn classification_is_a_substring_match() {
        assert_eq!(classify("Novel/ch1.md"), Category::Novel);
        assert_eq!(classify("drafts/MyNovel.txt"), Category::Novel);
        assert_eq!(classify("novel/ch1.md"), Category::World);
        assert_eq!(classify("World/places.md"), Category::World);
    }

    #[test]
    fn resolve_rejects_escapes() {
        let vault = Vault::new("/vault");
        assert_eq!(vault.resolve("a/b.md").unwrap(), PathBuf::from("/vault/a/b.md"));
        assert!(vault.resolve("../etc/passwd").is_err());
        assert!(vault.resolve("a/../../x.md").is_err());
        assert!(vault.resolve("/etc/passwd").is_err());
        assert!(vault.resolve(".").is_err());
    }

    #[test]
    fn missing_root_fails_the_scan() {
        let vault = Vault::new("/definitely/not/a/vault");
        assert!(vault.scan().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_reported_not_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.md"), dir.path().join("b.md")).unwrap();
        fs::write(dir.path().join("c.md"), "c").unwrap();

        let found = Vault::new(dir.path()).scan().unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].as_ref().unwrap().rel_path, "a.md");
        let skipped = found[1].as_ref().unwrap_err();
        assert_eq!(skipped.rel_path, "b.md");
        assert!(!skipped.reason.is_empty());
        assert_eq!(found[2].as_ref().unwrap().rel_path, "c.md");
    }
}
