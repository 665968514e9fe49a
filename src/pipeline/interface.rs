//! Resource access.
//!
//! The pipeline never touches the file system directly; every read and
//! write goes through a [`PipelineInterface`]. Two implementations are
//! provided: a directory-backed one and an in-memory one used by tests and
//! embedders.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{CompileError, Result};
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Html,
    Style,
    Script,
    Data,
}

impl ResourceKind {
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Html => "html",
            ResourceKind::Style => "css",
            ResourceKind::Script => "js",
            ResourceKind::Data => "json",
        }
    }

    /// Kind of a resource judging by its extension. Anything unknown is data.
    pub fn for_path(path: &str) -> Self {
        match paths::extension(path).as_str() {
            "html" | "htm" => ResourceKind::Html,
            "css" => ResourceKind::Style,
            "js" | "mjs" => ResourceKind::Script,
            _ => ResourceKind::Data,
        }
    }
}

pub trait PipelineInterface: Send + Sync {
    /// Read a resource by project-relative path.
    fn get_resource(&self, kind: ResourceKind, path: &str) -> Result<String>;

    /// Write a compiled resource (a page) to its output location.
    fn write_resource(&self, kind: ResourceKind, path: &str, text: &str) -> Result<()>;

    /// Store generated content and return its project-relative path.
    fn create_resource(&self, kind: ResourceKind, text: &str, source_path: &str) -> Result<String>;

    /// Offer a different path for content created earlier, e.g. one adjusted
    /// for another root document. `None` keeps the existing path.
    fn relink_created_resource(
        &self,
        _kind: ResourceKind,
        _path: &str,
        _root_path: &str,
    ) -> Option<String> {
        None
    }
}

/// Content hash used for linked resource names and deduplication.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `<asset_dir>/<stem>-<hash8>.<ext>`
fn generated_name(asset_dir: &str, kind: ResourceKind, text: &str, source_path: &str) -> String {
    let hash = content_hash(text);
    let name = format!(
        "{}-{}.{}",
        paths::file_stem(source_path),
        &hash[..8],
        kind.extension()
    );
    if asset_dir.is_empty() {
        name
    } else {
        format!("{}/{}", asset_dir.trim_matches('/'), name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE SYSTEM
// ═══════════════════════════════════════════════════════════════════════════════

/// Reads from a source directory and writes pages and generated assets
/// below an output directory, mirroring the source layout.
pub struct FsPipelineInterface {
    source_dir: PathBuf,
    out_dir: PathBuf,
    asset_dir: String,
}

impl FsPipelineInterface {
    pub fn new(source_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, asset_dir: &str) -> Self {
        Self {
            source_dir: source_dir.into(),
            out_dir: out_dir.into(),
            asset_dir: asset_dir.to_string(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    fn write_file(&self, path: &str, text: &str) -> Result<()> {
        let target = self.out_dir.join(path);
        let io_error = |e: std::io::Error| CompileError::Io {
            path: target.display().to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&target, text).map_err(io_error)
    }
}

impl PipelineInterface for FsPipelineInterface {
    fn get_resource(&self, _kind: ResourceKind, path: &str) -> Result<String> {
        fs::read_to_string(self.source_dir.join(path))
            .map_err(|e| CompileError::missing(path, "", e.to_string()))
    }

    fn write_resource(&self, _kind: ResourceKind, path: &str, text: &str) -> Result<()> {
        self.write_file(path, text)
    }

    fn create_resource(&self, kind: ResourceKind, text: &str, source_path: &str) -> Result<String> {
        let path = generated_name(&self.asset_dir, kind, text, source_path);
        self.write_file(&path, text)?;
        Ok(path)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN MEMORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Resources held in memory. Written pages and created assets are kept
/// apart from the sources so tests can inspect them.
#[derive(Default)]
pub struct MemoryInterface {
    sources: Mutex<BTreeMap<String, String>>,
    written: Mutex<BTreeMap<String, String>>,
    asset_dir: String,
}

impl MemoryInterface {
    pub fn new() -> Self {
        Self {
            asset_dir: "assets".to_string(),
            ..Default::default()
        }
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let interface = Self::new();
        for (path, text) in files {
            interface.insert(path, text);
        }
        interface
    }

    /// Add or replace a source resource.
    pub fn insert(&self, path: &str, text: &str) {
        if let Ok(mut sources) = self.sources.lock() {
            sources.insert(paths::normalize(path), text.to_string());
        }
    }

    /// Content written or created under `path`.
    pub fn written(&self, path: &str) -> Option<String> {
        self.written.lock().ok()?.get(path).cloned()
    }

    pub fn written_paths(&self) -> Vec<String> {
        self.written
            .lock()
            .map(|w| w.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn store(&self, path: &str, text: &str) -> Result<()> {
        let mut written = self.written.lock().map_err(|e| CompileError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        written.insert(path.to_string(), text.to_string());
        Ok(())
    }
}

impl PipelineInterface for MemoryInterface {
    fn get_resource(&self, _kind: ResourceKind, path: &str) -> Result<String> {
        self.sources
            .lock()
            .ok()
            .and_then(|sources| sources.get(path).cloned())
            .ok_or_else(|| CompileError::missing(path, "", "no such resource"))
    }

    fn write_resource(&self, _kind: ResourceKind, path: &str, text: &str) -> Result<()> {
        self.store(path, text)
    }

    fn create_resource(&self, kind: ResourceKind, text: &str, source_path: &str) -> Result<String> {
        let path = generated_name(&self.asset_dir, kind, text, source_path);
        self.store(&path, text)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let interface = MemoryInterface::with_files([("./a/b.html", "<p>x</p>")]);
        assert_eq!(
            interface.get_resource(ResourceKind::Html, "a/b.html").unwrap(),
            "<p>x</p>"
        );
        let err = interface.get_resource(ResourceKind::Html, "missing.html").unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_MISSING_RESOURCE);
    }

    #[test]
    fn test_created_names_are_content_addressed() {
        let interface = MemoryInterface::new();
        let a = interface
            .create_resource(ResourceKind::Style, "p{}", "components/card.html")
            .unwrap();
        let b = interface
            .create_resource(ResourceKind::Style, "p{}", "components/card.html")
            .unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("assets/card-"));
        assert!(a.ends_with(".css"));
        assert_eq!(interface.written(&a).as_deref(), Some("p{}"));
    }

    #[test]
    fn test_fs_interface_writes_below_out_dir() {
        let dir = std::env::temp_dir().join(format!("mhtml-fs-{}", std::process::id()));
        let src = dir.join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("index.html"), "<p>hi</p>").unwrap();
        let interface = FsPipelineInterface::new(&src, dir.join("out"), "assets");
        assert_eq!(
            interface.get_resource(ResourceKind::Html, "index.html").unwrap(),
            "<p>hi</p>"
        );
        interface
            .write_resource(ResourceKind::Html, "nested/page.html", "done")
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("out/nested/page.html")).unwrap(),
            "done"
        );
        fs::remove_dir_all(&dir).ok();
    }
}
