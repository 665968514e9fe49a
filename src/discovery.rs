//! Page discovery and batch compilation.
//!
//! Pages are the `.html` files of a source tree; files or directories whose
//! name starts with `_` are partials (fragments, components, layouts) and
//! are only compiled through references. Independent pages are compiled in
//! parallel, each worker with its own [`Pipeline`].

use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::PipelineOptions;
use crate::error::Result;
use crate::pipeline::{FsPipelineInterface, Pipeline, PipelineInterface};

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Project-relative paths of every page under `dir`, sorted.
pub fn discover_pages(dir: &Path) -> Vec<String> {
    let mut pages = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "html").unwrap_or(true) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.iter().any(|p| p.starts_with('_')) {
            continue;
        }
        pages.push(parts.join("/"));
    }

    pages.sort();
    debug!(count = pages.len(), dir = %dir.display(), "discovered pages");
    pages
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile and write every page. Results are reported per page; one
/// failing page does not stop the others.
pub fn compile_site(
    interface: Arc<dyn PipelineInterface>,
    options: &PipelineOptions,
    pages: &[String],
) -> Vec<(String, Result<String>)> {
    pages
        .par_iter()
        .map_init(
            || Pipeline::new(interface.clone(), options.clone()),
            |pipeline, path| {
                let result = pipeline.compile_page(path).and_then(|page| {
                    pipeline.write_page(&page)?;
                    Ok(page.html)
                });
                if let Err(e) = &result {
                    warn!(path = %path, code = e.code(), "page failed: {}", e);
                }
                (path.clone(), result)
            },
        )
        .collect()
}

/// Compile every page found in `source_dir` into `out_dir`.
pub fn compile_directory(
    source_dir: &Path,
    out_dir: &Path,
    options: &PipelineOptions,
) -> Vec<(String, Result<String>)> {
    let pages = discover_pages(source_dir);
    let interface: Arc<dyn PipelineInterface> =
        Arc::new(FsPipelineInterface::new(source_dir, out_dir, &options.asset_dir));
    compile_site(interface, options, &pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MemoryInterface;
    use std::fs;

    #[test]
    fn test_discover_skips_partials() {
        let dir = std::env::temp_dir().join(format!("mhtml-discovery-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("blog")).unwrap();
        fs::create_dir_all(dir.join("_layouts")).unwrap();
        for file in ["index.html", "blog/post.html", "_nav.html", "_layouts/base.html", "style.css"] {
            fs::write(dir.join(file), "<p></p>").unwrap();
        }
        assert_eq!(discover_pages(&dir), vec!["blog/post.html", "index.html"]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_compile_site_reports_each_page() {
        let memory = Arc::new(MemoryInterface::with_files([
            ("a.html", "<m-fragment src=\"_x.html\"></m-fragment>"),
            ("b.html", "<m-fragment src=\"_missing.html\"></m-fragment>"),
            ("_x.html", "<p>x</p>"),
        ]));
        let interface: Arc<dyn PipelineInterface> = memory.clone();
        let pages = vec!["a.html".to_string(), "b.html".to_string()];
        let results = compile_site(interface, &PipelineOptions::default(), &pages);

        assert_eq!(results.len(), 2);
        assert!(results[0].1.as_ref().unwrap().contains("<p>x</p>"));
        assert!(results[1].1.is_err());
        assert!(memory.written("a.html").is_some());
        assert!(memory.written("b.html").is_none());
    }
}
