//! Fixtures shared by the unit and crate tests.

use std::sync::Arc;

use crate::config::PipelineOptions;
use crate::error::Result;
use crate::pipeline::{MemoryInterface, Pipeline, PipelineInterface};
use crate::serialize::serialize;

pub fn pipeline_with_options(files: &[(&str, &str)], options: PipelineOptions) -> (Pipeline, Arc<MemoryInterface>) {
    let interface = Arc::new(MemoryInterface::with_files(files.iter().copied()));
    let shared: Arc<dyn PipelineInterface> = interface.clone();
    (Pipeline::new(shared, options), interface)
}

pub fn pipeline_with(files: &[(&str, &str)]) -> (Pipeline, Arc<MemoryInterface>) {
    pipeline_with_options(files, PipelineOptions::default())
}

/// Compile `path` as a standalone fragment and serialize it.
pub fn try_render_fragment(files: &[(&str, &str)], path: &str) -> Result<String> {
    let (mut pipeline, _) = pipeline_with(files);
    let fragment = pipeline.compile_fragment(path, None)?;
    Ok(serialize(&fragment.dom, false))
}

pub fn render_fragment(files: &[(&str, &str)], path: &str) -> String {
    match try_render_fragment(files, path) {
        Ok(html) => html,
        Err(e) => panic!("compiling {} failed: {}", path, e),
    }
}
