use std::path::Path;

use anyhow::Context;
use macroscope::{module::Module, tree::RawNode};

/// Read the parser records of one document from a JSON file.
///
/// The file holds either a single stream root or an array of stream roots.
pub fn load_streams(path: &Path) -> anyhow::Result<Vec<RawNode>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree: {}", path.display()))?;
    RawNode::streams_from_json(&json)
        .with_context(|| format!("failed to parse tree: {}", path.display()))
}

/// Read a document and import it as a module.
pub fn load_module(path: &Path) -> anyhow::Result<Module> {
    let streams = load_streams(path)?;
    Module::from_streams(&streams).with_context(|| format!("failed to import tree: {}", path.display()))
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
