//! Resource linking: externalized styles and scripts are written once per
//! distinct content.

use tracing::debug;

use super::{content_hash, Pipeline, ResourceKind};
use crate::error::Result;

impl Pipeline {
    /// Path of the linked resource holding `text`, creating it on first use.
    /// The interface may relink an existing resource for the current root
    /// document instead of the cached path being reused as is.
    pub(crate) fn link_resource(&mut self, kind: ResourceKind, text: &str, source_path: &str) -> Result<String> {
        let hash = content_hash(text);
        if let Some(existing) = self.cache.linked(&hash).map(str::to_string) {
            if let Some(relinked) =
                self.interface
                    .relink_created_resource(kind, &existing, &self.request.root_path)
            {
                debug!(path = %relinked, "relinked resource");
                return Ok(relinked);
            }
            debug!(path = %existing, "reusing linked resource");
            return Ok(existing);
        }
        let path = self.interface.create_resource(kind, text, source_path)?;
        debug!(path = %path, source = source_path, "created linked resource");
        self.cache.insert_link(&hash, &path);
        Ok(path)
    }
}
