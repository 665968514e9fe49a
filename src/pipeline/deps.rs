//! Page <-> resource dependency bookkeeping.

use indexmap::IndexSet;
use std::collections::HashMap;

/// Bidirectional multimap between page paths and the resources they read.
#[derive(Debug, Default, Clone)]
pub struct DependencyTracker {
    by_page: HashMap<String, IndexSet<String>>,
    by_resource: HashMap<String, IndexSet<String>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, page: &str, resource: &str) {
        if page == resource {
            return;
        }
        self.by_page
            .entry(page.to_string())
            .or_default()
            .insert(resource.to_string());
        self.by_resource
            .entry(resource.to_string())
            .or_default()
            .insert(page.to_string());
    }

    /// Resources read while compiling `page`, in first-use order.
    pub fn resources_of(&self, page: &str) -> Vec<String> {
        self.by_page
            .get(page)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pages that must be rebuilt when `resource` changes.
    pub fn pages_using(&self, resource: &str) -> Vec<String> {
        self.by_resource
            .get(resource)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every edge starting at `page`.
    pub fn forget_page(&mut self, page: &str) {
        let Some(resources) = self.by_page.remove(page) else {
            return;
        };
        for resource in resources {
            if let Some(pages) = self.by_resource.get_mut(&resource) {
                pages.shift_remove(page);
                if pages.is_empty() {
                    self.by_resource.remove(&resource);
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.by_page.clear();
        self.by_resource.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query_both_ways() {
        let mut deps = DependencyTracker::new();
        deps.record("index.html", "_header.html");
        deps.record("index.html", "data/site.json");
        deps.record("about.html", "_header.html");
        deps.record("index.html", "_header.html");

        assert_eq!(deps.resources_of("index.html"), vec!["_header.html", "data/site.json"]);
        assert_eq!(deps.pages_using("_header.html"), vec!["index.html", "about.html"]);
        assert!(deps.pages_using("nothing.html").is_empty());
    }

    #[test]
    fn test_forget_and_reset() {
        let mut deps = DependencyTracker::new();
        deps.record("index.html", "_header.html");
        deps.record("about.html", "_header.html");
        deps.forget_page("index.html");
        assert!(deps.resources_of("index.html").is_empty());
        assert_eq!(deps.pages_using("_header.html"), vec!["about.html"]);
        deps.reset();
        assert!(deps.pages_using("_header.html").is_empty());
    }
}
