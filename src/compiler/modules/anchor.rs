//! Rewrites anchor URLs so they work from the page being compiled.
//!
//! `a[href]` uses the configured default mode; any element carrying
//! `m-path="mode"` has its `href` and `src` rewritten with that mode:
//!
//! | mode  | the URL is written relative to | rewritten to |
//! |-------|---------------------------------|--------------|
//! | none  | -                               | unchanged |
//! | local | the fragment containing it      | relative to the page |
//! | root  | the page                        | normalized |
//! | base  | the project base                | `../` per page directory level |
//!
//! URLs with a scheme, protocol-relative and absolute URLs, and pure
//! fragment or query references are never touched.

use crate::compiler::{CompileUnit, CompilerModule};
use crate::config::AnchorMode;
use crate::dom::{NodeId, TagKind};
use crate::error::{CompileError, Result};
use crate::paths;
use crate::value::Value;

use super::tag_of;

pub struct AnchorModule;

const MODE_ATTR: &str = "m-path";

impl CompilerModule for AnchorModule {
    fn name(&self) -> &'static str {
        "anchor"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = tag_of(unit, node) else {
            return Ok(());
        };
        if tag.kind != TagKind::Element {
            return Ok(());
        }
        let (mode, targets): (AnchorMode, &[&str]) = match tag.attr_str(MODE_ATTR) {
            Some(text) => {
                let mode = AnchorMode::parse(&text).ok_or_else(|| {
                    CompileError::structure(
                        unit.path(),
                        &tag.name,
                        format!("unknown {} mode '{}'", MODE_ATTR, text),
                    )
                })?;
                (mode, &["href", "src"][..])
            }
            None if tag.name == "a" => (unit.pipeline.options().default_anchor_mode, &["href"][..]),
            None => return Ok(()),
        };

        let fragment = unit.context.fragment_res_path.clone();
        let root = unit.context.root_res_path.clone();
        let Some(tag) = unit.dom.tag_mut(node) else {
            return Ok(());
        };
        tag.remove_attr(MODE_ATTR);
        for &attr in targets {
            let Some(url) = tag.attr(attr).filter(|v| !v.is_nullish()).map(Value::to_display_string) else {
                continue;
            };
            let rewritten = rewrite(&url, mode, &fragment, &root);
            if rewritten != url {
                tag.set_attr(attr, rewritten);
            }
        }
        Ok(())
    }
}

/// Rewrite one URL. `fragment` is the file the URL was written in, `root`
/// the page being compiled.
pub fn rewrite(url: &str, mode: AnchorMode, fragment: &str, root: &str) -> String {
    if mode == AnchorMode::None || paths::is_external_url(url) {
        return url.to_string();
    }
    let (path, suffix) = paths::split_suffix(url);
    let mut out = match mode {
        AnchorMode::Local => paths::relative_to(root, &paths::resolve(fragment, path)),
        AnchorMode::Root => paths::normalize(path),
        AnchorMode::Base => format!("{}{}", paths::base_prefix(root), paths::normalize(path)),
        AnchorMode::None => path.to_string(),
    };
    if path.ends_with('/') && !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    if out.is_empty() {
        out.push_str("./");
    }
    out.push_str(suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::render_fragment;

    #[test]
    fn test_rewrite_modes() {
        assert_eq!(rewrite("../about.html", AnchorMode::Local, "blog/_nav.html", "blog/post/a.html"), "../../about.html");
        assert_eq!(rewrite("b.html#top", AnchorMode::Local, "_nav.html", "blog/a.html"), "../b.html#top");
        assert_eq!(rewrite("./x/../y.html", AnchorMode::Root, "_nav.html", "blog/a.html"), "y.html");
        assert_eq!(rewrite("docs/", AnchorMode::Base, "_nav.html", "blog/post/a.html"), "../../docs/");
        assert_eq!(rewrite("a.html", AnchorMode::None, "_nav.html", "blog/a.html"), "a.html");
    }

    #[test]
    fn test_external_urls_are_untouched() {
        for url in ["https://example.com/a", "//cdn.test/x.js", "/abs.html", "#top", "?q=1", "mailto:a@b.c"] {
            assert_eq!(rewrite(url, AnchorMode::Base, "_nav.html", "blog/a.html"), url);
        }
    }

    #[test]
    fn test_fragment_links_follow_the_page() {
        let out = render_fragment(
            &[
                ("blog/post.html", "<m-fragment src=\"../_nav.html\"></m-fragment>"),
                ("_nav.html", "<a href=\"index.html\">home</a><img m-path=\"base\" src=\"logo.png\">"),
            ],
            "blog/post.html",
        );
        assert_eq!(out, "<a href=\"../index.html\">home</a><img src=\"../logo.png\">");
    }
}
