//! Component tests: script instances, style binding and linked resources.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::config::PipelineOptions;
    use crate::error::{CompileError, Result, ERR_STRUCTURE};
    use crate::pipeline::{MemoryInterface, Pipeline, PipelineInterface, ResourceKind};
    use crate::test_support::{pipeline_with_options, render_fragment, try_render_fragment};

    fn bare_options() -> PipelineOptions {
        PipelineOptions {
            emit_doctype: false,
            ..Default::default()
        }
    }

    /// Counts created resources and optionally relinks them per page.
    struct CountingInterface {
        inner: MemoryInterface,
        created: AtomicUsize,
        relink: bool,
    }

    impl CountingInterface {
        fn new(files: &[(&str, &str)], relink: bool) -> Self {
            Self {
                inner: MemoryInterface::with_files(files.iter().copied()),
                created: AtomicUsize::new(0),
                relink,
            }
        }
    }

    impl PipelineInterface for CountingInterface {
        fn get_resource(&self, kind: ResourceKind, path: &str) -> Result<String> {
            self.inner.get_resource(kind, path)
        }

        fn write_resource(&self, kind: ResourceKind, path: &str, text: &str) -> Result<()> {
            self.inner.write_resource(kind, path, text)
        }

        fn create_resource(&self, kind: ResourceKind, text: &str, source_path: &str) -> Result<String> {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.inner.create_resource(kind, text, source_path)
        }

        fn relink_created_resource(&self, _kind: ResourceKind, path: &str, root_path: &str) -> Option<String> {
            self.relink.then(|| format!("{}?for={}", path, root_path))
        }
    }

    const CARD: &str = "<template><div class=\"card\"><m-slot></m-slot></div></template>\n<style bind=\"link\">.card { padding: 1em }</style>";

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCRIPTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_declarations_become_instance_members() {
        let out = render_fragment(
            &[
                ("index.html", "<m-component src=\"_greet.html\" name=\"Ada\"></m-component>"),
                (
                    "_greet.html",
                    "<template><p>${ shout(greeting) }, ${ $.name }</p></template>\n<script>const greeting = 'hello'; function shout(s) { return s.toUpperCase(); }</script>",
                ),
            ],
            "index.html",
        );
        assert_eq!(out, "<p>HELLO, Ada</p>");
    }

    #[test]
    fn test_factory_receives_scope_and_context() {
        let out = render_fragment(
            &[
                ("index.html", "<m-component src=\"_title.html\" title=\"hi\"></m-component>"),
                (
                    "_title.html",
                    "<template><h1>${ title }</h1><small>${ from }</small></template>\n<script>export default ($, $$) => ({ title: $.title.toUpperCase(), from: $$.fragment })</script>",
                ),
            ],
            "index.html",
        );
        assert_eq!(out, "<h1>HI</h1><small>_title.html</small>");
    }

    #[test]
    fn test_class_is_constructed_per_use() {
        let out = render_fragment(
            &[
                (
                    "index.html",
                    "<m-component src=\"_counter.html\" start=\"{{ 4 }}\"></m-component><m-component src=\"_counter.html\" start=\"{{ 10 }}\"></m-component>",
                ),
                (
                    "_counter.html",
                    "<template><i>${ start }-${ next }</i></template>\n<script>export default class Counter { constructor($) { this.start = $.start; this.next = $.start + 1; } }</script>",
                ),
            ],
            "index.html",
        );
        assert_eq!(out, "<i>4-5</i><i>10-11</i>");
    }

    #[test]
    fn test_script_must_produce_an_object() {
        let err = try_render_fragment(
            &[
                ("index.html", "<m-component src=\"_bad.html\"></m-component>"),
                ("_bad.html", "<template><p></p></template>\n<script>export default 42</script>"),
            ],
            "index.html",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::ExpressionRuntime { .. }));
        assert!(err.to_string().contains("must produce an object"));
    }

    #[test]
    fn test_import_alias_expands_component() {
        let out = render_fragment(
            &[
                (
                    "index.html",
                    "<m-import src=\"_badge.html\" as=\"app-badge\" component></m-import><app-badge label=\"new\"></app-badge>",
                ),
                ("_badge.html", "<template><span>${ $.label }</span></template>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<span>new</span>");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // STYLES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_head_style_is_hoisted_once() {
        let (mut pipeline, _) = pipeline_with_options(
            &[
                ("index.html", "<m-component src=\"_chip.html\"></m-component><m-component src=\"_chip.html\"></m-component>"),
                ("_chip.html", "<b class=\"chip\">c</b>\n<style>.chip { color: red }</style>"),
            ],
            bare_options(),
        );
        let page = pipeline.compile_page("index.html").unwrap();
        assert_eq!(
            page.html,
            "<html><head><title></title><style>.chip { color: red }</style></head><body><b class=\"chip\">c</b><b class=\"chip\">c</b></body></html>"
        );
    }

    #[test]
    fn test_inline_style_stays_in_place() {
        let out = render_fragment(
            &[
                ("index.html", "<div><m-component src=\"_note.html\"></m-component></div>"),
                ("_note.html", "<template><em>n</em></template>\n<style bind=\"inline\">em { color: blue }</style>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<div><style>em { color: blue }</style><em>n</em></div>");
    }

    #[test]
    fn test_unknown_bind_mode_is_rejected() {
        let err = try_render_fragment(
            &[
                ("index.html", "<m-component src=\"_x.html\"></m-component>"),
                ("_x.html", "<template></template><style bind=\"later\"></style>"),
            ],
            "index.html",
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_STRUCTURE);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // LINKED RESOURCES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_linked_style_is_created_once() {
        let interface = Arc::new(CountingInterface::new(
            &[
                ("index.html", "<m-component src=\"_card.html\">a</m-component><m-component src=\"_card.html\">b</m-component>"),
                ("blog/post.html", "<m-component src=\"../_card.html\">c</m-component>"),
                ("_card.html", CARD),
            ],
            false,
        ));
        let shared: Arc<dyn PipelineInterface> = interface.clone();
        let mut pipeline = Pipeline::new(shared, bare_options());

        let index = pipeline.compile_page("index.html").unwrap();
        let post = pipeline.compile_page("blog/post.html").unwrap();
        assert_eq!(interface.created.load(Ordering::SeqCst), 1);

        let assets = interface.inner.written_paths();
        assert_eq!(assets.len(), 1);
        let asset = &assets[0];
        assert!(asset.starts_with("assets/_card-") && asset.ends_with(".css"));
        assert_eq!(interface.inner.written(asset).as_deref(), Some(".card { padding: 1em }"));

        let link = format!("<link rel=\"stylesheet\" href=\"{}\">", asset);
        assert_eq!(index.html.matches(&link).count(), 1);
        assert!(index.html.contains("<div class=\"card\">a</div><div class=\"card\">b</div>"));
        assert!(post
            .html
            .contains(&format!("<link rel=\"stylesheet\" href=\"../{}\">", asset)));
    }

    #[test]
    fn test_interface_can_relink_per_page() {
        let interface = Arc::new(CountingInterface::new(
            &[
                ("a.html", "<m-component src=\"_card.html\"></m-component>"),
                ("b.html", "<m-component src=\"_card.html\"></m-component>"),
                ("_card.html", CARD),
            ],
            true,
        ));
        let shared: Arc<dyn PipelineInterface> = interface.clone();
        let mut pipeline = Pipeline::new(shared, bare_options());

        let a = pipeline.compile_page("a.html").unwrap();
        let b = pipeline.compile_page("b.html").unwrap();
        assert_eq!(interface.created.load(Ordering::SeqCst), 1);
        assert!(!a.html.contains("?for="));
        assert!(b.html.contains(".css?for=b.html\""));
    }
}
