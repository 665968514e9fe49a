//! End-to-end pipeline tests: pages in, HTML out.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::PipelineOptions;
    use crate::error::{CompileError, ERR_CONFIG, ERR_STRUCTURE};
    use crate::pipeline::{FragmentContext, MemoryInterface, Pipeline, PipelineInterface};
    use crate::serialize::serialize;
    use crate::test_support::{pipeline_with, pipeline_with_options, render_fragment};
    use crate::value::{ScopeVars, Value};

    fn bare_options() -> PipelineOptions {
        PipelineOptions {
            emit_doctype: false,
            ..Default::default()
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // LANGUAGE EXAMPLES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_variable_example() {
        let out = render_fragment(
            &[("index.html", "<m-var key=\"value\"></m-var><div>${ $.key }</div>")],
            "index.html",
        );
        assert_eq!(out, "<div>value</div>");
        assert!(!out.contains("m-var"));
    }

    #[test]
    fn test_slot_example() {
        let out = render_fragment(
            &[
                ("index.html", "<m-fragment src=\"_t.html\"><div>A</div></m-fragment>"),
                ("_t.html", "<m-slot></m-slot>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<div>A</div>");
        assert!(!out.contains("m-slot") && !out.contains("m-fragment"));
    }

    #[test]
    fn test_escaped_attribute_example() {
        let out = render_fragment(&[("index.html", "<div value=\"\\${ 'x' }\"></div>")], "index.html");
        assert_eq!(out, "<div value=\"${ 'x' }\"></div>");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PAGES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_page_with_layout() {
        let (mut pipeline, interface) = pipeline_with_options(
            &[
                (
                    "blog/first.html",
                    "<m-fragment src=\"/_layout.html\" title=\"First\"><p>Body</p></m-fragment>",
                ),
                (
                    "_layout.html",
                    "<html><head><title>${ $.title }</title></head><body><nav><a href=\"index.html\">Home</a></nav><main><m-slot></m-slot></main></body></html>",
                ),
            ],
            bare_options(),
        );
        let page = pipeline.compile_page("blog/first.html").unwrap();
        assert_eq!(
            page.html,
            "<html><head><title>First</title></head><body><nav><a href=\"../index.html\">Home</a></nav><main><p>Body</p></main></body></html>"
        );
        pipeline.write_page(&page).unwrap();
        assert_eq!(interface.written("blog/first.html"), Some(page.html.clone()));
    }

    #[test]
    fn test_doctype_and_default_title() {
        let options = PipelineOptions {
            default_title: "Site".to_string(),
            ..Default::default()
        };
        let (mut pipeline, _) = pipeline_with_options(&[("index.html", "<p>hi</p>")], options);
        let page = pipeline.compile_page("index.html").unwrap();
        assert_eq!(
            page.html,
            "<!DOCTYPE html>\n<html><head><title>Site</title></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn test_globals_are_visible_in_fragments() {
        let mut options = bare_options();
        options
            .globals
            .insert("site".to_string(), serde_json::json!({ "name": "Example" }));
        let (mut pipeline, _) = pipeline_with_options(
            &[
                ("index.html", "<m-fragment src=\"_footer.html\"></m-fragment>"),
                ("_footer.html", "<footer>${ site.name }</footer>"),
            ],
            options,
        );
        let page = pipeline.compile_page("index.html").unwrap();
        assert!(page.html.contains("<footer>Example</footer>"));
    }

    #[test]
    fn test_options_from_resource() {
        let interface: Arc<dyn PipelineInterface> = Arc::new(MemoryInterface::with_files([
            ("mhtml.json", "{\"emitDoctype\": false, \"defaultTitle\": \"T\"}"),
            ("index.html", "<p></p>"),
        ]));
        let mut pipeline = Pipeline::with_options_resource(interface.clone(), "mhtml.json").unwrap();
        assert!(!pipeline.options().emit_doctype);
        assert!(pipeline.compile_page("index.html").unwrap().html.starts_with("<html>"));

        let bad: Arc<dyn PipelineInterface> =
            Arc::new(MemoryInterface::with_files([("mhtml.json", "{\"maxDepth\": \"deep\"}")]));
        let err = Pipeline::with_options_resource(bad, "mhtml.json").err().unwrap();
        assert_eq!(err.code(), ERR_CONFIG);
    }

    #[test]
    fn test_context_load_reads_relative_files() {
        let out = render_fragment(
            &[
                ("docs/index.html", "<ul><m-for var=\"item\" of=\"$$.load('menu.json')\"><li>${ item }</li></m-for></ul><p>${ $$.load('../VERSION').trim() }</p>"),
                ("docs/menu.json", "[\"a\", \"b\"]"),
                ("VERSION", "1.2.3\n"),
            ],
            "docs/index.html",
        );
        assert_eq!(out, "<ul><li>a</li><li>b</li></ul><p>1.2.3</p>");
    }

    #[test]
    fn test_compile_fragment_with_context() {
        let (mut pipeline, _) = pipeline_with(&[("_card.html", "<b>${ $.label }</b><m-slot></m-slot>")]);
        let mut scope = ScopeVars::new();
        scope.insert("label".to_string(), Value::string("hello"));
        let context = FragmentContext {
            scope,
            ..Default::default()
        };
        let fragment = pipeline.compile_fragment("_card.html", Some(context)).unwrap();
        assert_eq!(serialize(&fragment.dom, false), "<b>hello</b>");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unresolved_content_tag_is_reported() {
        let (mut pipeline, _) = pipeline_with(&[("index.html", "<m-content>x</m-content>")]);
        let err = pipeline.compile_page("index.html").unwrap_err();
        match err {
            CompileError::UnresolvedTemplateTag { tag, path } => {
                assert_eq!(tag, "m-content");
                assert_eq!(path, "index.html");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let options = PipelineOptions {
            max_depth: 2,
            ..Default::default()
        };
        let (mut pipeline, _) = pipeline_with_options(
            &[
                ("index.html", "<m-fragment src=\"_1.html\"></m-fragment>"),
                ("_1.html", "<m-fragment src=\"_2.html\"></m-fragment>"),
                ("_2.html", "<p>deep</p>"),
            ],
            options,
        );
        let err = pipeline.compile_page("index.html").unwrap_err();
        assert_eq!(err.code(), ERR_STRUCTURE);
        assert!(err.to_string().contains("nesting depth"));
    }

    #[test]
    fn test_runtime_errors_propagate() {
        let (mut pipeline, _) = pipeline_with(&[("index.html", "<p>${ missing.name }</p>")]);
        let err = pipeline.compile_page("index.html").unwrap_err();
        match err {
            CompileError::ExpressionRuntime { kind, .. } => {
                assert_eq!(kind, crate::error::RuntimeErrorKind::ReferenceError)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CACHE & DEPENDENCIES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_dependencies_are_recorded() {
        let (mut pipeline, _) = pipeline_with(&[
            ("a.html", "<m-fragment src=\"_nav.html\"></m-fragment><m-data items=\"items.json\"></m-data>"),
            ("b.html", "<m-fragment src=\"_nav.html\"></m-fragment>"),
            ("_nav.html", "<nav></nav>"),
            ("items.json", "[]"),
        ]);
        pipeline.compile_page("a.html").unwrap();
        pipeline.compile_page("b.html").unwrap();

        assert_eq!(
            pipeline.deps().resources_of("a.html"),
            vec!["_nav.html", "items.json"]
        );
        assert_eq!(pipeline.deps().pages_using("_nav.html"), vec!["a.html", "b.html"]);
        // The second page hit the cache and still recorded the edge.
        assert_eq!(pipeline.cache().fragment_count(), 3);
    }

    #[test]
    fn test_invalidate_picks_up_changes() {
        let (mut pipeline, interface) = pipeline_with_options(
            &[
                ("index.html", "<m-fragment src=\"_x.html\"></m-fragment>"),
                ("_x.html", "<p>old</p>"),
            ],
            bare_options(),
        );
        assert!(pipeline.compile_page("index.html").unwrap().html.contains("old"));

        interface.insert("_x.html", "<p>new</p>");
        assert!(pipeline.compile_page("index.html").unwrap().html.contains("old"));

        pipeline.invalidate("_x.html");
        assert!(pipeline.compile_page("index.html").unwrap().html.contains("new"));

        pipeline.clear_cache();
        assert_eq!(pipeline.cache().fragment_count(), 0);
    }

    #[test]
    fn test_expressions_compile_once() {
        let (mut pipeline, _) = pipeline_with(&[
            ("index.html", "<m-for var=\"i\" of=\"{{ [1, 2, 3] }}\"><m-fragment src=\"_n.html\" n=\"{{ i }}\"></m-fragment></m-for>"),
            ("_n.html", "<i>${ $.n * 2 }</i>"),
        ]);
        let page = pipeline.compile_page("index.html").unwrap();
        assert!(page.html.contains("<i>2</i><i>4</i><i>6</i>"));
        // The loop source, the `n` attribute and the fragment's text.
        assert_eq!(pipeline.cache().expression_count(), 3);
    }
}
