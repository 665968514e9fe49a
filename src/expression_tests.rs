//! Expressions as they appear in templates.

#[cfg(test)]
mod tests {
    use crate::error::{CompileError, ERR_EXPR_RUNTIME, ERR_EXPR_SYNTAX};
    use crate::test_support::{pipeline_with, render_fragment, try_render_fragment};

    fn render(html: &str) -> String {
        render_fragment(&[("index.html", html)], "index.html")
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // TEXT AND ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_template_and_single_expression_text() {
        assert_eq!(render("<p>${ 1 + 2 } and ${ 'a' + 'b' }</p>"), "<p>3 and ab</p>");
        assert_eq!(render("<p>{{ [1, 2].map((n) => n * 10) }}</p>"), "<p>10,20</p>");
        assert_eq!(render("<p>{{ null }}</p><p>${ undefined }</p>"), "<p></p><p>undefined</p>");
    }

    #[test]
    fn test_escaped_syntax_is_literal() {
        assert_eq!(render("<p>\\${ 1 }</p>"), "<p>${ 1 }</p>");
        assert_eq!(render("<p>\\{{ 1 }}</p>"), "<p>{{ 1 }}</p>");
    }

    #[test]
    fn test_boolean_attributes() {
        assert_eq!(
            render("<input disabled=\"{{ 1 > 2 }}\" checked=\"{{ 2 > 1 }}\" title=\"{{ null }}\">"),
            "<input checked>"
        );
    }

    #[test]
    fn test_attributes_keep_typed_values() {
        let out = render(
            "<m-var list=\"{{ [3, 4, 5] }}\" conf=\"{{ { deep: { n: 7 } } }}\"></m-var><p>${ list.length } ${ conf.deep.n * 2 }</p>",
        );
        assert_eq!(out, "<p>3 14</p>");
    }

    #[test]
    fn test_script_and_style_text_is_opaque() {
        assert_eq!(
            render("<script>let s = `${ a }`;</script><style>p::after { content: \"${ x }\" }</style>"),
            "<script>let s = `${ a }`;</script><style>p::after { content: \"${ x }\" }</style>"
        );
    }

    #[test]
    fn test_scope_shorthand_and_context() {
        let out = render_fragment(
            &[("docs/page.html", "<m-var site-name=\"Docs\"></m-var><p>${ $.siteName }|${ siteName }|${ $$.fragment }</p>")],
            "docs/page.html",
        );
        assert_eq!(out, "<p>Docs|Docs|docs/page.html</p>");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_reference_error_propagates() {
        let err = try_render_fragment(&[("index.html", "<p>${ nope }</p>")], "index.html").unwrap_err();
        assert_eq!(err.code(), ERR_EXPR_RUNTIME);
        assert!(err.to_string().contains("nope is not defined"));
    }

    #[test]
    fn test_syntax_error_carries_source() {
        let err = try_render_fragment(&[("index.html", "<p title=\"{{ 1 + }}\"></p>")], "index.html").unwrap_err();
        assert_eq!(err.code(), ERR_EXPR_SYNTAX);
        match err {
            CompileError::ExpressionSyntax { source_text, .. } => assert_eq!(source_text, "{{ 1 + }}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trailing_text_after_expression_is_fatal() {
        for html in ["<p>{{ 1 }} and {{ 2 }}</p>", "<m-if ?=\"false oops\">x</m-if>", "<p>{{ 1 2 }}</p>"] {
            let err = try_render_fragment(&[("index.html", html)], "index.html").unwrap_err();
            assert_eq!(err.code(), ERR_EXPR_SYNTAX, "{}", html);
        }
    }

    #[test]
    fn test_type_error_on_null_member() {
        let err = try_render_fragment(&[("index.html", "<p>${ null.name }</p>")], "index.html").unwrap_err();
        assert_eq!(err.code(), ERR_EXPR_RUNTIME);
        assert!(err.to_string().contains("TypeError: Cannot read properties of null"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CACHING
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_identical_sources_share_a_unit() {
        let (mut pipeline, _) = pipeline_with(&[(
            "index.html",
            "<p>${ 1 }</p><p>${ 1 }</p><p title=\"${ 1 }\">${ 2 }</p>",
        )]);
        pipeline.compile_fragment("index.html", None).unwrap();
        assert_eq!(pipeline.cache().expression_count(), 2);

        pipeline.compile_fragment("index.html", None).unwrap();
        assert_eq!(pipeline.cache().expression_count(), 2);
    }
}
