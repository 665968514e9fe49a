//! Resource path arithmetic.
//!
//! Resource paths are project-relative, `/`-separated and normalized (no `.`
//! segments, no leading `/`). These helpers never touch the file system.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap();
}

/// Resolve `.` and `..` segments. Leading `..` that would escape the base
/// are kept so the result stays meaningful.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Directory part of a resource path (`""` for top-level files).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Resolve `target` as referenced from the file `from`. A leading `/`
/// makes the target relative to the project base.
pub fn resolve(from: &str, target: &str) -> String {
    if let Some(rest) = target.strip_prefix('/') {
        return normalize(rest);
    }
    let dir = dirname(from);
    if dir.is_empty() {
        normalize(target)
    } else {
        normalize(&format!("{}/{}", dir, target))
    }
}

/// Path of `target` relative to the directory containing `from`.
pub fn relative_to(from: &str, target: &str) -> String {
    let from_dir: Vec<&str> = dirname(from).split('/').filter(|s| !s.is_empty()).collect();
    let target = normalize(target);
    let target_parts: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from_dir
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = vec![".."; from_dir.len() - common];
    out.extend(&target_parts[common..]);
    out.join("/")
}

/// `../` once per directory level of `path`.
pub fn base_prefix(path: &str) -> String {
    let depth = dirname(path).split('/').filter(|s| !s.is_empty()).count();
    "../".repeat(depth)
}

/// URLs that are never rewritten: absolute, protocol-relative, fragment
/// and query-only references, and anything with a scheme.
pub fn is_external_url(url: &str) -> bool {
    url.is_empty()
        || url.starts_with('/')
        || url.starts_with('#')
        || url.starts_with('?')
        || SCHEME_RE.is_match(url)
}

/// Split `page.html?x=1#top` into the path and the suffix it carries.
pub fn split_suffix(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(i) => (&url[..i], &url[i..]),
        None => (url, ""),
    }
}

/// `page-title` -> `pageTitle`.
pub fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// File extension without the dot, lowercased.
pub fn extension(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(i) if i > 0 => file[i + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// File name without directory or extension.
pub fn file_stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(i) if i > 0 => &file[..i],
        _ => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./a/b/../c.html"), "a/c.html");
        assert_eq!(normalize("../x.html"), "../x.html");
        assert_eq!(normalize("a//b/"), "a/b");
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("pages/blog/post.html", "../_header.html"), "pages/_header.html");
        assert_eq!(resolve("pages/post.html", "/shared/nav.html"), "shared/nav.html");
        assert_eq!(resolve("index.html", "card.html"), "card.html");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("index.html", "docs/a.html"), "docs/a.html");
        assert_eq!(relative_to("docs/guide/index.html", "docs/a.html"), "../a.html");
        assert_eq!(relative_to("docs/index.html", "docs/img/logo.png"), "img/logo.png");
        assert_eq!(relative_to("a/b.html", "c.css"), "../c.css");
    }

    #[test]
    fn test_external_urls() {
        assert!(is_external_url("https://example.com"));
        assert!(is_external_url("mailto:someone@example.com"));
        assert!(is_external_url("//cdn.example.com/x.js"));
        assert!(is_external_url("#top"));
        assert!(!is_external_url("about.html"));
        assert!(!is_external_url("../about.html"));
    }

    #[test]
    fn test_kebab_to_camel() {
        assert_eq!(kebab_to_camel("page-title"), "pageTitle");
        assert_eq!(kebab_to_camel("title"), "title");
        assert_eq!(kebab_to_camel("data-x-y"), "dataXY");
    }

    #[test]
    fn test_base_prefix_and_extension() {
        assert_eq!(base_prefix("index.html"), "");
        assert_eq!(base_prefix("a/b/c.html"), "../../");
        assert_eq!(extension("data/site.JSON"), "json");
        assert_eq!(file_stem("styles/main.css"), "main");
    }
}
