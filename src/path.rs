//! Path canonicalization shared by the walker, the registry and the server.

/// Canonicalize a route path.
///
/// Collapses runs of `/` into one, strips a trailing `/` unless the path is the
/// root, and maps the empty string to `/`. Idempotent for every input.
///
/// ```
/// use routedoc::path::normalize;
///
/// assert_eq!(normalize("/a//b/"), "/a/b");
/// assert_eq!(normalize(""), "/");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Join a mount prefix and a child segment, then normalize the result.
#[must_use]
pub fn join(prefix: &str, segment: &str) -> String {
    normalize(&format!("{prefix}/{segment}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &[&str] = &[
        "",
        "/",
        "//",
        "///",
        "/a//b/",
        "a//b",
        "/users/{id}/",
        "/x/y//z///",
        "no-slash",
        "/trailing/",
        "//leading",
        "/a\\b/",
    ];

    #[test]
    fn test_collapses_and_strips() {
        assert_eq!(normalize("/a//b/"), "/a/b");
        assert_eq!(normalize("//leading"), "/leading");
        assert_eq!(normalize("/users/{id}/"), "/users/{id}");
    }

    #[test]
    fn test_empty_and_root() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("////"), "/");
    }

    #[test]
    fn test_relative_paths_keep_their_shape() {
        assert_eq!(normalize("a//b/"), "a/b");
        assert_eq!(normalize("no-slash"), "no-slash");
    }

    #[test]
    fn test_backslash_is_not_a_separator() {
        assert_eq!(normalize("/a\\b/"), "/a\\b");
    }

    #[test]
    fn test_idempotent_over_corpus() {
        for raw in CORPUS {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "/hello"), "/hello");
        assert_eq!(join("/api", "/user"), "/api/user");
        assert_eq!(join("/api/", "user/"), "/api/user");
        assert_eq!(join("/api", "/"), "/api");
        assert_eq!(join("", ""), "/");
    }
}
