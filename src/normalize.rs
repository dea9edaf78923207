/// Canonical form of a URL for equality checks.
///
/// Drops one trailing `/`, an `http://` or `https://` scheme and a `www.`
/// host prefix. Query strings, fragments and path case are left alone.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme)
        .to_string()
}
