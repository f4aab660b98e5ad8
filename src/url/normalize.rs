use url::Url;

/// Tracking query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "aff", "ref", "source"];

/// Resolves an `href` found on `base` into a canonical event address
///
/// Returns None for links that can never be event pages: empty hrefs,
/// fragment-only anchors, `javascript:`/`mailto:`/`tel:`/`data:` links and
/// anything that does not resolve to an http or https address with a host.
///
/// The canonical form keeps the scheme and host (lowercased by parsing).
/// Dot segments, empty segments and a trailing slash are dropped from the
/// path, the fragment is removed, tracking parameters are stripped and what
/// remains of the query is sorted by key. A query left empty disappears
/// entirely.
///
/// # Examples
///
/// ```
/// use event_harvester::url::resolve_url;
/// use url::Url;
///
/// let page = Url::parse("https://www.example.com/d/online/?page=2").unwrap();
/// let url = resolve_url("/e/concert-123/?aff=ebdssbdestsearch", &page).unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/e/concert-123");
/// ```
pub fn resolve_url(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let joined = base.join(href).ok()?;
    canonicalize(joined)
}

fn canonicalize(mut url: Url) -> Option<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        tracing::trace!("Ignoring {} link {}", url.scheme(), url);
        return None;
    }

    url.host_str()?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(filtered_params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Some(url)
}

/// Path with `.`/`..` resolved and no empty or trailing segments
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Query pairs without tracking parameters, sorted by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
