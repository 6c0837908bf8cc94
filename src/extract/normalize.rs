use url::Url;

const MIN_CANDIDATE_LEN: usize = 4;

/// Resolve a raw image reference into an absolute URL.
///
/// `page_base` supplies scheme and host for protocol-relative and
/// root-relative references; everything else that is not already absolute
/// is joined onto `document_url`. Returns `None` for inline data, tiny
/// fragments and anything that does not parse.
pub fn normalize_candidate(raw: &str, page_base: &Url, document_url: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.len() < MIN_CANDIDATE_LEN || raw.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
    {
        return None;
    }

    let resolved = if raw.starts_with("//") {
        Url::parse(&format!("{}:{}", page_base.scheme(), raw))
    } else if raw.starts_with('/') {
        Url::parse(&format!("{}{}", origin_prefix(page_base), raw))
    } else if raw.starts_with("http") {
        Url::parse(raw)
    } else {
        document_url.join(raw)
    };

    match resolved {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!(candidate = raw, error = %e, "dropping unparseable image reference");
            None
        }
    }
}

/// `scheme://host[:port]` of the page, without path or credentials.
fn origin_prefix(base: &Url) -> String {
    let host = base.host_str().unwrap_or_default();
    match base.port() {
        Some(port) => format!("{}://{}:{}", base.scheme(), host, port),
        None => format!("{}://{}", base.scheme(), host),
    }
}
