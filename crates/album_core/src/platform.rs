use url::Url;

/// Host serving articles and albums.
pub const PLATFORM_HOST: &str = "mp.weixin.qq.com";
/// Path of the article-serving endpoint.
pub const ARTICLE_PATH: &str = "/s";
/// Query parameter that uniquely identifies the publishing account of an article.
pub const ARTICLE_ID_PARAM: &str = "__biz";
/// Path fragment present in every album URL.
pub const ALBUM_MARKER: &str = "appmsgalbum";
/// The only host trusted to serve article images.
pub const IMAGE_CDN_HOST: &str = "mmbiz.qpic.cn";
/// Title used when no title strategy produced a value.
pub const UNKNOWN_TITLE: &str = "未知标题";
/// Generic landing-page title; seeing it means the real title selector missed.
pub const LANDING_PAGE_TITLE: &str = "微信公众平台";

/// Normalizes a raw href found in album markup into a canonical article URL.
///
/// Decodes `&amp;` entities, resolves relative and protocol-relative references
/// against the platform host, upgrades `http` to `https`, lowercases the host
/// and drops the fragment. Returns `None` when the result is not an article URL.
pub fn normalize_article_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().replace("&amp;", "&");
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with('#') {
        return None;
    }

    let base = Url::parse(&format!("https://{PLATFORM_HOST}/")).ok()?;
    let mut url = match Url::parse(&trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(&trimmed).ok()?,
        Err(_) => return None,
    };

    if url.scheme() == "http" {
        url.set_scheme("https").ok()?;
    }
    url.set_fragment(None);

    if is_article(&url) {
        Some(url.to_string())
    } else {
        None
    }
}

/// Returns true when `raw` points at the platform host over http(s).
pub fn is_platform_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| {
            matches!(url.scheme(), "http" | "https") && url.host_str() == Some(PLATFORM_HOST)
        })
        .unwrap_or(false)
}

/// Returns true when `raw` is a platform URL pointing at an album listing.
pub fn is_album_url(raw: &str) -> bool {
    is_platform_url(raw) && raw.contains(ALBUM_MARKER)
}

fn is_article(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
        && url.host_str() == Some(PLATFORM_HOST)
        && url.path() == ARTICLE_PATH
        && url
            .query_pairs()
            .any(|(key, value)| key == ARTICLE_ID_PARAM && !value.is_empty())
}
