use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::metadata::Metadata;
use crate::resolver::classify::is_direct_video_path;

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("Failed to parse meta selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Failed to parse title selector"));
static IFRAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe[src]").expect("Failed to parse iframe selector"));
static MEDIA_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("video[src], source[src]").expect("Failed to parse media selector")
});

const VIDEO_KEYS: [&str; 3] = ["og:video", "og:video:url", "og:video:secure_url"];
const PLAYER_KEYS: [&str; 1] = ["twitter:player"];
const TITLE_KEYS: [&str; 2] = ["og:title", "twitter:title"];
const DESCRIPTION_KEYS: [&str; 3] = ["og:description", "twitter:description", "description"];
const IMAGE_KEYS: [&str; 3] = ["og:image", "twitter:image", "twitter:image:src"];

/// `(key, content)` pairs of every `<meta>` in document order. `property`
/// wins over `name`, keys are lowercased.
fn meta_pairs(document: &Html) -> Vec<(String, String)> {
    document
        .select(&META_SELECTOR)
        .filter_map(|element| {
            let key = element.attr("property").or(element.attr("name"))?;
            let value = element.attr("content")?.trim();
            if value.is_empty() {
                return None;
            }
            Some((key.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

/// First value for the highest-ranked key present.
fn first_meta<'a>(pairs: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()))
}

fn absolute(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = base.join(href).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

fn is_direct_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| is_direct_video_path(u.path()))
        .unwrap_or(false)
}

/// Extract embeddable video data from an arbitrary HTML page.
///
/// Player candidates come from `og:video*`, then `twitter:player`, then the
/// first `<iframe src>`. Direct file links found in `<video>`/`<source>` (and
/// an `og:video` that points straight at a file) land in `media`; a file
/// `og:video` leaves no frame candidate, so it plays ahead of any iframe.
pub fn extract_video_page(html: &str, base: &Url) -> Metadata {
    let document = Html::parse_document(html);
    let pairs = meta_pairs(&document);

    let title = first_meta(&pairs, &TITLE_KEYS)
        .map(str::to_string)
        .or_else(|| {
            document
                .select(&TITLE_SELECTOR)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
        });

    let description = first_meta(&pairs, &DESCRIPTION_KEYS).map(str::to_string);
    let thumbnail_url = first_meta(&pairs, &IMAGE_KEYS).and_then(|v| absolute(base, v));

    let mut media: Vec<String> = Vec::new();
    let mut push_media = |url: String| {
        if !media.contains(&url) {
            media.push(url);
        }
    };

    // og:video outranks every other candidate, even when it is a plain file
    let embed_url = match first_meta(&pairs, &VIDEO_KEYS).and_then(|v| absolute(base, v)) {
        Some(video) if is_direct_url(&video) => {
            push_media(video);
            None
        }
        Some(video) => Some(video),
        None => first_meta(&pairs, &PLAYER_KEYS)
            .and_then(|v| absolute(base, v))
            .or_else(|| {
                document
                    .select(&IFRAME_SELECTOR)
                    .filter_map(|e| e.attr("src"))
                    .find_map(|src| absolute(base, src))
            }),
    };

    for element in document.select(&MEDIA_SELECTOR) {
        if let Some(src) = element.attr("src").and_then(|s| absolute(base, s)) {
            if is_direct_url(&src) {
                push_media(src);
            }
        }
    }

    Metadata {
        title,
        description,
        thumbnail_url,
        embed_url,
        media,
        ..Default::default()
    }
}
