//! Pet image URL resolution.
//!
//! Pets reach us with image data in several shapes: full URLs, paths with an
//! extension, bare filenames, or nothing at all. [`resolve_image`] turns any
//! of these into something an `<img>` tag can use without touching the
//! network. When a resolved URL has no file extension the backend negotiates
//! the format; if that fails, [`probe_extensions`] tries the known extensions
//! in a fixed order and stops at the first one that loads.
//!
//! [`ImageResolver`] memoises the final URL per pet so a pet is probed at
//! most once per process.

mod probe;
mod resolver;

pub use probe::{HttpProbe, ImageProbe};
pub use resolver::ImageResolver;

use pawmart_core::Pet;

/// Placeholder shown when a pet has no usable image.
pub const DEFAULT_PET_IMAGE: &str = "/static/images/pet-placeholder.svg";

/// Path under which the backend serves pet images.
pub const IMAGE_PATH: &str = "/api/v1/pets/images/";

/// Extensions that mark a URL as already pointing at a concrete file.
pub const KNOWN_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "svg"];

/// Extensions tried, in order, when an extension-less URL fails to load.
pub const PROBE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".webp", ".gif"];

/// Result of probing alternate extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// First candidate URL that loaded.
    Found(String),
    /// Every candidate failed.
    Exhausted,
}

/// Resolve a displayable image URL for a pet without any network access.
///
/// 1. No non-blank image field: the default placeholder.
/// 2. A URL with a known extension, an absolute URL, or a URL already under
///    the backend image path: returned unchanged.
/// 3. Anything else is treated as a bare filename. Its path and extension are
///    stripped and it is served from `{api_origin}/api/v1/pets/images/{name}`
///    without an extension.
#[must_use]
pub fn resolve_image(pet: &Pet, api_origin: &str) -> String {
    let Some(candidate) = pet.image_candidate() else {
        return DEFAULT_PET_IMAGE.to_string();
    };

    let origin = api_origin.trim_end_matches('/');

    if has_known_extension(candidate)
        || is_absolute(candidate)
        || candidate.starts_with(&format!("{origin}{IMAGE_PATH}"))
    {
        return candidate.to_string();
    }

    bare_name(candidate).map_or_else(
        || DEFAULT_PET_IMAGE.to_string(),
        |name| format!("{origin}{IMAGE_PATH}{}", urlencoding::encode(name)),
    )
}

/// Whether the last path segment ends in one of [`KNOWN_EXTENSIONS`].
#[must_use]
pub fn has_known_extension(url: &str) -> bool {
    last_segment(strip_query(url))
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            KNOWN_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Append an extension to a URL, keeping any query string or fragment last.
#[must_use]
pub fn with_extension(url: &str, ext: &str) -> String {
    let base = strip_query(url);
    let suffix = url.get(base.len()..).unwrap_or_default();
    format!("{base}{ext}{suffix}")
}

/// Probe [`PROBE_EXTENSIONS`] in order against an extension-less URL.
///
/// Probing is sequential and stops at the first success, which bounds the
/// number of failed requests at the cost of latency proportional to the
/// number of extensions tried.
pub async fn probe_extensions<P>(probe: &P, url: &str) -> ProbeOutcome
where
    P: ImageProbe + ?Sized,
{
    for ext in PROBE_EXTENSIONS {
        let candidate = with_extension(url, ext);
        if probe.probe(&candidate).await {
            tracing::debug!(url = %candidate, "Image probe hit");
            return ProbeOutcome::Found(candidate);
        }
    }

    tracing::debug!(url, "Image probes exhausted");
    ProbeOutcome::Exhausted
}

fn is_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://", "//", "data:", "blob:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn last_segment(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Filename without directories or extension. `None` if nothing is left.
fn bare_name(candidate: &str) -> Option<&str> {
    let name = last_segment(strip_query(candidate));
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem).trim();
    (!stem.is_empty()).then_some(stem)
}
