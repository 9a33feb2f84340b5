//! Memoising image resolver.

use std::time::Duration;

use moka::future::Cache;
use pawmart_core::{Pet, PetId};
use tracing::instrument;

use super::{
    DEFAULT_PET_IMAGE, ImageProbe, ProbeOutcome, has_known_extension, probe_extensions,
    resolve_image,
};

/// Resolves pet image URLs and remembers the answer per pet.
///
/// The memo is shared by every shopper: a pet's image does not depend on who
/// is looking at it. Entries idle for an hour are dropped.
pub struct ImageResolver<P> {
    probe: P,
    api_origin: String,
    resolved: Cache<PetId, String>,
}

impl<P: ImageProbe> ImageResolver<P> {
    /// Create a resolver that builds backend image URLs from `api_origin`.
    #[must_use]
    pub fn new(probe: P, api_origin: impl Into<String>) -> Self {
        let resolved = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(3600))
            .build();

        Self {
            probe,
            api_origin: api_origin.into(),
            resolved,
        }
    }

    /// Backend origin used for bare filenames.
    #[must_use]
    pub fn api_origin(&self) -> &str {
        &self.api_origin
    }

    /// Best URL known right now, without touching the network.
    ///
    /// Returns the memoised URL if the pet was resolved before, otherwise the
    /// pure resolution. Callers rendering before [`Self::resolve`] has run
    /// must treat this as provisional.
    pub async fn provisional(&self, pet: &Pet) -> String {
        match self.resolved.get(&pet.id).await {
            Some(url) => url,
            None => resolve_image(pet, &self.api_origin),
        }
    }

    /// Resolve a pet's image, probing if needed, and memoise the result.
    ///
    /// A memoised pet is answered from the memo with no probing. Otherwise an
    /// extension-less URL is loaded as-is first; if that fails the
    /// extensions are probed and exhaustion falls back to the placeholder.
    /// A pet without image fields gets the placeholder and nothing is
    /// memoised, so a later copy of the pet that has an image still resolves.
    #[instrument(skip(self, pet), fields(pet_id = %pet.id))]
    pub async fn resolve(&self, pet: &Pet) -> String {
        if let Some(url) = self.resolved.get(&pet.id).await {
            return url;
        }

        let url = resolve_image(pet, &self.api_origin);
        if url == DEFAULT_PET_IMAGE {
            return url;
        }

        let url = if needs_probe(&url) && !self.probe.probe(&url).await {
            self.fallback(&url).await
        } else {
            url
        };

        self.resolved.insert(pet.id, url.clone()).await;
        url
    }

    /// Handle a failed render of a pet's image.
    ///
    /// Drops the memo entry and probes the alternate extensions of the
    /// extension-less URL. URLs that already had an extension go straight to
    /// the placeholder.
    #[instrument(skip(self, pet), fields(pet_id = %pet.id))]
    pub async fn report_failure(&self, pet: &Pet) -> String {
        self.resolved.invalidate(&pet.id).await;

        let url = resolve_image(pet, &self.api_origin);
        if url == DEFAULT_PET_IMAGE {
            return url;
        }

        let url = if needs_probe(&url) {
            self.fallback(&url).await
        } else {
            DEFAULT_PET_IMAGE.to_string()
        };

        self.resolved.insert(pet.id, url.clone()).await;
        url
    }

    /// Forget the memoised URL for a pet.
    pub async fn forget(&self, pet_id: PetId) {
        self.resolved.invalidate(&pet_id).await;
    }

    async fn fallback(&self, url: &str) -> String {
        match probe_extensions(&self.probe, url).await {
            ProbeOutcome::Found(found) => found,
            ProbeOutcome::Exhausted => {
                tracing::warn!(url, "No image extension loaded, using placeholder");
                DEFAULT_PET_IMAGE.to_string()
            }
        }
    }
}

fn needs_probe(url: &str) -> bool {
    url != DEFAULT_PET_IMAGE && !has_known_extension(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Probe that succeeds for a fixed set of URLs and records every attempt.
    struct FakeProbe {
        loads: HashSet<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn new(loads: &[&str]) -> Self {
            Self {
                loads: loads.iter().map(|s| (*s).to_string()).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl ImageProbe for FakeProbe {
        async fn probe(&self, url: &str) -> bool {
            self.attempts.lock().unwrap().push(url.to_string());
            self.loads.contains(url)
        }
    }

    fn pet(id: i64, image: &str) -> Pet {
        let mut pet: Pet = serde_json::from_str(&format!(r#"{{"id": {id}}}"#)).unwrap();
        pet.image = Some(image.to_string());
        pet
    }

    const BASE: &str = "http://localhost:8080/api/v1/pets/images/rex";

    #[tokio::test]
    async fn test_extension_less_url_that_loads_needs_one_probe() {
        let resolver = ImageResolver::new(FakeProbe::new(&[BASE]), "http://localhost:8080");

        assert_eq!(resolver.resolve(&pet(1, "rex")).await, BASE);
        assert_eq!(resolver.probe.attempts(), vec![BASE.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_load_probes_extensions_in_order() {
        let jpg = format!("{BASE}.jpg");
        let resolver = ImageResolver::new(FakeProbe::new(&[&jpg]), "http://localhost:8080");

        assert_eq!(resolver.resolve(&pet(1, "rex")).await, jpg);
        assert_eq!(
            resolver.probe.attempts(),
            vec![BASE.to_string(), format!("{BASE}.png"), jpg.clone()]
        );
    }

    #[tokio::test]
    async fn test_exhausted_probe_falls_back_to_placeholder() {
        let resolver = ImageResolver::new(FakeProbe::new(&[]), "http://localhost:8080");

        assert_eq!(resolver.resolve(&pet(1, "rex")).await, DEFAULT_PET_IMAGE);
        // Base URL plus every extension.
        assert_eq!(resolver.probe.attempts().len(), 6);
    }

    #[tokio::test]
    async fn test_resolution_is_memoised() {
        let jpg = format!("{BASE}.jpg");
        let resolver = ImageResolver::new(FakeProbe::new(&[&jpg]), "http://localhost:8080");
        let rex = pet(1, "rex");

        let first = resolver.resolve(&rex).await;
        let probes = resolver.probe.attempts().len();
        let second = resolver.resolve(&rex).await;

        assert_eq!(first, second);
        assert_eq!(resolver.probe.attempts().len(), probes);
        assert_eq!(resolver.provisional(&rex).await, jpg);
    }

    #[tokio::test]
    async fn test_url_with_extension_is_not_probed() {
        let resolver = ImageResolver::new(FakeProbe::new(&[]), "http://localhost:8080");

        assert_eq!(resolver.resolve(&pet(1, "rex.png")).await, "rex.png");
        assert!(resolver.probe.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_report_failure_skips_the_failed_base_url() {
        let gif = format!("{BASE}.gif");
        let resolver = ImageResolver::new(FakeProbe::new(&[BASE, &gif]), "http://localhost:8080");
        let rex = pet(1, "rex");

        assert_eq!(resolver.resolve(&rex).await, BASE);
        assert_eq!(resolver.report_failure(&rex).await, gif);

        let attempts = resolver.probe.attempts();
        assert_eq!(attempts.len(), 6);
        assert_eq!(attempts.iter().filter(|a| *a == BASE).count(), 1);
        assert_eq!(resolver.provisional(&rex).await, gif);
    }

    #[tokio::test]
    async fn test_report_failure_with_extension_uses_placeholder() {
        let resolver = ImageResolver::new(FakeProbe::new(&[]), "http://localhost:8080");

        assert_eq!(
            resolver.report_failure(&pet(1, "rex.png")).await,
            DEFAULT_PET_IMAGE
        );
    }

    #[tokio::test]
    async fn test_forget_allows_re_resolution() {
        let resolver = ImageResolver::new(FakeProbe::new(&[BASE]), "http://localhost:8080");
        let rex = pet(1, "rex");

        resolver.resolve(&rex).await;
        resolver.forget(rex.id).await;
        resolver.resolve(&rex).await;

        assert_eq!(resolver.probe.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_pet_without_image_does_not_shadow_later_image() {
        let resolver = ImageResolver::new(FakeProbe::new(&[BASE]), "http://localhost:8080");
        let bare: Pet = serde_json::from_str(r#"{"id": 1, "name": "Rex"}"#).unwrap();

        assert_eq!(resolver.resolve(&bare).await, DEFAULT_PET_IMAGE);
        assert_eq!(resolver.report_failure(&bare).await, DEFAULT_PET_IMAGE);
        assert!(resolver.probe.attempts().is_empty());

        assert_eq!(resolver.provisional(&pet(1, "rex")).await, BASE);
        assert_eq!(resolver.resolve(&pet(1, "rex")).await, BASE);
    }

    #[tokio::test]
    async fn test_provisional_does_not_probe() {
        let resolver = ImageResolver::new(FakeProbe::new(&[]), "http://localhost:8080");

        assert_eq!(resolver.provisional(&pet(1, "rex")).await, BASE);
        assert!(resolver.probe.attempts().is_empty());
    }
}
