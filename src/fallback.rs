//! Single-tier fallback for resource fetches
//!
//! A resource is fetched from its rendering URL. If that fails and the
//! rendering URL is not already the preview URL, the preview URL is tried
//! once. There is no backoff and no further retry.
//!
//! The final failure is terminal unless it is HTTP 410 and gone resources are
//! tolerated, in which case the resource is dropped from the archive.

use crate::error::FetchError;
use crate::fetcher::{FetchedResource, ResourceFetcher};
use crate::resolver::ResourceDescriptor;

/// Result of fetching one resource through the fallback policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The resource was fetched
    Fetched {
        /// URL that actually served the resource
        location: String,
        /// The fetched body and type
        resource: FetchedResource,
    },
    /// The resource is permanently gone and tolerated; it is omitted
    Gone,
}

/// Fetch `descriptor.rendering`, falling back to `descriptor.preview` once
///
/// # Example
///
/// ```no_run
/// use snapshot_archiver::fallback::{FetchOutcome, fetch_with_fallback};
/// use snapshot_archiver::{Config, HttpFetcher, ImageQuality, PatternResolver, ResourceResolver};
///
/// # async fn example() -> snapshot_archiver::Result<()> {
/// let fetcher = HttpFetcher::new(&Config::default())?;
/// let base = url::Url::parse("https://example.com/post/1").expect("valid url");
/// let resources = PatternResolver::default().extract(
///     r#"<img src="/a.png">"#,
///     &base,
///     ImageQuality::Original,
/// );
///
/// match fetch_with_fallback(&fetcher, &resources[0], true).await? {
///     FetchOutcome::Fetched { location, .. } => println!("fetched {location}"),
///     FetchOutcome::Gone => println!("resource is gone"),
/// }
/// # Ok(())
/// # }
/// ```
pub async fn fetch_with_fallback(
    fetcher: &dyn ResourceFetcher,
    descriptor: &ResourceDescriptor,
    tolerate_gone: bool,
) -> Result<FetchOutcome, FetchError> {
    let error = match fetcher.fetch(&descriptor.rendering).await {
        Ok(resource) => {
            return Ok(FetchOutcome::Fetched {
                location: descriptor.rendering.clone(),
                resource,
            });
        }
        Err(error) => error,
    };

    let error = if descriptor.has_fallback() {
        tracing::warn!(
            error = %error,
            fallback = %descriptor.preview,
            "rendering URL failed, falling back to preview"
        );
        match fetcher.fetch(&descriptor.preview).await {
            Ok(resource) => {
                return Ok(FetchOutcome::Fetched {
                    location: descriptor.preview.clone(),
                    resource,
                });
            }
            Err(error) => error,
        }
    } else {
        error
    };

    if tolerate_gone && error.is_gone() {
        tracing::warn!(url = %error.url(), raw = %descriptor.raw, "resource gone, omitting it");
        return Ok(FetchOutcome::Gone);
    }

    tracing::error!(error = %error, raw = %descriptor.raw, "resource fetch failed");
    Err(error)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fetcher that answers from a fixed table and records every request
    struct ScriptedFetcher {
        statuses: HashMap<String, u16>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(statuses: &[(&str, u16)]) -> Self {
            Self {
                statuses: statuses
                    .iter()
                    .map(|(url, status)| (url.to_string(), *status))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ResourceFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.statuses.get(url).copied().unwrap_or(404) {
                200 => Ok(FetchedResource {
                    content_type: "image/png".into(),
                    body: url.as_bytes().to_vec(),
                }),
                status => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
            }
        }
    }

    fn descriptor(rendering: &str, preview: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            raw: "/raw.png".into(),
            preview: preview.into(),
            original: rendering.into(),
            rendering: rendering.into(),
            preview_only: false,
        }
    }

    const ORIG: &str = "https://cdn.example.com/a.png?type=orig";
    const PREV: &str = "https://cdn.example.com/a.png";

    #[tokio::test]
    async fn rendering_success_needs_one_request() {
        let fetcher = ScriptedFetcher::new(&[(ORIG, 200)]);

        let outcome = fetch_with_fallback(&fetcher, &descriptor(ORIG, PREV), false)
            .await
            .unwrap();

        assert!(matches!(outcome, FetchOutcome::Fetched { ref location, .. } if location == ORIG));
        assert_eq!(fetcher.requests(), vec![ORIG]);
    }

    #[tokio::test]
    async fn failed_original_falls_back_to_preview() {
        let fetcher = ScriptedFetcher::new(&[(ORIG, 500), (PREV, 200)]);

        let outcome = fetch_with_fallback(&fetcher, &descriptor(ORIG, PREV), false)
            .await
            .unwrap();

        assert!(matches!(outcome, FetchOutcome::Fetched { ref location, .. } if location == PREV));
        assert_eq!(fetcher.requests(), vec![ORIG, PREV]);
    }

    #[tokio::test]
    async fn preview_rendering_has_no_second_tier() {
        let fetcher = ScriptedFetcher::new(&[(PREV, 503)]);

        let err = fetch_with_fallback(&fetcher, &descriptor(PREV, PREV), true)
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Status { url: PREV.into(), status: 503 });
        assert_eq!(fetcher.requests(), vec![PREV], "no retry of the same URL");
    }

    #[tokio::test]
    async fn both_tiers_failing_reports_the_preview_error() {
        let fetcher = ScriptedFetcher::new(&[(ORIG, 500), (PREV, 404)]);

        let err = fetch_with_fallback(&fetcher, &descriptor(ORIG, PREV), true)
            .await
            .unwrap_err();

        assert_eq!(err.url(), PREV);
        assert!(!err.is_gone());
    }

    #[tokio::test]
    async fn gone_is_dropped_only_when_tolerated() {
        let fetcher = ScriptedFetcher::new(&[(ORIG, 410), (PREV, 410)]);

        let tolerated = fetch_with_fallback(&fetcher, &descriptor(ORIG, PREV), true)
            .await
            .unwrap();
        assert_eq!(tolerated, FetchOutcome::Gone);

        let strict = fetch_with_fallback(&fetcher, &descriptor(ORIG, PREV), false)
            .await
            .unwrap_err();
        assert!(strict.is_gone());
    }

    #[tokio::test]
    async fn gone_original_with_broken_preview_is_a_hard_failure() {
        let fetcher = ScriptedFetcher::new(&[(ORIG, 410), (PREV, 500)]);

        let err = fetch_with_fallback(&fetcher, &descriptor(ORIG, PREV), true)
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Status { url: PREV.into(), status: 500 });
    }
}
