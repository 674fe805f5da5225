//! Archive assembly: resolve, fetch through the pool, rewrite, serialize.

use super::encoding::{rewrite_references, to_ascii_markup};
use super::{Archive, ArchivePart};
use crate::config::{Config, ConfigUpdate};
use crate::error::{Error, Result};
use crate::fallback::{FetchOutcome, fetch_with_fallback};
use crate::fetcher::{FetchedResource, HttpFetcher, ResourceFetcher};
use crate::progress::ProgressSink;
use crate::resolver::{PatternResolver, ResourceResolver};
use crate::task_pool::{TaskContext, TaskPool};
use crate::types::ImageQuality;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

/// Builds snapshot archives, sharing one fetch pool across builds
///
/// The pool bounds concurrent fetches across every build running on this
/// builder, and can be resized while builds are in flight.
///
/// # Example
///
/// ```no_run
/// use snapshot_archiver::{ArchiveBuilder, Config, ImageQuality, NoopProgress};
///
/// # async fn example() -> snapshot_archiver::Result<()> {
/// let builder = ArchiveBuilder::new(Config::default())?;
///
/// let markup = r#"<a href="//cdn.example.com/a.png?type=orig"><img src="//cdn.example.com/a.png"></a>"#;
/// let archive = builder
///     .build("https://example.com/post/1", markup, ImageQuality::Original, &NoopProgress)
///     .await?;
///
/// std::fs::write("post-1.mhtml", archive.as_bytes()).ok();
/// # Ok(())
/// # }
/// ```
pub struct ArchiveBuilder {
    pool: TaskPool,
    fetcher: Arc<dyn ResourceFetcher>,
    resolver: Arc<dyn ResourceResolver>,
    tolerate_gone: AtomicBool,
}

impl ArchiveBuilder {
    /// Create a builder that fetches over HTTP and discovers resources by pattern
    ///
    /// Returns a configuration error if the config is invalid, or a network
    /// error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        let resolver = Arc::new(PatternResolver::from_config(&config));
        Self::with_components(config, fetcher, resolver)
    }

    /// Create a builder around caller-supplied fetching and discovery
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn ResourceFetcher>,
        resolver: Arc<dyn ResourceResolver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: TaskPool::new(config.max_concurrent_fetches)?,
            fetcher,
            resolver,
            tolerate_gone: AtomicBool::new(config.tolerate_gone_resources),
        })
    }

    /// The fetch pool shared by all builds
    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    /// Whether builds currently drop resources that answer HTTP 410
    pub fn tolerates_gone_resources(&self) -> bool {
        self.tolerate_gone.load(Ordering::Relaxed)
    }

    /// Apply runtime settings
    ///
    /// A new concurrency limit resizes the pool immediately, even mid-build.
    /// The gone-resource flag takes effect from the next build.
    pub fn update_config(&self, update: ConfigUpdate) -> Result<()> {
        if let Some(max) = update.max_concurrent_fetches {
            self.pool.resize(max)?;
        }
        if let Some(tolerate) = update.tolerate_gone_resources {
            self.tolerate_gone.store(tolerate, Ordering::Relaxed);
            tracing::info!(tolerate_gone_resources = tolerate, "gone-resource policy updated");
        }
        Ok(())
    }

    /// Snapshot `markup` (served from `url`) into an archive
    ///
    /// Every resource is fetched through the pool under one shared
    /// [`TaskContext`]. The first hard fetch failure interrupts the batch:
    /// resources that have not started are skipped, started ones are awaited,
    /// and the failure is returned without an archive.
    pub async fn build(
        &self,
        url: &str,
        markup: &str,
        quality: ImageQuality,
        progress: &dyn ProgressSink,
    ) -> Result<Archive> {
        let base = Url::parse(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let resources = self.resolver.extract(markup, &base, quality);
        let tolerate_gone = self.tolerates_gone_resources();

        tracing::info!(url, resources = resources.len(), %quality, "building snapshot archive");
        progress.init(resources.len());

        let ctx = TaskContext::new();
        let mut pending: FuturesUnordered<_> = resources
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let fetcher = Arc::clone(&self.fetcher);
                let descriptor = descriptor.clone();
                let batch = ctx.clone();
                self.pool
                    .submit(
                        move || async move {
                            let outcome =
                                fetch_with_fallback(fetcher.as_ref(), &descriptor, tolerate_gone)
                                    .await;
                            // Interrupt before the lane dispatches its next task
                            if outcome.is_err() {
                                batch.interrupt();
                            }
                            outcome.map_err(Error::from)
                        },
                        &ctx,
                    )
                    .map(move |result| (index, result))
            })
            .collect();

        let mut fetched: Vec<Option<(String, FetchedResource)>> = vec![None; resources.len()];
        let mut failure = None;
        while let Some((index, result)) = pending.next().await {
            match result {
                Ok(FetchOutcome::Fetched { location, resource }) => {
                    fetched[index] = Some((location, resource));
                    progress.finish_resource();
                }
                Ok(FetchOutcome::Gone) => progress.finish_resource(),
                Err(error) => {
                    if failure.is_none() {
                        tracing::warn!(url, error = %error, "snapshot batch interrupted");
                        ctx.interrupt();
                        failure = Some(error);
                    }
                }
            }
        }
        if let Some(error) = failure {
            tracing::error!(url, error = %error, "snapshot failed");
            return Err(error);
        }

        let mut locations = HashMap::new();
        let mut resource_parts = Vec::new();
        for (descriptor, entry) in resources.iter().zip(fetched) {
            if let Some((location, resource)) = entry {
                locations.insert(descriptor.raw.clone(), location.clone());
                resource_parts.push(ArchivePart::resource(
                    resource.content_type,
                    location,
                    resource.body,
                ));
            }
        }

        let document = to_ascii_markup(&rewrite_references(markup, &locations));
        let mut parts = Vec::with_capacity(resource_parts.len() + 1);
        parts.push(ArchivePart::document(base.as_str(), document));
        parts.extend(resource_parts);

        let archive = Archive::new(base.as_str(), parts);
        tracing::info!(
            url,
            parts = archive.parts().len(),
            bytes = archive.as_bytes().len(),
            "snapshot archive built"
        );
        Ok(archive)
    }
}

impl std::fmt::Debug for ArchiveBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBuilder")
            .field("pool", &self.pool)
            .field("tolerate_gone", &self.tolerates_gone_resources())
            .finish_non_exhaustive()
    }
}
