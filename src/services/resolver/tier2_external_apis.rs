//! Tier 2: external API waterfall.
//!
//! Platform id lookup, then Spotify search, then ISRC search (authoritative
//! when it hits), then MusicBrainz text search, then a label-catalog
//! service, then a popularity/tags service. Each step is cached with its own
//! TTL so a re-enrichment attempt within the cache window doesn't repeat an
//! external call. Grounded on `identity_resolver.rs::resolve()`'s
//! step-by-step waterfall, generalized from "match an artist" to "match
//! anything this tier can be asked for".

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use uuid::Uuid;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalSource {
    PlatformId,
    Spotify,
    Isrc,
    MusicBrainzText,
    LabelCatalog,
    PopularityTags,
}

impl ExternalSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::PlatformId => "platform_id",
            Self::Spotify => "spotify",
            Self::Isrc => "isrc",
            Self::MusicBrainzText => "musicbrainz_text",
            Self::LabelCatalog => "label_catalog",
            Self::PopularityTags => "popularity_tags",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalMatch {
    pub artist_id: Option<Uuid>,
    pub label: Option<String>,
    pub confidence: f64,
    pub source: ExternalSource,
}

/// Lookup context passed down the waterfall: whichever identifiers are
/// already known for the citation being resolved.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    pub artist_name: String,
    pub track_title: String,
    pub isrc: Option<String>,
    pub platform: Option<String>,
    pub platform_id: Option<String>,
}

/// One external provider call per waterfall step. A real deployment wires
/// each method to its own credentialed client (OAuth client-credentials for
/// the streaming platform, PAT for the catalog service, API key for
/// popularity/tags); kept as one trait here so the waterfall can be driven
/// by a single mock in tests.
#[async_trait]
pub trait ExternalResolverClient: Send + Sync {
    async fn platform_id_lookup(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<Option<ExternalMatch>, PipelineError>;

    async fn spotify_search(
        &self,
        artist_name: &str,
        track_title: &str,
    ) -> Result<Option<ExternalMatch>, PipelineError>;

    async fn isrc_search(&self, isrc: &str) -> Result<Option<ExternalMatch>, PipelineError>;

    async fn musicbrainz_text_search(
        &self,
        artist_name: &str,
        track_title: &str,
    ) -> Result<Option<ExternalMatch>, PipelineError>;

    async fn label_catalog_lookup(
        &self,
        artist_name: &str,
        track_title: &str,
    ) -> Result<Option<ExternalMatch>, PipelineError>;

    async fn popularity_tags_lookup(
        &self,
        artist_name: &str,
        track_title: &str,
    ) -> Result<Option<ExternalMatch>, PipelineError>;
}

/// Per-source TTL cache keyed by `(source, lookup key)`. `ttl` is a single
/// config value here; the per-source override lives in `ResolverConfig` and
/// is applied by the caller when constructing this cache.
pub struct ExternalApiCache {
    cache: Cache<(ExternalSource, String), Option<ExternalMatch>>,
}

impl ExternalApiCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).build(),
        }
    }

    async fn get_or_fetch<F, Fut>(
        &self,
        source: ExternalSource,
        key: String,
        fetch: F,
    ) -> Result<Option<ExternalMatch>, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<ExternalMatch>, PipelineError>>,
    {
        if let Some(hit) = self.cache.get(&(source, key.clone())).await {
            return Ok(hit);
        }
        let result = fetch().await?;
        self.cache.insert((source, key), result.clone()).await;
        Ok(result)
    }
}

/// Runs the full waterfall, returning the first hit. ISRC search is
/// authoritative: a hit there is returned immediately even if an earlier
/// step would otherwise have continued past it in priority, since the
/// waterfall already places it ahead of MusicBrainz/label/popularity steps.
pub async fn resolve(
    client: &dyn ExternalResolverClient,
    cache: &ExternalApiCache,
    ctx: &LookupContext,
) -> Result<Option<ExternalMatch>, PipelineError> {
    if let (Some(platform), Some(platform_id)) = (&ctx.platform, &ctx.platform_id) {
        let key = format!("{platform}:{platform_id}");
        let hit = cache
            .get_or_fetch(ExternalSource::PlatformId, key, || {
                client.platform_id_lookup(platform, platform_id)
            })
            .await?;
        if hit.is_some() {
            return Ok(hit);
        }
    }

    let hit = cache
        .get_or_fetch(ExternalSource::Spotify, format!("{}:{}", ctx.artist_name, ctx.track_title), || {
            client.spotify_search(&ctx.artist_name, &ctx.track_title)
        })
        .await?;
    if hit.is_some() {
        return Ok(hit);
    }

    if let Some(isrc) = &ctx.isrc {
        let hit = cache
            .get_or_fetch(ExternalSource::Isrc, isrc.clone(), || client.isrc_search(isrc))
            .await?;
        if hit.is_some() {
            return Ok(hit);
        }
    }

    let hit = cache
        .get_or_fetch(
            ExternalSource::MusicBrainzText,
            format!("{}:{}", ctx.artist_name, ctx.track_title),
            || client.musicbrainz_text_search(&ctx.artist_name, &ctx.track_title),
        )
        .await?;
    if hit.is_some() {
        return Ok(hit);
    }

    let hit = cache
        .get_or_fetch(
            ExternalSource::LabelCatalog,
            format!("{}:{}", ctx.artist_name, ctx.track_title),
            || client.label_catalog_lookup(&ctx.artist_name, &ctx.track_title),
        )
        .await?;
    if hit.is_some() {
        return Ok(hit);
    }

    cache
        .get_or_fetch(
            ExternalSource::PopularityTags,
            format!("{}:{}", ctx.artist_name, ctx.track_title),
            || client.popularity_tags_lookup(&ctx.artist_name, &ctx.track_title),
        )
        .await
}
