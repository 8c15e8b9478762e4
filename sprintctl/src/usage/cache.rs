//! Response cache for AI calls.
//!
//! Keyed by a fingerprint of (normalized prompt, provider, model). Entries
//! carry an absolute expiry; a stale entry is ignored on read, never purged.
//! A miss only costs an extra provider call, so there is no size bound and no
//! eviction beyond the TTL comparison.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::ai::Provider;
use crate::store::models::CachedResponse;
use crate::store::{Result, Store};

/// Collapse whitespace runs, trim, and lowercase so trivially reworded
/// prompts ("Estimate  this" vs "estimate this ") share a cache entry.
fn normalize_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Derive the cache key for a (prompt, provider, model) triple.
pub fn fingerprint(prompt: &str, provider: Provider, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_prompt(prompt).as_bytes());
    hasher.update(b"\n");
    hasher.update(provider.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(model.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_fresh(entry: &CachedResponse, now: DateTime<Utc>) -> bool {
    now < entry.expires_at
}

/// Look up a previously cached response.
///
/// Returns `None` on a cold miss or when the stored entry has expired; the
/// two are indistinguishable to the caller by design.
#[instrument(skip(store, prompt), err)]
pub async fn get_cached_response(store: &dyn Store, prompt: &str, provider: Provider, model: &str) -> Result<Option<CachedResponse>> {
    let key = fingerprint(prompt, provider, model);
    let entry = store.get_cached_response(&key).await?;
    Ok(entry.filter(|entry| is_fresh(entry, Utc::now())))
}

/// Write (or overwrite) the cache entry for a prompt, stamping creation and
/// expiry times from the given TTL.
#[instrument(skip(store, prompt, response_text), err)]
pub async fn cache_response(
    store: &dyn Store,
    prompt: &str,
    provider: Provider,
    model: &str,
    response_text: &str,
    token_count: i64,
    ttl: Duration,
) -> Result<()> {
    let now = Utc::now();
    let entry = CachedResponse {
        fingerprint: fingerprint(prompt, provider, model),
        provider,
        model: model.to_string(),
        response_text: response_text.to_string(),
        token_count,
        created_at: now,
        expires_at: now + ttl,
    };
    store.put_cached_response(&entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_fingerprint_ignores_whitespace_and_case() {
        let a = fingerprint("Estimate   this story", Provider::Openai, "gpt-4o");
        let b = fingerprint("  estimate this STORY ", Provider::Openai, "gpt-4o");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_by_provider_and_model() {
        let base = fingerprint("estimate this story", Provider::Openai, "gpt-4o");
        assert_ne!(base, fingerprint("estimate this story", Provider::Anthropic, "gpt-4o"));
        assert_ne!(base, fingerprint("estimate this story", Provider::Openai, "gpt-4o-mini"));
        assert_ne!(base, fingerprint("estimate another story", Provider::Openai, "gpt-4o"));
    }

    #[tokio::test]
    async fn test_round_trip_within_ttl() {
        let store = MemoryStore::new();
        cache_response(&store, "plan the sprint", Provider::Openai, "gpt-4o", "Do the must-haves first.", 42, Duration::hours(24))
            .await
            .unwrap();

        let hit = get_cached_response(&store, "plan the sprint", Provider::Openai, "gpt-4o")
            .await
            .unwrap()
            .expect("expected a cache hit");
        assert_eq!(hit.response_text, "Do the must-haves first.");
        assert_eq!(hit.token_count, 42);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let entry = CachedResponse {
            fingerprint: fingerprint("plan the sprint", Provider::Openai, "gpt-4o"),
            provider: Provider::Openai,
            model: "gpt-4o".to_string(),
            response_text: "stale".to_string(),
            token_count: 10,
            created_at: now - Duration::hours(48),
            expires_at: now - Duration::hours(24),
        };
        store.put_cached_response(&entry).await.unwrap();

        let hit = get_cached_response(&store, "plan the sprint", Provider::Openai, "gpt-4o").await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let store = MemoryStore::new();
        cache_response(&store, "p", Provider::Gemini, "gemini-2.0-flash", "first", 1, Duration::hours(1))
            .await
            .unwrap();
        cache_response(&store, "p", Provider::Gemini, "gemini-2.0-flash", "second", 2, Duration::hours(1))
            .await
            .unwrap();

        let hit = get_cached_response(&store, "p", Provider::Gemini, "gemini-2.0-flash")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.response_text, "second");
        assert_eq!(hit.token_count, 2);
    }
}
