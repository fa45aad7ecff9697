//! Tests for LRU bounds and eviction ordering.

use super::*;

fn entry(marker: &str) -> CachedResponse {
    CachedResponse {
        etag: format!("\"{}\"", marker),
        body: serde_json::json!({ "marker": marker }),
    }
}

#[test]
fn test_get_returns_inserted_entry() {
    let cache = ResponseCache::new(10);
    cache.insert("k1".to_string(), entry("a"));

    let hit = cache.get("k1").expect("entry should be present");
    assert_eq!(hit.etag, "\"a\"");
    assert!(cache.get("missing").is_none());
}

#[test]
fn test_capacity_is_never_exceeded() {
    let cache = ResponseCache::new(5);
    for i in 0..20 {
        cache.insert(format!("k{}", i), entry(&i.to_string()));
        assert!(cache.len() <= 5, "cache exceeded capacity at insert {}", i);
    }
    assert_eq!(cache.len(), 5);
}

#[test]
fn test_eviction_removes_least_recently_used() {
    let cache = ResponseCache::new(3);
    cache.insert("k0".to_string(), entry("0"));
    cache.insert("k1".to_string(), entry("1"));
    cache.insert("k2".to_string(), entry("2"));

    // Touch k0 so k1 becomes the least recently used.
    cache.get("k0");

    cache.insert("k3".to_string(), entry("3"));

    assert!(cache.get("k1").is_none(), "k1 should have been evicted");
    assert!(cache.get("k0").is_some());
    assert!(cache.get("k2").is_some());
    assert!(cache.get("k3").is_some());
}

#[test]
fn test_eviction_order_across_a_sequence_of_accesses() {
    let cache = ResponseCache::new(3);
    cache.insert("a".to_string(), entry("a"));
    cache.insert("b".to_string(), entry("b"));
    cache.insert("c".to_string(), entry("c"));

    cache.get("a");
    cache.get("b");

    // c is now the LRU entry.
    cache.insert("d".to_string(), entry("d"));
    assert!(cache.get("c").is_none());

    // a was touched before b; after inserting e, a is the LRU entry.
    cache.insert("e".to_string(), entry("e"));
    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_some());
}

#[test]
fn test_reinserting_updates_without_growing() {
    let cache = ResponseCache::new(2);
    cache.insert("k".to_string(), entry("old"));
    cache.insert("k".to_string(), entry("new"));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("k").unwrap().etag, "\"new\"");
}

#[test]
fn test_cache_key_separates_token_scopes() {
    let url = "https://api.github.com/repos/o/r/check-runs/1";
    let key_a = ResponseCache::cache_key(url, "token-a");
    let key_b = ResponseCache::cache_key(url, "token-b");

    assert_ne!(key_a, key_b, "different tokens must not share entries");
    assert!(!key_a.contains("token-a"), "token must not appear in the key");
}

#[test]
fn test_cache_key_is_stable() {
    let url = "https://api.github.com/repos/o/r";
    assert_eq!(
        ResponseCache::cache_key(url, "t"),
        ResponseCache::cache_key(url, "t")
    );
}
