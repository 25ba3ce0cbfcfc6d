//! Selector discovery protocol against scripted oracles and real stores.

#![allow(clippy::unwrap_used)] // unwrap() is appropriate in tests for clear panic messages

mod common;

use std::cell::RefCell;

use chrono::Utc;
use common::{static_thread, thread_selectors, ScriptedOracle};
use rs_comment_harvest::{
    discover_selectors, DiscoveryOptions, JsonFileStore, MemoryStore, OracleError, ProgressUpdate, SelectorDiscovery,
    SelectorField, SelectorSource, Settings, SettingsStore, SiteIdentity,
};

const FULL_REPLY: &str = r##"Here you go:
```json
{"selectors": {"commentContainer": "#comments", "commentItem": ".comment", "username": ".author",
 "content": ".text", "timestamp": "time", "likes": ".likes", "replyToggle": ".show-replies"},
 "structure": "flat list of comments under the article", "confidence": 0.85}
```"##;

const WRONG_CONTENT: &str = r##"{"selectors": {"commentContainer": "#comments", "commentItem": ".comment",
 "username": ".author", "content": ".comment-body"}, "confidence": 0.99}"##;

fn site() -> SiteIdentity {
    SiteIdentity::new("news.example.com", "generic")
}

#[tokio::test(start_paused = true)]
async fn test_valid_reply_is_accepted_and_cached() {
    let doc = static_thread(5);
    let store = MemoryStore::default();
    let oracle = ScriptedOracle::new(vec![Ok(FULL_REPLY)]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(result.is_accepted());
    assert!((result.confidence() - 0.85).abs() < 1e-9);
    // optional field with zero matches is still accepted
    assert_eq!(result.selectors().get(SelectorField::ReplyToggle), Some(".show-replies"));

    let entry = store.snapshot().lookup(&site()).cloned().unwrap();
    assert_eq!(entry.success_count, 1);
    assert_eq!(entry.selectors.get(SelectorField::Content), Some(".text"));
}

#[tokio::test(start_paused = true)]
async fn test_content_without_matches_is_never_accepted() {
    let doc = static_thread(5);
    let store = MemoryStore::default();
    let oracle = ScriptedOracle::repeating(WRONG_CONTENT, 3);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(!result.is_accepted());
    assert_eq!(oracle.calls(), 3);
    assert!(result.confidence() < DiscoveryOptions::default().usability_threshold);
    assert!(store.snapshot().lookup(&site()).is_none());

    // proven fields survive; the failing one does not
    let selectors = result.selectors();
    assert_eq!(selectors.get(SelectorField::CommentItem), Some(".comment"));
    assert_eq!(selectors.get(SelectorField::Username), Some(".author"));
    assert_eq!(selectors.get(SelectorField::Content), None);
}

#[tokio::test(start_paused = true)]
async fn test_retry_prompt_names_failed_fields_and_keeps_proven_ones() {
    let doc = static_thread(5);
    let store = MemoryStore::default();
    let oracle = ScriptedOracle::new(vec![
        Ok(WRONG_CONTENT),
        Ok(r#"{"selectors": {"content": ".text"}, "confidence": 0.7}"#),
    ]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(result.is_accepted());
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("failed validation"));
    assert!(prompts[1].contains("zero matches for: content"));
    assert!(prompts[1].contains("- username: .author"));

    // the second reply only named content; the rest came from the first attempt
    let selectors = result.selectors();
    assert_eq!(selectors.get(SelectorField::CommentItem), Some(".comment"));
    assert_eq!(selectors.get(SelectorField::Content), Some(".text"));
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_skips_the_oracle() {
    let doc = static_thread(3);
    let mut settings = Settings::default();
    settings.upsert(&site(), thread_selectors(), Utc::now());
    let store = MemoryStore::new(settings);
    let oracle = ScriptedOracle::new(vec![]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(result.is_accepted());
    assert_eq!(result.confidence(), 1.0);
    assert_eq!(oracle.calls(), 0);
    let inner = result.into_inner();
    assert_eq!(inner.source, SelectorSource::Cache);
    assert_eq!(store.snapshot().lookup(&site()).map(|e| e.success_count), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_stale_cache_seeds_the_next_attempt() {
    let doc = static_thread(3);
    let mut stale = thread_selectors();
    stale.content = Some(".old-body".into());
    let mut settings = Settings::default();
    settings.upsert(&site(), stale, Utc::now());
    let store = MemoryStore::new(settings);
    let oracle = ScriptedOracle::new(vec![Ok(r#"{"selectors": {"content": ".text"}, "confidence": 0.9}"#)]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(result.is_accepted());
    assert_eq!(oracle.calls(), 1);
    let entry = store.snapshot().lookup(&site()).cloned().unwrap();
    assert_eq!(entry.success_count, 2);
    assert_eq!(entry.selectors.get(SelectorField::Content), Some(".text"));
    assert_eq!(entry.selectors.get(SelectorField::Username), Some(".author"));
}

#[tokio::test(start_paused = true)]
async fn test_oracle_failures_degrade_to_best_effort() {
    let doc = static_thread(3);
    let store = MemoryStore::default();
    let oracle = ScriptedOracle::new(vec![
        Err(OracleError::Request("connection reset".into())),
        Ok("I cannot help with that."),
        Err(OracleError::Timeout(60)),
    ]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(!result.is_accepted());
    assert_eq!(result.confidence(), 0.0);
    assert!(result.selectors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_comes_from_settings() {
    let doc = static_thread(3);
    let store = MemoryStore::new(Settings {
        retry_budget: 1,
        ..Settings::default()
    });
    let oracle = ScriptedOracle::repeating(WRONG_CONTENT, 5);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(!result.is_accepted());
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_options_override_settings() {
    let doc = static_thread(3);
    let store = MemoryStore::default();
    let oracle = ScriptedOracle::repeating(WRONG_CONTENT, 5);
    let options = DiscoveryOptions {
        retry_budget: 2,
        ..DiscoveryOptions::default()
    };

    SelectorDiscovery::new(&store, &oracle)
        .with_options(options)
        .run(&doc, &site(), None)
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_progress_reports_stage_labels() {
    let doc = static_thread(3);
    let store = MemoryStore::default();
    let oracle = ScriptedOracle::new(vec![Ok(FULL_REPLY)]);
    let labels = RefCell::new(Vec::new());
    let record = |update: ProgressUpdate| labels.borrow_mut().push(update.stage.to_string());

    discover_selectors(&doc, &site(), &store, &oracle, Some(&record)).await.unwrap();

    let labels = labels.borrow();
    assert_eq!(labels[0], "Checking selector cache");
    assert!(labels.iter().any(|l| l.starts_with("Analyzing page structure (attempt 1, part 1/")));
    assert!(labels.iter().any(|l| l == "Testing selectors (attempt 1)"));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_settings_service_is_an_error() {
    let doc = static_thread(3);
    let store = MemoryStore::default();
    store.set_unreachable(true);
    let oracle = ScriptedOracle::new(vec![Ok(FULL_REPLY)]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await;
    assert!(result.is_err());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_json_file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let doc = static_thread(4);

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load().await.unwrap(), Settings::default());
    let oracle = ScriptedOracle::new(vec![Ok(FULL_REPLY)]);
    let first = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();
    assert!(first.is_accepted());
    assert!(path.exists());

    let reopened = JsonFileStore::new(&path);
    let silent = ScriptedOracle::new(vec![]);
    let second = discover_selectors(&doc, &site(), &reopened, &silent, None).await.unwrap();
    assert_eq!(second.into_inner().source, SelectorSource::Cache);
    assert_eq!(silent.calls(), 0);

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        saved["selectorCache"]["news.example.com"]["generic"]["successCount"],
        serde_json::json!(2)
    );
}

#[tokio::test(start_paused = true)]
async fn test_unsure_oracle_is_surfaced_as_best_effort() {
    let doc = static_thread(5);
    let store = MemoryStore::default();
    let unsure = FULL_REPLY.replace("0.85", "0.05");
    let oracle = ScriptedOracle::new(vec![Ok(unsure.as_str())]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();

    assert!(!result.is_accepted());
    assert!((result.confidence() - 0.05).abs() < 1e-9);
    assert_eq!(result.selectors().get(SelectorField::Content), Some(".text"));
    assert!(store.snapshot().lookup(&site()).is_none());
}

#[tokio::test]
async fn test_discovery_keeps_settings_it_does_not_own() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"aiModel": "large", "apiKey": "sk-test", "theme": "dark", "retryBudget": 2}"#,
    )
    .unwrap();
    let doc = static_thread(4);
    let store = JsonFileStore::new(&path);
    let oracle = ScriptedOracle::new(vec![Ok(FULL_REPLY)]);

    let result = discover_selectors(&doc, &site(), &store, &oracle, None).await.unwrap();
    assert!(result.is_accepted());

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["aiModel"], "large");
    assert_eq!(saved["apiKey"], "sk-test");
    assert_eq!(saved["theme"], "dark");
    assert_eq!(saved["retryBudget"], 2);
    assert_eq!(saved["selectorCache"]["news.example.com"]["generic"]["successCount"], 1);
}
