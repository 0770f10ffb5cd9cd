use super::Store;
use crate::style::{CommunicationStyle, Topic};
use crate::PersonPatch;
use async_trait::async_trait;
use doppel_core::annotation::{Annotations, Emotion};
use doppel_core::config::MemoryConfig;
use doppel_core::context::ContextEntry;
use doppel_core::error::DoppelError;
use doppel_core::traits::Summarizer;
use std::sync::atomic::{AtomicUsize, Ordering};

async fn test_store() -> Store {
    Store::in_memory(&MemoryConfig::default()).await.unwrap()
}

struct CountingSummarizer {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingSummarizer {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, turns: &[ContextEntry]) -> Result<Option<String>, DoppelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DoppelError::Provider("HTTP 500".into()));
        }
        Ok(Some(format!("recap of {} turns", turns.len())))
    }
}

async fn seed_turns(store: &Store, contact: &str, n: usize) {
    store.touch_person(contact, Some("Asha"), None).await.unwrap();
    for i in 0..n {
        if i % 2 == 0 {
            store
                .put_user_turn(contact, &format!("msg {i}"), &Annotations::default(), false)
                .await
                .unwrap();
        } else {
            store
                .put_assistant_turn(contact, &format!("reply {i}"), false)
                .await
                .unwrap();
        }
    }
}

// ---------------------------------------------------------------------------
// person profiles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_touch_person_creates_once() {
    let store = test_store().await;
    assert!(store.touch_person("u1", Some("Asha"), None).await.unwrap());
    assert!(!store.touch_person("u1", None, Some("+91 98")).await.unwrap());

    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.display_name.as_deref(), Some("Asha"));
    assert_eq!(person.phone_number.as_deref(), Some("+91 98"));
    assert_eq!(person.relationship, "contact");
    assert_eq!(person.style, CommunicationStyle::Neutral);
    assert_eq!(person.total_messages, 0);
}

#[tokio::test]
async fn test_get_person_unknown() {
    let store = test_store().await;
    assert!(store.get_person("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_person_patch_keeps_unset_fields() {
    let store = test_store().await;
    store.touch_person("u1", Some("Asha"), None).await.unwrap();
    store
        .update_person(
            "u1",
            &PersonPatch {
                relationship: Some("friend".into()),
                is_important: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.relationship, "friend");
    assert!(person.is_important);
    assert_eq!(person.display_name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn test_total_messages_counts_every_turn() {
    let store = test_store().await;
    seed_turns(&store, "u1", 4).await;
    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.total_messages, 4);
    assert!(person.last_seen >= person.first_seen);
}

#[tokio::test]
async fn test_learn_style_keeps_previous_on_neutral() {
    let store = test_store().await;
    store.touch_person("u1", None, None).await.unwrap();

    store.learn_style("u1", "haha lol 😂").await.unwrap();
    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.style, CommunicationStyle::Humorous);

    store
        .learn_style("u1", "I will see you at the station tomorrow")
        .await
        .unwrap();
    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.style, CommunicationStyle::Humorous);
}

#[tokio::test]
async fn test_learn_style_caps_topics() {
    let store = test_store().await;
    store.touch_person("u1", None, None).await.unwrap();
    store
        .learn_style(
            "u1",
            "exam at college, job interview, chess blitz, new song, stock market, bike ride",
        )
        .await
        .unwrap();

    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.topics.len(), 5);
    assert_eq!(person.topics.last(), Some(&Topic::Education));
}

#[tokio::test]
async fn test_learn_style_moves_repeated_topic_to_end() {
    let store = test_store().await;
    store.touch_person("u1", None, None).await.unwrap();
    store.learn_style("u1", "chess blitz today").await.unwrap();
    store.learn_style("u1", "that song was great").await.unwrap();
    store.learn_style("u1", "chess again").await.unwrap();

    let person = store.get_person("u1").await.unwrap().unwrap();
    assert_eq!(person.topics, vec![Topic::Music, Topic::Chess]);
}

#[tokio::test]
async fn test_record_emotion_skips_neutral_and_caps() {
    let store = test_store().await;
    store.touch_person("u1", None, None).await.unwrap();

    store.record_emotion("u1", Emotion::Neutral).await.unwrap();
    assert!(store
        .get_person("u1")
        .await
        .unwrap()
        .unwrap()
        .emotion_history
        .is_empty());

    for _ in 0..12 {
        store.record_emotion("u1", Emotion::Happy).await.unwrap();
    }
    store.record_emotion("u1", Emotion::Sad).await.unwrap();

    let history = store.get_person("u1").await.unwrap().unwrap().emotion_history;
    assert_eq!(history.len(), 10);
    assert_eq!(history.last(), Some(&Emotion::Sad));
}

#[tokio::test]
async fn test_profile_summary_mentions_name_and_style() {
    let store = test_store().await;
    store.touch_person("u1", Some("Asha"), None).await.unwrap();
    let summary = store.get_person("u1").await.unwrap().unwrap().summary();
    assert!(summary.contains("Asha"));
    assert!(summary.contains("neutral"));
}

// ---------------------------------------------------------------------------
// conversation log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_recent_turns_chronological() {
    let store = test_store().await;
    seed_turns(&store, "u1", 6).await;

    let turns = store.recent_turns("u1", 3).await.unwrap();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].content, "reply 3");
    assert_eq!(turns[1].content, "msg 4");
    assert_eq!(turns[2].content, "reply 5");
    assert!(turns.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
async fn test_user_turn_carries_annotations() {
    let store = test_store().await;
    store.touch_person("u1", None, None).await.unwrap();
    let annotations = Annotations {
        emotion: Emotion::Excited,
        ..Default::default()
    };
    store
        .put_user_turn("u1", "got the job!!", &annotations, true)
        .await
        .unwrap();

    let turns = store.recent_turns("u1", 10).await.unwrap();
    assert_eq!(turns[0].role, "user");
    assert_eq!(turns[0].emotion.as_deref(), Some("excited"));
    assert!(turns[0].is_group);
}

#[tokio::test]
async fn test_history_is_per_contact() {
    let store = test_store().await;
    seed_turns(&store, "u1", 3).await;
    seed_turns(&store, "u2", 1).await;
    assert_eq!(store.history_len("u1").await.unwrap(), 3);
    assert_eq!(store.history_len("u2").await.unwrap(), 1);
    assert_eq!(store.history_len("u3").await.unwrap(), 0);
}

#[tokio::test]
async fn test_prune_older_than() {
    let store = test_store().await;
    seed_turns(&store, "u1", 3).await;

    let old = super::now_ms() - 10 * 24 * 60 * 60 * 1000;
    sqlx::query("UPDATE conversation_log SET timestamp = ? WHERE content = 'msg 0'")
        .bind(old)
        .execute(store.pool())
        .await
        .unwrap();

    let removed = store.prune_older_than(7).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.history_len("u1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_stats_and_digest() {
    let store = test_store().await;
    seed_turns(&store, "u1", 4).await;
    seed_turns(&store, "u2", 1).await;

    let stats = store.stats(0).await.unwrap();
    assert_eq!(stats.contacts, 2);
    assert_eq!(stats.turns, 5);
    assert_eq!(stats.turns_today, 5);

    let digest = store.digest(0, 10).await.unwrap();
    assert_eq!(digest[0].0, "u1");
    assert_eq!(digest[0].2, 2);
    assert_eq!(digest[1].0, "u2");
}

// ---------------------------------------------------------------------------
// recaps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_recap_empty_below_threshold() {
    let store = test_store().await;
    seed_turns(&store, "u1", 14).await;
    let summarizer = CountingSummarizer::new(false);
    assert_eq!(store.get_recap("u1", &summarizer).await, "");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_recap_summarizes_older_turns_and_caches() {
    let store = test_store().await;
    seed_turns(&store, "u1", 15).await;
    let summarizer = CountingSummarizer::new(false);

    let recap = store.get_recap("u1", &summarizer).await;
    assert_eq!(recap, "recap of 10 turns");
    assert_eq!(store.get_recap("u1", &summarizer).await, recap);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

    // A new turn changes the key.
    store.put_assistant_turn("u1", "one more", false).await.unwrap();
    assert_eq!(store.get_recap("u1", &summarizer).await, "recap of 11 turns");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_recap_failure_is_empty_and_not_cached() {
    let store = test_store().await;
    seed_turns(&store, "u1", 16).await;
    let failing = CountingSummarizer::new(true);
    assert_eq!(store.get_recap("u1", &failing).await, "");
    assert_eq!(store.get_recap("u1", &failing).await, "");
    assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// safety rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_safety_rules_roundtrip_in_order() {
    let store = test_store().await;
    assert!(store.safety_rules().await.unwrap().is_empty());

    store
        .add_safety_rule("identity", r"\bi am (an? )?ai\b", "high", "")
        .await
        .unwrap();
    store
        .add_safety_rule("sensitive", r"\bpassword\b", "high", "[redacted]")
        .await
        .unwrap();

    let rules = store.safety_rules().await.unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].rule_type, "identity");
    assert_eq!(rules[1].replacement, "[redacted]");
}

// ---------------------------------------------------------------------------
// todos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_todo_lifecycle_by_position() {
    let store = test_store().await;
    assert_eq!(store.add_todo("u1", "buy milk").await.unwrap(), 1);
    assert_eq!(store.add_todo("u1", "call mom").await.unwrap(), 2);
    assert_eq!(store.add_todo("u2", "other list").await.unwrap(), 1);

    let done = store.complete_todo("u1", 2).await.unwrap().unwrap();
    assert_eq!(done.text, "call mom");
    assert!(done.done);

    let removed = store.delete_todo("u1", 1).await.unwrap().unwrap();
    assert_eq!(removed.text, "buy milk");

    let list = store.list_todos("u1").await.unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0].done);
}

#[tokio::test]
async fn test_todo_out_of_range_position() {
    let store = test_store().await;
    store.add_todo("u1", "buy milk").await.unwrap();
    assert!(store.complete_todo("u1", 0).await.unwrap().is_none());
    assert!(store.complete_todo("u1", 5).await.unwrap().is_none());
    assert!(store.delete_todo("u1", 2).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// reminders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reminders_due_and_delivered() {
    let store = test_store().await;
    let now = super::now_ms();
    let past = store
        .create_reminder("console", "u1", "u1", "drink water", now - 1_000)
        .await
        .unwrap();
    store
        .create_reminder("console", "u1", "u1", "sleep", now + 3_600_000)
        .await
        .unwrap();

    let due = store.due_reminders(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, past);
    assert_eq!(due[0].text, "drink water");

    store.mark_reminder_delivered(past).await.unwrap();
    assert!(store.due_reminders(now).await.unwrap().is_empty());
    assert_eq!(store.pending_reminders("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_reminder_by_position() {
    let store = test_store().await;
    let now = super::now_ms();
    store
        .create_reminder("console", "u1", "u1", "later", now + 7_200_000)
        .await
        .unwrap();
    store
        .create_reminder("console", "u1", "u1", "sooner", now + 60_000)
        .await
        .unwrap();

    // Position follows due time.
    let cancelled = store.cancel_reminder("u1", 1).await.unwrap().unwrap();
    assert_eq!(cancelled.text, "sooner");
    assert!(store.cancel_reminder("u1", 3).await.unwrap().is_none());

    let pending = store.pending_reminders("u1").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "later");
}

#[tokio::test]
async fn test_checkpoint_on_memory_db_is_harmless() {
    let store = test_store().await;
    store.checkpoint().await.unwrap();
    assert!(store.db_size().await.unwrap() > 0);
}
