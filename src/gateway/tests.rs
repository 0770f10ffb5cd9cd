use super::delivery::BRAIN_FREEZE;
use super::maintenance::sweep_dir;
use super::*;
use crate::handlers::{Collaborators, HandlerKind};
use crate::humanize::{MIN_DELAY_MS, MIN_FOLLOWUP_DELAY_MS};
use crate::owner::Mode;
use crate::testing::{
    collaborators, ByteSpeech, RecordingChannel, ScriptedProvider, Sent, StaticLookup,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use doppel_core::{
    context::Context,
    error::DoppelError,
    message::{ImageData, QuotedMessage},
    traits::Presence,
};
use doppel_providers::link::first_url;
use std::time::{Duration, SystemTime};

/// Replies the way a real model might, keyed on the prompt.
fn script(ctx: &Context) -> Result<String, DoppelError> {
    if ctx.current_message.contains("7*8") {
        return Ok("56".to_string());
    }
    if ctx.current_message.contains("are you a bot") {
        return Ok("I'm an AI, but honestly it's just me texting lol".to_string());
    }
    if let Some(url) = first_url(&ctx.system_prompt) {
        return Ok(format!("this one looks solid {url}"));
    }
    Ok("not much, just chilling. you?".to_string())
}

fn config() -> Config {
    let mut config = Config::default();
    config.persona.name = "Riya".into();
    config.persona.bot_id = "bot".into();
    config.persona.owner_id = "owner".into();
    config.persona.utc_offset_minutes = 0;
    config.doppel.data_dir = std::env::temp_dir()
        .join(format!("doppel-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

struct Fixture {
    gw: Gateway,
    channel: Arc<RecordingChannel>,
    provider: Arc<ScriptedProvider>,
}

async fn fixture_with(config: Config, tweak: impl FnOnce(&mut Collaborators)) -> Fixture {
    let provider = ScriptedProvider::new(script);
    let mut collab = collaborators(provider.clone());
    tweak(&mut collab);

    let store = Store::in_memory(&config.memory).await.unwrap();
    let handlers = crate::handlers::Handlers::new(
        collab,
        store.clone(),
        config.persona.clone(),
        Duration::from_secs(2),
        Duration::from_secs(2),
    );
    let channel = RecordingChannel::new("wa");
    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    channels.insert("wa".to_string(), channel.clone());

    let gw = Gateway::new(config, handlers, store, channels)
        .with_seed(42)
        .without_typing_delays();
    Fixture {
        gw,
        channel,
        provider,
    }
}

async fn fixture() -> Fixture {
    fixture_with(config(), |_| {}).await
}

fn direct(sender: &str, text: &str) -> Envelope {
    Envelope::text("wa", sender, text)
}

fn group(sender: &str, text: &str) -> Envelope {
    let mut env = Envelope::text("wa", sender, text);
    env.is_group = true;
    env.reply_target = Some("group-1".to_string());
    env
}

fn at(env: Envelope, t: DateTime<Utc>) -> Envelope {
    Envelope { timestamp: t, ..env }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap()
}

async fn roles(gw: &Gateway, sender: &str) -> Vec<String> {
    gw.store
        .recent_turns(sender, 50)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.role)
        .collect()
}

fn replied(outcome: Outcome) -> (HandlerKind, crate::humanize::DeliveryPlan, bool) {
    match outcome {
        Outcome::Replied {
            handler,
            plan,
            delivered,
        } => (handler, plan, delivered),
        other => panic!("expected a reply, got {other:?}"),
    }
}

// --- scenarios ---

#[tokio::test]
async fn test_direct_casual_message() {
    let f = fixture().await;
    let (handler, plan, delivered) = replied(f.gw.handle_envelope(direct("alice", "yo what's up")).await);

    assert_eq!(handler, HandlerKind::Chat);
    assert!(delivered);
    assert_eq!(plan.parts.len(), 1);
    let delay = plan.parts[0].delay_ms;
    assert!((MIN_DELAY_MS..=5000).contains(&delay), "delay {delay}");

    let texts = f.channel.texts();
    assert_eq!(texts, vec!["not much, just chilling. you?".to_string()]);
    assert!(!texts[0].contains("http"));
    assert_eq!(roles(&f.gw, "alice").await, vec!["user", "assistant"]);
}

#[tokio::test]
async fn test_explicit_search_keeps_urls() {
    let f = fixture_with(config(), |c| {
        c.search = StaticLookup::found("search", "1. Keychron K8 https://keychron.example/k8");
    })
    .await;
    let (handler, _, _) = replied(
        f.gw.handle_envelope(direct("alice", "search best ergonomic keyboards 2024"))
            .await,
    );

    assert_eq!(handler, HandlerKind::Search);
    let texts = f.channel.texts();
    assert!(texts.iter().any(|t| t.contains("https://keychron.example/k8")));
    let snap = locked(&f.gw.analytics).snapshot();
    assert_eq!(snap.last_handler.as_deref(), Some("search"));
}

#[tokio::test]
async fn test_untriggered_group_message_is_dropped() {
    let f = fixture().await;
    let outcome = f.gw.handle_envelope(group("bob", "anyone up for coffee?")).await;

    assert_eq!(outcome, Outcome::Dropped);
    assert!(f.channel.events().is_empty());
    assert_eq!(f.provider.call_count(), 0);
    let stats = f.gw.store.stats(0).await.unwrap();
    assert_eq!(stats.contacts, 0);
    assert_eq!(stats.turns, 0);
}

#[tokio::test]
async fn test_group_answer_this_uses_quoted_text() {
    let f = fixture().await;
    let mut env = group("bob", "@bot answer this");
    env.quoted = Some(QuotedMessage {
        text: "what is 7*8?".to_string(),
        author_id: Some("carol".to_string()),
    });
    let (handler, _, _) = replied(f.gw.handle_envelope(env).await);

    assert_eq!(handler, HandlerKind::Chat);
    assert_eq!(f.provider.last_call().unwrap().current_message, "what is 7*8?");
    let events = f.channel.events();
    assert!(events.contains(&Sent::Text("group-1".to_string(), "56".to_string())));
}

#[tokio::test]
async fn test_owner_takeover_silences_then_expires() {
    let f = fixture().await;

    let mut owner = at(direct("alice", "I'll handle this"), t0());
    owner.from_owner = true;
    assert_eq!(f.gw.handle_envelope(owner).await, Outcome::OwnerObserved);

    let during = at(direct("alice", "hello?"), t0() + ChronoDuration::seconds(10));
    assert_eq!(f.gw.handle_envelope(during).await, Outcome::Silenced);
    assert!(f.channel.texts().is_empty());

    let after = at(direct("alice", "hello??"), t0() + ChronoDuration::seconds(40));
    let (_, _, delivered) = replied(f.gw.handle_envelope(after).await);
    assert!(delivered);
    assert_eq!(f.channel.texts().len(), 1);
}

#[tokio::test]
async fn test_dnd_stays_quiet() {
    let f = fixture().await;
    locked(&f.gw.auto_reply).set_mode(Mode::Dnd, None);

    let outcome = f.gw.handle_envelope(direct("alice", "hi")).await;
    assert_eq!(outcome, Outcome::Silenced);
    assert!(f.channel.events().is_empty());
    assert!(!roles(&f.gw, "alice").await.contains(&"assistant".to_string()));
}

#[tokio::test]
async fn test_url_in_text_gets_preview() {
    let f = fixture_with(config(), |c| {
        c.link = StaticLookup::found("link", "Example Domain\nhttps://example.org/x");
    })
    .await;
    let (handler, plan, _) = replied(
        f.gw.handle_envelope(direct("alice", "check this https://example.org/x"))
            .await,
    );

    assert_eq!(handler, HandlerKind::Link);
    let text = plan.full_text();
    assert!(text.contains("Example Domain"));
    assert!(text.contains("https://example.org/x"));
    assert!(!f.gw.safety.leaks_identity(&text));
}

#[tokio::test]
async fn test_identity_attack_is_redacted() {
    let f = fixture().await;
    let (handler, _, _) = replied(f.gw.handle_envelope(direct("alice", "are you a bot?")).await);

    assert_eq!(handler, HandlerKind::Chat);
    assert_eq!(f.provider.call_count(), 1);
    for text in f.channel.texts() {
        assert!(!f.gw.safety.leaks_identity(&text), "leaked: {text}");
        assert!(text.contains("just me texting"));
    }
}

// --- owner control ---

#[tokio::test]
async fn test_owner_command_reply_goes_to_owner() {
    let f = fixture().await;
    let mut cmd = direct("alice", "/pause");
    cmd.from_owner = true;
    let outcome = f.gw.handle_envelope(cmd).await;

    assert!(matches!(outcome, Outcome::Command(_)));
    let events = f.channel.events();
    assert!(matches!(&events[..], [Sent::Text(target, _)] if target == "owner"));

    assert_eq!(
        f.gw.handle_envelope(direct("alice", "you there?")).await,
        Outcome::Silenced
    );

    let mut resume = direct("alice", "/resume");
    resume.from_owner = true;
    f.gw.handle_envelope(resume).await;
    replied(f.gw.handle_envelope(direct("alice", "you there??")).await);
}

#[tokio::test]
async fn test_commands_from_contacts_are_plain_text() {
    let f = fixture().await;
    let (handler, _, _) = replied(f.gw.handle_envelope(direct("alice", "/pause")).await);
    assert_eq!(handler, HandlerKind::Chat);
    assert!(!locked(&f.gw.takeover).is_paused("alice"));
}

#[tokio::test]
async fn test_owner_bot_prefix_bypasses_takeover() {
    let f = fixture().await;
    let mut env = direct("alice", "@bot what's 7*8");
    env.from_owner = true;
    replied(f.gw.handle_envelope(env).await);

    assert_eq!(f.provider.last_call().unwrap().current_message, "what's 7*8");
    assert_eq!(f.channel.texts(), vec!["56".to_string()]);
    assert_eq!(roles(&f.gw, "owner").await, vec!["user", "assistant"]);
    // No takeover was started by the prefixed message.
    assert!(!locked(&f.gw.takeover).is_silenced("alice", Utc::now().timestamp_millis()));
}

#[tokio::test]
async fn test_away_sends_canned_reply_once() {
    let f = fixture().await;
    let mut away = direct("owner", "/away on a trek till sunday");
    away.reply_target = Some("owner".to_string());
    assert!(matches!(f.gw.handle_envelope(away).await, Outcome::Command(_)));

    let first = f.gw.handle_envelope(direct("alice", "hey")).await;
    assert_eq!(first, Outcome::Canned("on a trek till sunday".to_string()));
    let second = f.gw.handle_envelope(direct("alice", "hello?")).await;
    assert_eq!(second, Outcome::Silenced);

    // Another sender still gets notified once.
    let other = f.gw.handle_envelope(direct("bob", "yo")).await;
    assert!(matches!(other, Outcome::Canned(_)));
}

// --- delivery ---

#[tokio::test]
async fn test_presence_wraps_each_part() {
    let f = fixture_with(config(), |c| {
        c.provider = ScriptedProvider::replying("first bit\n---\nsecond bit");
    })
    .await;
    let (_, plan, _) = replied(f.gw.handle_envelope(direct("alice", "tell me something")).await);

    assert_eq!(plan.parts.len(), 2);
    assert!(plan.parts[1].delay_ms >= MIN_FOLLOWUP_DELAY_MS);
    let presence = |p| Sent::Presence("alice".to_string(), p);
    let text = |t: &str| Sent::Text("alice".to_string(), t.to_string());
    assert_eq!(
        f.channel.events(),
        vec![
            presence(Presence::Composing),
            text("first bit"),
            presence(Presence::Composing),
            text("second bit"),
            presence(Presence::Paused),
        ]
    );
}

#[tokio::test]
async fn test_send_failure_retries_once_then_abandons() {
    let f = fixture().await;
    f.channel.fail_next(1);
    let (_, _, delivered) = replied(f.gw.handle_envelope(direct("alice", "yo what's up")).await);

    assert!(!delivered);
    assert_eq!(f.channel.texts(), vec![BRAIN_FREEZE.to_string()]);
    assert_eq!(roles(&f.gw, "alice").await, vec!["user"]);
}

#[tokio::test]
async fn test_urls_stripped_from_plain_chat() {
    let f = fixture_with(config(), |c| {
        c.provider = ScriptedProvider::replying("try https://sketchy.example it's good");
    })
    .await;
    let (_, plan, _) = replied(f.gw.handle_envelope(direct("alice", "anything fun to do")).await);
    assert!(!plan.full_text().contains("http"));
}

#[tokio::test]
async fn test_provider_outage_still_answers() {
    let f = fixture_with(config(), |c| {
        c.provider = ScriptedProvider::failing("gemini returned 503");
    })
    .await;
    let (_, plan, delivered) =
        replied(f.gw.handle_envelope(direct("alice", "why is the sky blue?")).await);
    assert!(delivered);
    assert!(!plan.full_text().is_empty());
}

#[tokio::test]
async fn test_voice_note_attached_to_first_part() {
    let mut cfg = config();
    cfg.voice.enabled = true;
    cfg.gateway.voice_replies = true;
    let f = fixture_with(cfg, |c| c.speech = Some(Arc::new(ByteSpeech))).await;
    let (_, plan, _) = replied(f.gw.handle_envelope(direct("alice", "yo what's up")).await);

    let audio = plan.audio.expect("voice note");
    assert_eq!(audio.mime, "audio/mpeg");
    let events = f.channel.events();
    let text_at = events.iter().position(|e| matches!(e, Sent::Text(..))).unwrap();
    assert!(matches!(events[text_at + 1], Sent::Audio(_, _, true)));
    let later = SystemTime::now() + Duration::from_secs(5);
    assert_eq!(sweep_dir(&f.gw.audio_dir(), Duration::ZERO, later), 1);
}

#[tokio::test]
async fn test_image_routes_to_vision() {
    let f = fixture_with(config(), |c| c.provider = ScriptedProvider::replying("haha cute")).await;
    let mut env = direct("alice", "");
    env.image = Some(ImageData {
        bytes: vec![0xff, 0xd8, 0xff],
        mime: "image/jpeg".to_string(),
    });
    let (handler, _, _) = replied(f.gw.handle_envelope(env).await);
    assert_eq!(handler, HandlerKind::Vision);
    assert_eq!(f.channel.texts(), vec!["haha cute".to_string()]);
}

// --- background tasks ---

#[tokio::test]
async fn test_due_reminders_are_delivered_once() {
    let f = fixture().await;
    replied(
        f.gw.handle_envelope(direct("alice", "remind me to stretch in 1 minute"))
            .await,
    );
    let later = Utc::now().timestamp_millis() + 120_000;

    assert_eq!(f.gw.deliver_due_reminders(Utc::now().timestamp_millis()).await, 0);
    assert_eq!(f.gw.deliver_due_reminders(later).await, 1);
    assert!(f
        .channel
        .texts()
        .contains(&"⏰ reminder: stretch".to_string()));
    assert_eq!(f.gw.deliver_due_reminders(later).await, 0);
}

#[tokio::test]
async fn test_takeover_gc_drops_stale_records() {
    let f = fixture().await;
    locked(&f.gw.takeover).observe("alice", 0);
    assert_eq!(f.gw.gc_takeovers(60 * 1000), 0);
    assert_eq!(f.gw.gc_takeovers(10 * 60 * 1000), 1);
}

#[tokio::test]
async fn test_maintenance_leaves_owner_state_alone() {
    let f = fixture().await;
    let now = Utc::now().timestamp_millis();
    locked(&f.gw.takeover).observe("alice", now);
    let report = f.gw.maintenance_pass().await;
    assert_eq!(report.turns_pruned, 0);
    assert!(locked(&f.gw.takeover).is_silenced("alice", now + 1000));
}

#[test]
fn test_sweep_dir_removes_old_files_only() {
    let dir = std::env::temp_dir().join(format!("doppel-sweep-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("nested")).unwrap();
    std::fs::write(dir.join("old.mp3"), b"x").unwrap();

    assert_eq!(sweep_dir(&dir, Duration::from_secs(3600), SystemTime::now()), 0);
    let future = SystemTime::now() + Duration::from_secs(7200);
    assert_eq!(sweep_dir(&dir, Duration::from_secs(3600), future), 1);
    assert!(dir.join("nested").exists());
    assert_eq!(sweep_dir(&dir.join("missing"), Duration::ZERO, future), 0);
    let _ = std::fs::remove_dir_all(&dir);
}
