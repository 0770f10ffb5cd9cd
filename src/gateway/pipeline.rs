//! Message processing pipeline: one envelope from gate to memory commit.

use super::{locked, Gateway};
use crate::analytics::Sample;
use crate::annotate::annotate;
use crate::clock::{is_late_night, local_time};
use crate::commands::{self, Command, CommandContext};
use crate::handlers::{with_timeout, Bundle, HandlerKind};
use crate::humanize::{Attachment, DeliveryPlan, PlanContext};
use crate::owner::AutoDecision;
use crate::router::route;
use crate::trigger::has_bot_prefix;
use doppel_core::{
    annotation::Annotations, config::shellexpand, error::DoppelError, message::Envelope,
};
use doppel_providers::tts::speak;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static VOICE_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(voice note|voice message|send (a |me a )?voice|bol ke|audio mein)\b")
        .unwrap()
});

/// How the pipeline disposed of one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Group message not addressed to the bot, or nothing left to act on.
    Dropped,
    /// Owner takeover, manual pause, dnd, or an already-notified sender.
    Silenced,
    /// Owner activity observed; the chat is silenced for the window.
    OwnerObserved,
    /// An owner command ran; carries its reply.
    Command(String),
    /// Away/busy canned reply sent.
    Canned(String),
    Replied {
        handler: HandlerKind,
        plan: DeliveryPlan,
        delivered: bool,
    },
}

fn preview(text: &str) -> String {
    if text.chars().count() > 60 {
        let truncated: String = text.chars().take(60).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

impl Gateway {
    /// Process a single envelope through the full pipeline.
    pub async fn handle_envelope(&self, mut env: Envelope) -> Outcome {
        let started = Instant::now();
        let now_ms = env.timestamp.timestamp_millis();
        let chat = env.chat_key().to_string();
        let persona = &self.config.persona;
        info!(
            "[{}] {} says: {}",
            env.channel,
            env.sender_name.as_deref().unwrap_or(&env.sender_id),
            preview(&env.text)
        );

        // --- 1. TRIGGER GATE ---
        // Owner observations are never replies, so they skip the gate.
        if !env.from_owner && !self.trigger.is_triggered(&env) {
            debug!("group message on {chat} not addressed to us, dropping");
            return Outcome::Dropped;
        }

        // --- 2. OWNER GATE ---
        let is_owner = env.from_owner
            || (!persona.owner_id.is_empty() && env.sender_id == persona.owner_id);
        if is_owner {
            if let Some(cmd) = Command::parse(&env.text) {
                return self.run_command(cmd, &env, &chat, now_ms).await;
            }
            if env.from_owner {
                if !has_bot_prefix(&env.text) {
                    locked(&self.takeover).observe(&chat, now_ms);
                    info!(
                        "owner active on {chat}, holding replies for {}s",
                        self.config.gateway.silence_window_secs
                    );
                    return Outcome::OwnerObserved;
                }
                // "@bot ..." from the owner: answer it as if the owner asked.
                if !persona.owner_id.is_empty() {
                    env.sender_id = persona.owner_id.clone();
                }
            }
        } else {
            if locked(&self.takeover).is_silenced(&chat, now_ms) {
                debug!("{chat} is under owner takeover, staying quiet");
                return Outcome::Silenced;
            }
            let decision = locked(&self.auto_reply).decide(&env.sender_id, now_ms);
            match decision {
                AutoDecision::Pass => {}
                AutoDecision::Silent => return Outcome::Silenced,
                AutoDecision::Canned(text) => {
                    self.send_plain(&env.channel, &chat, &text).await;
                    return Outcome::Canned(text);
                }
            }
        }

        // --- 3. EFFECTIVE TEXT ---
        let text = self.trigger.effective_text(&env);
        if text.is_empty() && env.image.is_none() {
            return Outcome::Dropped;
        }

        // --- 4. ANNOTATE ---
        let annotations = annotate(&text);
        debug!(
            "annotated: intent={} ({:.2}) emotion={} lang={}",
            annotations.intent.as_str(),
            annotations.confidence,
            annotations.emotion.as_str(),
            annotations.language.as_str()
        );

        // --- 5. MEMORY I/O ---
        let bundle = self.load_bundle(&env, &chat, text, annotations).await;

        // --- 6. ROUTE ---
        let kind = if bundle.image.is_some() {
            HandlerKind::Vision
        } else {
            route(&bundle.annotations, &bundle.text)
        };
        debug!("routed {} to {kind}", bundle.sender_id);

        // --- 7. HANDLER ---
        let handler_started = Instant::now();
        let result = self.handlers.respond(kind, &bundle).await;
        let handler_ms = handler_started.elapsed().as_millis() as u64;

        // --- 8. SAFETY ---
        let safe = self
            .safety
            .apply(&result.response, &bundle.text, result.findings.is_some());

        // --- 9. HUMANIZE ---
        let local = local_time(env.timestamp, persona.utc_offset_minutes);
        let ctx = PlanContext {
            is_group: bundle.is_group,
            quick_intent: bundle.annotations.intent.is_quick(),
            late_night: is_late_night(&local),
            handler_elapsed_ms: handler_ms,
        };
        let mut plan = {
            let mut rng = locked(&self.rng);
            self.humanizer.plan(&safe, ctx, &mut *rng)
        };
        plan.image = result.image.clone();
        plan.audio = result.audio.clone();

        // --- 9a. VOICE ---
        if plan.audio.is_none() && self.wants_voice(&bundle.text) {
            plan.audio = self.synthesize(&plan.full_text()).await;
        }

        // --- 10. DELIVER ---
        let delivered = self.deliver(&env.channel, &chat, &plan).await;

        // --- 11. MEMORY COMMIT ---
        self.commit(&bundle, &plan, delivered).await;
        locked(&self.analytics).record(Sample {
            sender: &bundle.sender_id,
            intent: bundle.annotations.intent.as_str(),
            handler: result.source.as_str(),
            response_ms: started.elapsed().as_millis() as u64,
            at: local,
        });

        info!(
            "replied to {} via {} in {}ms ({} part(s), delivered: {delivered})",
            bundle.sender_id,
            result.source,
            started.elapsed().as_millis(),
            plan.parts.len()
        );
        Outcome::Replied {
            handler: result.source,
            plan,
            delivered,
        }
    }

    /// Execute an owner command and send its reply to the owner.
    async fn run_command(&self, cmd: Command, env: &Envelope, chat: &str, now_ms: i64) -> Outcome {
        let ctx = CommandContext {
            store: &self.store,
            chat,
            text: &env.text,
            now: now_ms,
            uptime: &self.uptime,
            provider_name: self.handlers.provider_name(),
            utc_offset_minutes: self.config.persona.utc_offset_minutes,
            takeover: &self.takeover,
            auto_reply: &self.auto_reply,
            analytics: &self.analytics,
        };
        let reply = commands::handle(cmd, &ctx).await;
        info!("owner command {cmd:?} on {chat}");

        // Typed into a contact's chat, the answer must not land there.
        let owner = self.config.persona.owner_id.as_str();
        let target = if env.from_owner && !owner.is_empty() {
            owner
        } else {
            chat
        };
        self.send_plain(&env.channel, target, &reply).await;
        Outcome::Command(reply)
    }

    /// Record the user turn and gather everything the handlers may need.
    /// Storage failures are logged and leave the affected field empty.
    async fn load_bundle(
        &self,
        env: &Envelope,
        chat: &str,
        text: String,
        annotations: Annotations,
    ) -> Bundle {
        let sender = env.sender_id.as_str();
        let store = &self.store;

        let is_new_contact = store
            .touch_person(sender, env.sender_name.as_deref(), env.phone.as_deref())
            .await
            .unwrap_or_else(|e| {
                warn!("memory: touch_person failed for {sender}: {e}");
                false
            });

        let user_turn_id = match store
            .put_user_turn(sender, &text, &annotations, env.is_group)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("memory: failed to record user turn for {sender}: {e}");
                None
            }
        };

        let person = store.get_person(sender).await.unwrap_or_else(|e| {
            warn!("memory: get_person failed for {sender}: {e}");
            None
        });

        let limit = store.max_context_messages();
        let history = match store.recent_turns(sender, limit + 1).await {
            Ok(turns) => {
                let mut entries: Vec<_> = turns
                    .iter()
                    .filter(|t| Some(t.id) != user_turn_id)
                    .map(|t| t.to_entry())
                    .collect();
                let excess = entries.len().saturating_sub(limit);
                entries.drain(..excess);
                entries
            }
            Err(e) => {
                warn!("memory: recent_turns failed for {sender}: {e}");
                Vec::new()
            }
        };

        let recap = with_timeout(self.handlers.llm_timeout(), "recap", async {
            Ok::<_, DoppelError>(store.get_recap(sender, self.handlers.summarizer()).await)
        })
        .await
        .unwrap_or_else(|e| {
            warn!("memory: recap for {sender} skipped: {e}");
            String::new()
        });

        Bundle {
            channel: env.channel.clone(),
            sender_id: sender.to_string(),
            sender_name: env.sender_name.clone(),
            chat_id: chat.to_string(),
            text,
            annotations,
            is_group: env.is_group,
            person,
            is_new_contact,
            recap,
            quoted: env.quoted.as_ref().map(|q| q.text.clone()),
            image: env.image.clone(),
            findings: None,
            history,
            user_turn_id,
            now: env.timestamp,
        }
    }

    /// Assistant turn (delivered replies only), style and emotion learning.
    async fn commit(&self, bundle: &Bundle, plan: &DeliveryPlan, delivered: bool) {
        let sender = bundle.sender_id.as_str();
        if delivered {
            if let Err(e) = self
                .store
                .put_assistant_turn(sender, &plan.full_text(), bundle.is_group)
                .await
            {
                warn!("memory: failed to record reply for {sender}: {e}");
            }
        }
        if let Err(e) = self.store.learn_style(sender, &bundle.text).await {
            warn!("memory: style learning failed for {sender}: {e}");
        }
        if let Err(e) = self
            .store
            .record_emotion(sender, bundle.annotations.emotion)
            .await
        {
            warn!("memory: emotion history failed for {sender}: {e}");
        }
    }

    fn wants_voice(&self, text: &str) -> bool {
        self.config.voice.enabled
            && (self.config.gateway.voice_replies || VOICE_REQUEST.is_match(text))
    }

    /// Synthesize a voice note. Failures degrade to text-only delivery.
    async fn synthesize(&self, text: &str) -> Option<Attachment> {
        let speech = self.handlers.speech()?;
        let voice = &self.config.voice;
        let limit = Duration::from_secs(voice.timeout_secs);
        match with_timeout(limit, "tts", speak(speech.as_ref(), text, false, voice.max_bytes)).await
        {
            Ok(bytes) => {
                self.stash_audio(&bytes);
                Some(Attachment {
                    bytes,
                    mime: "audio/mpeg".to_string(),
                })
            }
            Err(e) => {
                warn!("voice note skipped: {e}");
                None
            }
        }
    }

    /// Keep a copy of the clip under `tmp/audio`; maintenance sweeps old ones.
    fn stash_audio(&self, bytes: &[u8]) {
        let dir = self.audio_dir();
        let path = dir.join(format!("{}.mp3", uuid::Uuid::new_v4()));
        if let Err(e) = std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&path, bytes)) {
            debug!("could not keep voice clip at {}: {e}", path.display());
        }
    }

    pub(super) fn audio_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.config.doppel.data_dir))
            .join("tmp")
            .join("audio")
    }
}
