//! Chat and vision: compose the persona prompt and call the LLM.

use super::{with_timeout, Bundle, Handlers};
use crate::clock::{hour_bucket, is_late_night, local_time, special_day};
use doppel_core::{
    annotation::{Emotion, Language},
    config::PersonaConfig,
    context::{Context, GenerationConfig, InlineImage},
    error::DoppelError,
};

const STYLE_RULES: &str = "Text like a real person on your phone: short messages, casual, \
lowercase is fine, no bullet lists, no headings, no sign-offs. Never say you are an AI, a bot, \
or a language model, and never mention who built you. If you don't know something, say so \
casually.";

/// Build the system prompt for one message.
pub fn system_prompt(persona: &PersonaConfig, bundle: &Bundle) -> String {
    let mut sections = vec![persona.description.trim().to_string(), STYLE_RULES.to_string()];

    // Time context.
    let local = local_time(bundle.now, persona.utc_offset_minutes);
    let mut time = format!(
        "Right now it's {}, {} ({}).",
        local.format("%A %-d %B"),
        hour_bucket(&local),
        local.format("%H:%M")
    );
    if is_late_night(&local) {
        time.push_str(" It's late, keep it low-key and brief.");
    }
    if let Some(day) = special_day(&local, &persona.special_days) {
        time.push_str(&format!(" Today is {day}."));
    }
    sections.push(time);

    // Emotion and tone.
    let a = &bundle.annotations;
    if a.emotion != Emotion::Neutral {
        sections.push(format!(
            "They seem {} ({} intensity). Tone: {}.",
            a.emotion.as_str(),
            a.intensity.as_str(),
            a.emotion.tone_hint()
        ));
    }
    match a.language {
        Language::Hinglish => sections.push("Reply in Hinglish (Roman script).".to_string()),
        Language::Hindi => sections.push("Reply in Hindi.".to_string()),
        Language::English => {}
    }

    // Who they are.
    match bundle.person.as_ref() {
        Some(person) if !bundle.is_new_contact => {
            sections.push(format!("About them: {}", person.summary()));
        }
        _ => sections.push("This is the first time they've texted you.".to_string()),
    }
    if let Some(name) = bundle.sender_name.as_deref() {
        sections.push(format!("Their name: {name}."));
    }
    if bundle.is_group {
        sections.push("This is a group chat. Keep it to 2-3 lines.".to_string());
    }

    if !bundle.recap.is_empty() {
        sections.push(format!("Earlier in this conversation: {}", bundle.recap));
    }

    if let Some(quoted) = bundle.quoted.as_deref() {
        sections.push(format!("They are replying to this message: \"{quoted}\""));
    }

    // Findings and URL policy.
    match bundle.findings.as_deref() {
        Some(findings) => {
            sections.push(format!(
                "Use these findings in your reply. Include the relevant links exactly as given:\n{findings}"
            ));
        }
        None => sections.push("Do not include any links or URLs.".to_string()),
    }

    sections.join("\n\n")
}

/// Assemble the provider context for a chat turn.
pub fn build_context(persona: &PersonaConfig, bundle: &Bundle) -> Context {
    let mut context = Context::new(&bundle.text);
    context.system_prompt = system_prompt(persona, bundle);
    context.history = bundle.history.clone();
    if bundle.is_group {
        context.generation = GenerationConfig {
            max_output_tokens: 256,
            ..GenerationConfig::default()
        };
    }
    context
}

pub(super) async fn respond(h: &Handlers, bundle: &Bundle) -> Result<String, DoppelError> {
    let context = build_context(&h.persona, bundle);
    let out = with_timeout(
        h.llm_timeout,
        h.collab.provider.name(),
        h.collab.provider.complete(&context),
    )
    .await?;
    Ok(out.text.trim().to_string())
}

pub(super) async fn vision(h: &Handlers, bundle: &Bundle) -> Result<String, DoppelError> {
    let Some(image) = bundle.image.as_ref() else {
        return Err(DoppelError::Handler("vision without an image".into()));
    };

    let mut context = build_context(&h.persona, bundle);
    if context.current_message.trim().is_empty() {
        context.current_message = "[sent a photo]".to_string();
    }
    context
        .system_prompt
        .push_str("\n\nThey sent a photo. React to it the way a friend would, in a line or two.");
    context.image = Some(InlineImage {
        mime: image.mime.clone(),
        bytes: image.bytes.clone(),
    });

    let out = with_timeout(
        h.llm_timeout,
        h.collab.provider.name(),
        h.collab.provider.complete(&context),
    )
    .await?;
    Ok(out.text.trim().to_string())
}
