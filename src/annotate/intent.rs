//! Intent classification from a regex rule table.

use doppel_core::annotation::Intent;
use regex::Regex;
use std::sync::LazyLock;

/// Intent rules in priority order. Ties on confidence go to the earlier entry.
const INTENT_RULES: &[(Intent, &[&str])] = &[
    (
        Intent::Greeting,
        &[
            r"^\s*(hi+|hello+|hey+|yo+|hola|namaste|namaskar|sup|wassup|heya)\b",
            r"\bwh?at'?s\s+up\b",
            r"\bgood (morning|afternoon|evening)\b",
            r"^\s*gm\b",
        ],
    ),
    (
        Intent::Farewell,
        &[
            r"\b(bye+|goodbye|good ?night|gn|ttyl|tata|cya)\b",
            r"\bsee (you|ya)\b",
            r"\b(talk|catch) (you )?later\b",
        ],
    ),
    (
        Intent::Thanks,
        &[
            r"\b(thanks?|thank (you|u)|thx|tysm|ty)\b",
            r"\b(shukriya|dhanyavaad|dhanyawad)\b",
        ],
    ),
    (
        Intent::Birthday,
        &[
            r"\bhappy (birthday|bday|b'day)\b",
            r"\b(hbd|many happy returns|janamdin)\b",
        ],
    ),
    (
        Intent::Festival,
        &[
            r"\b(happy|shubh) (diwali|holi|eid|christmas|new year|navratri|dussehra|lohri|pongal|onam|ganesh chaturthi|raksha ?bandhan)\b",
            r"\b(merry christmas|eid mubarak)\b",
        ],
    ),
    (
        Intent::AboutInquiry,
        &[
            r"\bwho are (you|u)\b",
            r"\b(about yourself|about you|tell me about you)\b",
            r"\byour (name|age|hobbies|hobby|story)\b",
        ],
    ),
    (
        Intent::WorkInquiry,
        &[
            r"\bwhat do (you|u) do\b",
            r"\b(where do you work|what are you working on)\b",
            r"\byour (job|work|company|startup|role|office)\b",
        ],
    ),
    (
        Intent::TechInquiry,
        &[
            r"\b(tech stack|which (language|framework|editor|laptop|ide))\b",
            r"\byour (setup|stack|laptop|editor|ide)\b",
            r"\b(rust|python|javascript|typescript|react|docker|kubernetes|llm)\b",
        ],
    ),
    (
        Intent::ContactInquiry,
        &[
            r"\byour (number|email|insta|instagram|linkedin|github|twitter)\b",
            r"\b(contact details|reach you|contact you)\b",
        ],
    ),
    (
        Intent::Collaboration,
        &[
            r"\b(collab|collaborate|collaboration|partnership|work together|project together)\b",
            r"\b(hire you|freelance|side project)\b",
        ],
    ),
    (
        Intent::HumanRequest,
        &[
            r"\btalk to (the )?(real|actual) (you|person|manthan)\b",
            r"\b(is this (really )?you|real person|human please)\b",
        ],
    ),
    (
        Intent::Challenge,
        &[
            r"\bare (you|u) (a |an )?(bot|ai|robot|real|human|chatgpt)\b",
            r"\b(prove it|bet you can'?t|you('re| are) (just )?(a |an )?(bot|fake|ai))\b",
        ],
    ),
    (
        Intent::Spam,
        &[
            r"\b(free money|lottery|crypto giveaway|investment opportunity|kyc update)\b",
            r"\b(you('ve| have) won|click (here|this link)|earn \d+)\b",
        ],
    ),
    (
        Intent::Emotional,
        &[
            r"\bi feel\b",
            r"\bi'?m (so |really )?(sad|depressed|lonely|stressed|anxious|tired|down)\b",
            r"\b(miss you|heartbroken|crying)\b",
        ],
    ),
    (
        Intent::Opinion,
        &[
            r"\b(what do you think|your (opinion|take|thoughts)|thoughts on)\b",
            r"\b(do you like|would you rather|which is better)\b",
        ],
    ),
    (
        Intent::Help,
        &[
            r"\b(help|assist|stuck|guide me|madad)\b",
            r"\bhow (do|can|should) i\b",
        ],
    ),
    (
        Intent::Question,
        &[
            r"\?\s*$",
            r"^\s*(what|why|how|when|where|who|which|is|are|can|could|do|does|did|will|would|should)\b",
            r"\b(kya|kaise|kab|kyun|kahan|kaun)\b",
        ],
    ),
    (
        Intent::Request,
        &[
            r"\b(can you|could you|please|pls|plz)\b",
            r"\b(send me|share|give me)\b",
        ],
    ),
    (
        Intent::Casual,
        &[
            r"\b(lol|lmao|haha+|hehe+|ok+|okay|cool|nice|hmm+|acha|accha|chill|bored)\b",
            r"\b(kya scene|scene kya)\b",
        ],
    ),
];

/// Sub-intent rules. The first entry of each list is the default label and
/// its pattern is never consulted.
const SUB_INTENT_RULES: &[(Intent, &[(&str, &str)])] = &[
    (
        Intent::Greeting,
        &[
            ("casual", ""),
            ("morning", r"\bgood morning\b|^\s*gm\b"),
            ("evening", r"\bgood (afternoon|evening)\b"),
            ("formal", r"\b(hello|namaste|namaskar)\b"),
        ],
    ),
    (
        Intent::Question,
        &[
            ("general", ""),
            ("how_to", r"^\s*how\b"),
            ("why", r"^\s*why\b"),
            ("factual", r"^\s*(what|who|when|where|which)\b"),
            ("yes_no", r"^\s*(is|are|can|could|do|does|did|will|would|should)\b"),
        ],
    ),
    (
        Intent::Help,
        &[
            ("general", ""),
            ("technical", r"\b(code|bug|error|install|setup|laptop|deploy)\b"),
            ("personal", r"\b(advice|relationship|career|life)\b"),
        ],
    ),
    (
        Intent::Request,
        &[("general", ""), ("share", r"\b(send|share)\b")],
    ),
    (
        Intent::Festival,
        &[
            ("general", ""),
            ("diwali", r"\bdiwali\b"),
            ("holi", r"\bholi\b"),
            ("eid", r"\beid\b"),
            ("christmas", r"\bchristmas\b"),
            ("new_year", r"\bnew year\b"),
        ],
    ),
    (
        Intent::Emotional,
        &[
            ("general", ""),
            ("sad", r"\b(sad|depressed|lonely|crying|heartbroken|down)\b"),
            ("stress", r"\b(stress|stressed|anxious|tired)\b"),
        ],
    ),
];

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).unwrap()
}

static INTENTS: LazyLock<Vec<(Intent, Vec<Regex>)>> = LazyLock::new(|| {
    INTENT_RULES
        .iter()
        .map(|(intent, patterns)| (*intent, patterns.iter().map(|p| compile(p)).collect()))
        .collect()
});

static SUB_INTENTS: LazyLock<Vec<(Intent, &'static str, Vec<(&'static str, Regex)>)>> =
    LazyLock::new(|| {
        SUB_INTENT_RULES
            .iter()
            .map(|(intent, entries)| {
                let default = entries.first().map(|(label, _)| *label).unwrap_or("general");
                let rules = entries
                    .iter()
                    .skip(1)
                    .map(|(label, pattern)| (*label, compile(pattern)))
                    .collect();
                (*intent, default, rules)
            })
            .collect()
    });

/// Result of intent classification.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentMatch {
    pub intent: Intent,
    pub sub_intent: String,
    pub confidence: f32,
}

/// Labels that get the quick-response confidence bonus.
fn is_quickish(intent: Intent) -> bool {
    matches!(
        intent,
        Intent::Greeting | Intent::Farewell | Intent::Thanks | Intent::Birthday | Intent::Festival
    )
}

fn confidence(intent: Intent, matches: usize, short: bool) -> f32 {
    let mut score = 0.5 + 0.15 * matches as f32;
    if short {
        score += 0.1;
    }
    if is_quickish(intent) {
        score += 0.1;
    }
    score.min(1.0)
}

fn sub_intent(intent: Intent, text: &str) -> String {
    SUB_INTENTS
        .iter()
        .find(|(i, _, _)| *i == intent)
        .map(|(_, default, rules)| {
            rules
                .iter()
                .find(|(_, re)| re.is_match(text))
                .map(|(label, _)| *label)
                .unwrap_or(default)
        })
        .unwrap_or("general")
        .to_string()
}

/// Pick the highest-confidence intent; `unknown` when no rule fires.
pub fn classify_intent(text: &str) -> IntentMatch {
    let short = text.chars().count() < 30;
    let mut best: Option<(Intent, f32)> = None;

    for (intent, patterns) in INTENTS.iter() {
        let matches = patterns.iter().filter(|re| re.is_match(text)).count();
        if matches == 0 {
            continue;
        }
        let score = confidence(*intent, matches, short);
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((*intent, score));
        }
    }

    match best {
        Some((intent, confidence)) => IntentMatch {
            intent,
            sub_intent: sub_intent(intent, text),
            confidence,
        },
        None => IntentMatch {
            intent: Intent::Unknown,
            sub_intent: "general".to_string(),
            confidence: 0.0,
        },
    }
}
