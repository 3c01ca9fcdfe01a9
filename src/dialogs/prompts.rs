//! Prompts: what shape of answer a step is waiting for, and how raw user
//! text is recognized and validated against it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::activity::Activity;

/// First signed integer in a message ("I'm 45" → 45).
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-−]?\d+").expect("integer pattern is valid"));

const YES_WORDS: &[&str] = &[
    "yes", "y", "yeah", "yep", "sure", "ok", "okay", "true", "sim", "s", "claro", "isso",
];
const NO_WORDS: &[&str] = &["no", "n", "nope", "nah", "false", "não", "nao", "negativo"];

/// Outcome of running a recognizer over user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognized<T> {
    pub value: Option<T>,
}

impl<T> Recognized<T> {
    pub fn success(value: T) -> Self {
        Self { value: Some(value) }
    }

    pub fn failure() -> Self {
        Self { value: None }
    }

    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }
}

/// Accepts an age only when it was recognized and lies in `(0, 150)`.
pub fn age_prompt_validator(recognized: &Recognized<i64>) -> bool {
    matches!(recognized.value, Some(age) if age > 0 && age < 150)
}

/// Extra acceptance gate applied after a number is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberValidator {
    AgeRange,
}

impl NumberValidator {
    pub fn check(&self, recognized: &Recognized<i64>) -> bool {
        match self {
            Self::AgeRange => age_prompt_validator(recognized),
        }
    }
}

/// Shape of answer a prompt expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptKind {
    Text,
    Choice { options: Vec<String> },
    Confirm,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validator: Option<NumberValidator>,
    },
}

/// A recognized and accepted prompt answer, handed to the next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PromptValue {
    Text(String),
    Choice(String),
    Bool(bool),
    Number(i64),
}

impl PromptValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for PromptValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) | Self::Choice(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl PromptKind {
    /// Recognize and validate `text`. `None` means the prompt must be retried.
    pub fn evaluate(&self, text: &str) -> Option<PromptValue> {
        match self {
            Self::Text => recognize_text(text).value.map(PromptValue::Text),
            Self::Choice { options } => recognize_choice(text, options)
                .value
                .map(PromptValue::Choice),
            Self::Confirm => recognize_confirm(text).value.map(PromptValue::Bool),
            Self::Number { validator } => {
                let recognized = recognize_number(text);
                let accepted = match validator {
                    Some(v) => v.check(&recognized),
                    None => recognized.succeeded(),
                };
                if accepted {
                    recognized.value.map(PromptValue::Number)
                } else {
                    None
                }
            }
        }
    }
}

/// Any non-blank text.
pub fn recognize_text(text: &str) -> Recognized<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Recognized::failure()
    } else {
        Recognized::success(trimmed.to_string())
    }
}

/// One of `options`, by exact label, bare number ("500" for "500ml"), or
/// 1-based position.
pub fn recognize_choice(text: &str, options: &[String]) -> Recognized<String> {
    let needle = compact(text);
    if needle.is_empty() {
        return Recognized::failure();
    }

    if let Some(option) = options.iter().find(|o| compact(o) == needle) {
        return Recognized::success(option.clone());
    }

    if needle.chars().all(|c| c.is_ascii_digit()) {
        let by_number = options.iter().find(|o| {
            let digits: String = o.chars().take_while(|c| c.is_ascii_digit()).collect();
            !digits.is_empty() && digits == needle
        });
        if let Some(option) = by_number {
            return Recognized::success(option.clone());
        }
        if let Ok(index) = needle.parse::<usize>()
            && (1..=options.len()).contains(&index)
        {
            return Recognized::success(options[index - 1].clone());
        }
    }

    Recognized::failure()
}

/// Yes/no in English or Portuguese; "1"/"2" pick from the rendered buttons.
pub fn recognize_confirm(text: &str) -> Recognized<bool> {
    let normalized = text
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .to_lowercase();

    let classify = |word: &str| match word {
        "1" => Some(true),
        "2" => Some(false),
        w if YES_WORDS.contains(&w) => Some(true),
        w if NO_WORDS.contains(&w) => Some(false),
        _ => None,
    };

    if let Some(answer) = classify(&normalized) {
        return Recognized::success(answer);
    }
    // "yes please", "não, obrigado"
    let first = normalized
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or("");
    match classify(first) {
        Some(answer) => Recognized::success(answer),
        None => Recognized::failure(),
    }
}

/// First integer in the text.
pub fn recognize_number(text: &str) -> Recognized<i64> {
    INTEGER
        .find(text)
        .and_then(|m| m.as_str().replace('−', "-").parse::<i64>().ok())
        .map(Recognized::success)
        .unwrap_or_else(Recognized::failure)
}

fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// A prompt as issued by a step: what to ask, what to say on a bad answer,
/// and how to recognize the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub kind: PromptKind,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<String>,
    /// Quick-reply buttons shown with the prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl PromptSpec {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Text,
            prompt: prompt.into(),
            retry_prompt: None,
            suggestions: Vec::new(),
        }
    }

    pub fn choice(prompt: impl Into<String>, options: &[&str]) -> Self {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        Self {
            kind: PromptKind::Choice {
                options: options.clone(),
            },
            prompt: prompt.into(),
            retry_prompt: None,
            suggestions: options,
        }
    }

    pub fn confirm(prompt: impl Into<String>, labels: [&str; 2]) -> Self {
        Self {
            kind: PromptKind::Confirm,
            prompt: prompt.into(),
            retry_prompt: None,
            suggestions: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn number(prompt: impl Into<String>, validator: Option<NumberValidator>) -> Self {
        Self {
            kind: PromptKind::Number { validator },
            prompt: prompt.into(),
            retry_prompt: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_retry(mut self, retry_prompt: impl Into<String>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    /// Outbound activity asking the prompt (or its retry text) in reply to `inbound`.
    pub fn render(&self, inbound: &Activity, retry: bool) -> Activity {
        let text = if retry {
            self.retry_prompt.as_deref().unwrap_or(&self.prompt)
        } else {
            &self.prompt
        };
        let reply = inbound.reply(text);
        if self.suggestions.is_empty() {
            reply
        } else {
            reply.with_suggested_actions(self.suggestions.iter().cloned())
        }
    }
}

/// A prompt the dialog is suspended on, persisted between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPrompt {
    pub spec: PromptSpec,
    /// Answers rejected so far.
    pub attempts: u32,
}

impl PendingPrompt {
    pub fn new(spec: PromptSpec) -> Self {
        Self { spec, attempts: 0 }
    }
}
