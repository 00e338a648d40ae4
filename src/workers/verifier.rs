//! Self-consistency verification for answers built on raw evidence.
//!
//! Used by the adversarial-abstention routing policy: an answer the verifier
//! cannot tie back to the source text is replaced by a fixed abstention reply.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::MnemosError;

const ABSTENTION_EN: &str = "Based on the available text, there is insufficient information to answer this question. The text does not mention or provide enough details about the specific aspect being asked.";
const ABSTENTION_ZH: &str =
    "根据现有文本，没有足够的信息来回答这个问题。文本中未提及或未提供足够的相关细节。";

/// Phrases that mark an answer as already declining to answer.
const ABSTENTION_MARKERS: &[&str] = &[
    "i don't know",
    "i do not know",
    "insufficient information",
    "not mentioned",
    "does not mention",
    "the text does not",
    "no information",
    "not enough information",
    "cannot determine",
    "cannot answer",
    "信息不足",
    "没有足够",
    "无法确定",
    "未提及",
    "不包含",
    "没有提到",
    "无法回答",
];

/// Reply language for the abstention text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn abstention(self) -> &'static str {
        match self {
            Language::En => ABSTENTION_EN,
            Language::Zh => ABSTENTION_ZH,
        }
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    /// Unknown languages fall back to English.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" | "chinese" => Language::Zh,
            _ => Language::En,
        })
    }
}

/// Whether the source text supports the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Supported,
    Unsupported,
}

impl Verdict {
    /// Interpret a free-text judge reply. Anything without "UNSUPPORTED" counts as supported.
    pub fn from_reply(reply: &str) -> Self {
        if reply.to_uppercase().contains("UNSUPPORTED") {
            Verdict::Unsupported
        } else {
            Verdict::Supported
        }
    }
}

/// Judges whether an answer is grounded in source text.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn judge(
        &self,
        question: &str,
        answer: &str,
        source_text: &str,
    ) -> Result<Verdict, MnemosError>;
}

/// Whether `answer` already declines to answer.
pub fn is_already_abstaining(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    ABSTENTION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Return `answer` if supported, otherwise the abstention reply.
///
/// Empty source or answer abstains without calling the verifier. A verifier
/// error keeps the original answer.
pub async fn verify_and_maybe_abstain(
    verifier: &dyn Verifier,
    question: &str,
    answer: &str,
    source_text: &str,
    language: Language,
) -> String {
    if source_text.trim().is_empty() || answer.trim().is_empty() {
        return language.abstention().to_string();
    }
    if is_already_abstaining(answer) {
        return answer.to_string();
    }
    match verifier.judge(question, answer, source_text).await {
        Ok(Verdict::Supported) => answer.to_string(),
        Ok(Verdict::Unsupported) => {
            info!("Answer not supported by source text, abstaining");
            language.abstention().to_string()
        }
        Err(e) => {
            warn!(stage = "verification", "Verifier failed, keeping answer: {}", e);
            answer.to_string()
        }
    }
}
