//! Human-in-the-loop answer collection.
//!
//! The clarification step is the only place a run waits on a person. The
//! orchestrator only sees the [`AnswerCollector`] trait, so a terminal
//! prompt, a fixed answer file or a UI callback are interchangeable.

use crate::agents::ClarifyingQuestion;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// Map of question text to answer. Unanswered questions are absent.
pub type Answers = BTreeMap<String, String>;

#[async_trait]
pub trait AnswerCollector: Send + Sync {
    async fn collect(&self, questions: &[ClarifyingQuestion]) -> Result<Answers>;
}

/// `true` when an answer line means "no answer".
pub fn is_skip(answer: &str) -> bool {
    let trimmed = answer.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("skip")
}

/// Prompts on stderr and reads one line per question from stdin.
///
/// An empty line or `skip` leaves the question unanswered. End of input
/// skips whatever is left.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinCollector;

#[async_trait]
impl AnswerCollector for StdinCollector {
    async fn collect(&self, questions: &[ClarifyingQuestion]) -> Result<Answers> {
        let mut answers = Answers::new();
        if questions.is_empty() {
            return Ok(answers);
        }

        let mut stderr = tokio::io::stderr();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        stderr
            .write_all(b"\nA few questions before analysis (press Enter or type 'skip' to skip):\n")
            .await?;

        for (i, question) in questions.iter().enumerate() {
            let mut prompt = format!("\n{}. {}\n", i + 1, question.question);
            if !question.rationale.is_empty() {
                prompt.push_str(&format!("   ({})\n", question.rationale));
            }
            prompt.push_str("> ");
            stderr.write_all(prompt.as_bytes()).await?;
            stderr.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!(remaining = questions.len() - i, "Input closed, skipping remaining questions");
                break;
            };
            if !is_skip(&line) {
                answers.insert(question.question.clone(), line.trim().to_string());
            }
        }

        Ok(answers)
    }
}

/// Answers from a prepared map, e.g. a JSON file or a test fixture.
#[derive(Debug, Clone, Default)]
pub struct FixedAnswers {
    answers: Answers,
}

impl FixedAnswers {
    pub fn new(answers: Answers) -> Self {
        Self { answers }
    }

    /// Collector that answers nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a JSON object of question to answer.
    pub fn from_json(json: &str) -> Result<Self> {
        let answers: Answers = serde_json::from_str(json)?;
        Ok(Self::new(answers))
    }
}

#[async_trait]
impl AnswerCollector for FixedAnswers {
    /// Returns every prepared answer, asked or not, except skips.
    async fn collect(&self, _questions: &[ClarifyingQuestion]) -> Result<Answers> {
        Ok(self
            .answers
            .iter()
            .filter(|(_, answer)| !is_skip(answer))
            .map(|(q, a)| (q.clone(), a.clone()))
            .collect())
    }
}
