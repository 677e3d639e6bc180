//! Keyword-driven canned assistant.
//!
//! There is no inference here: input is sorted into a [`Bucket`] by substring
//! match and answered with a random line from that bucket's table.

use std::fmt::Display;

use rand::{seq::SliceRandom, Rng};
use tracing::debug;

/// Opening line shown before the user asks anything
pub const GREETING: &str = "Hi! I've analyzed your transactions from Chase and Bank of America. \
Based on your spending patterns, you typically spend $89 on groceries every Tuesday. \
Want to see your personalized cash flow prediction?";

/// Topic an input was classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Questions about upcoming balances and paydays
    CashFlow,
    /// Questions about spending habits
    Patterns,
    /// Questions about saving money
    Savings,
    /// Everything else
    General,
}

/// Keywords checked in order; the first bucket with a matching keyword wins
const KEYWORDS: [(Bucket, &[&str]); 3] = [
    (Bucket::CashFlow, &["cash", "flow", "predict"]),
    (Bucket::Patterns, &["pattern", "behavior", "spend"]),
    (Bucket::Savings, &["save", "optimize", "money"]),
];

const CASH_FLOW: &[&str] = &[
    "Your cash flow looks healthy: after rent and groceries you should still have over $24,000 the day before payday.",
    "I predict a low point of $24,752.32 on Tuesday after groceries, then payday brings you back above $28,000.",
    "Payday is 12 days out. Until then I expect about $95 in coffee and grocery spending.",
];

const PATTERNS: &[&str] = &[
    "You spend $89 on groceries every Tuesday, and your coffee runs cluster on weekday mornings.",
    "Your spending behavior is steady: 80% of debits land in Food & Dining, Groceries and Transportation.",
    "I'm analyzing your financial patterns with 94.3% confidence. Weekend spending runs 30% above weekdays.",
];

const SAVINGS: &[&str] = &[
    "Your Tuesday grocery shopping saves $67/month vs weekend prices. Coffee optimization could save another $47/month!",
    "Moving $500 from checking into savings each payday would still leave a comfortable buffer.",
    "Brewing coffee at home three days a week would save about $80 a month.",
];

const GENERAL: &[&str] = &[
    "I'm analyzing your financial patterns with 94.3% confidence. Ask me about cash flow, spending patterns or saving money.",
    "Everything looks on track. Try asking me to predict your cash flow to payday.",
    "I can break down your spending, predict your balance or suggest ways to save.",
];

impl Bucket {
    /// Canned responses for this bucket
    #[must_use]
    pub fn responses(self) -> &'static [&'static str] {
        match self {
            Bucket::CashFlow => CASH_FLOW,
            Bucket::Patterns => PATTERNS,
            Bucket::Savings => SAVINGS,
            Bucket::General => GENERAL,
        }
    }
}

/// Sorts free text into a [`Bucket`] by case-insensitive keyword match
#[must_use]
pub fn classify(input: &str) -> Bucket {
    let input = input.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| input.contains(word)))
        .map_or(Bucket::General, |(bucket, _)| *bucket)
}

/// Picks one of the bucket's responses uniformly at random
pub fn respond<R: Rng + ?Sized>(bucket: Bucket, rng: &mut R) -> &'static str {
    bucket.responses().choose(rng).copied().unwrap_or_default()
}

/// Who said a line of the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The person asking
    User,
    /// The canned assistant
    Assistant,
}

impl Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Speaker::User => "You",
            Speaker::Assistant => "AI",
        })
    }
}

/// One line of the chat transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    speaker: Speaker,
    text: String,
}

impl ChatMessage {
    /// Who said it
    #[must_use]
    #[inline]
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    /// What was said
    #[must_use]
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A chat session holding the visible transcript and its random source
#[derive(Debug)]
pub struct Assistant<R> {
    rng: R,
    transcript: Vec<ChatMessage>,
}

impl<R: Rng> Assistant<R> {
    /// Starts a chat with the greeting already in the transcript
    pub fn new(rng: R) -> Self {
        Self::with_greeting(rng, GREETING)
    }

    /// Starts a chat with a custom greeting, e.g. one addressing the user by name
    pub fn with_greeting(rng: R, greeting: impl Into<String>) -> Self {
        Self {
            rng,
            transcript: vec![ChatMessage {
                speaker: Speaker::Assistant,
                text: greeting.into(),
            }],
        }
    }

    /// Records the question and the reply. Blank input is ignored and yields `None`.
    pub fn ask(&mut self, input: &str) -> Option<&str> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let bucket = classify(input);
        let reply = respond(bucket, &mut self.rng);
        debug!(?bucket, "answered chat message");
        self.transcript.push(ChatMessage {
            speaker: Speaker::User,
            text: input.to_string(),
        });
        self.transcript.push(ChatMessage {
            speaker: Speaker::Assistant,
            text: reply.to_string(),
        });
        Some(reply)
    }

    /// Every message so far, greeting first
    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify("What's my cash position?"), Bucket::CashFlow);
        assert_eq!(classify("PREDICT next week"), Bucket::CashFlow);
        assert_eq!(classify("show my spending behavior"), Bucket::Patterns);
        assert_eq!(classify("how do I optimize"), Bucket::Savings);
        assert_eq!(classify("hello there"), Bucket::General);
        assert_eq!(classify(""), Bucket::General);
    }

    #[test]
    fn test_classify_checks_buckets_in_order() {
        // "spend" and "money" both match; patterns is checked first
        assert_eq!(classify("where does my money go when I spend"), Bucket::Patterns);
        // "cash" beats "save"
        assert_eq!(classify("save more cash"), Bucket::CashFlow);
    }

    #[test]
    fn test_respond_picks_from_bucket() {
        let mut rng = StdRng::seed_from_u64(7);
        for bucket in [
            Bucket::CashFlow,
            Bucket::Patterns,
            Bucket::Savings,
            Bucket::General,
        ] {
            for _ in 0..10 {
                assert!(bucket.responses().contains(&respond(bucket, &mut rng)));
            }
        }
    }

    #[test]
    fn test_respond_is_seed_deterministic() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            assert_eq!(respond(Bucket::Savings, &mut a), respond(Bucket::Savings, &mut b));
        }
    }

    #[test]
    fn test_transcript_records_exchange() {
        let mut assistant = Assistant::new(StdRng::seed_from_u64(1));
        assert_eq!(assistant.transcript().len(), 1);
        let reply = assistant.ask("  predict my balance ").unwrap().to_string();
        assert!(CASH_FLOW.contains(&reply.as_str()));
        let transcript = assistant.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].speaker(), Speaker::User);
        assert_eq!(transcript[1].text(), "predict my balance");
        assert_eq!(transcript[2].text(), reply);
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut assistant = Assistant::with_greeting(StdRng::seed_from_u64(1), "Hi Steve!");
        assert!(assistant.ask("   ").is_none());
        assert_eq!(assistant.transcript().len(), 1);
        assert_eq!(assistant.transcript()[0].text(), "Hi Steve!");
    }
}
