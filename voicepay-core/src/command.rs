use crate::amount::{AmountRule, CURRENCY, build_rules, extract_amount};
use crate::lexicon::Lexicon;
use crate::payee::{PayeeContext, PayeeRules, extract_payee};
use crate::types::PaymentIntent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("lexicon produced an invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// The outcome of one parse attempt. `raw_text` is always the exact input;
/// `amount` and `payee` are independently optional, and both absent means
/// the command was not understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub amount: Option<String>,
    pub payee: Option<String>,
    pub raw_text: String,
}

impl ParseResult {
    /// Resolves the result into a dispatchable intent, filling the
    /// downstream fallbacks ("Unknown" payee, "0" amount). `None` when
    /// neither field was extracted.
    pub fn into_intent(self) -> Option<PaymentIntent> {
        if self.amount.is_none() && self.payee.is_none() {
            return None;
        }
        Some(PaymentIntent {
            payee: self.payee.unwrap_or_else(|| "Unknown".into()),
            amount: self.amount.unwrap_or_else(|| "0".into()),
            raw_text: self.raw_text,
        })
    }
}

/// Maps free-form, multi-dialect transcript text to a payment intent.
///
/// Pure and deterministic: the same input always yields the same
/// `ParseResult`, and parsing never fails — absence is encoded in the
/// result, not as an error.
pub struct CommandParser {
    lexicon: Lexicon,
    amount_rules: Vec<AmountRule>,
    payee_rules: PayeeRules,
    number_strip_re: Regex,
    currency_strip_re: Regex,
    verb_strip_re: Regex,
    whitespace_re: Regex,
}

impl CommandParser {
    pub fn new(lexicon: Lexicon) -> Result<Self, LexiconError> {
        let amount_rules = build_rules(&lexicon)?;
        let payee_rules = PayeeRules::build(&lexicon)?;

        // Sorted for a stable pattern; `\b` guards make order irrelevant
        // to matching.
        let mut verbs: Vec<&str> = lexicon.action_verbs.iter().map(String::as_str).collect();
        verbs.sort_unstable();
        let verbs = verbs
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            lexicon,
            amount_rules,
            payee_rules,
            number_strip_re: Regex::new(r"\d+(?:[.,]\d+)?")?,
            currency_strip_re: Regex::new(CURRENCY)?,
            verb_strip_re: Regex::new(&format!(r"\b(?:{verbs})\b"))?,
            whitespace_re: Regex::new(r"\s+")?,
        })
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn parse(&self, raw_text: &str) -> ParseResult {
        let original = raw_text.trim();
        let text = original.to_lowercase();

        let amount = extract_amount(&self.amount_rules, &text);
        let name_candidate = self.name_candidate(&text);
        let cx = PayeeContext {
            text: &text,
            original,
            name_candidate: &name_candidate,
            amount: amount.as_ref(),
        };
        let payee = extract_payee(&self.lexicon, &self.payee_rules, &cx);

        ParseResult {
            amount: amount.map(|m| m.digits),
            payee,
            raw_text: raw_text.to_string(),
        }
    }

    // Note: currency stripping is substring-based (no word boundary), as in
    // the upstream behavior this mirrors; strategy 4's case scan covers the
    // rare name it mangles.
    fn name_candidate(&self, text: &str) -> String {
        let out = self.number_strip_re.replace_all(text, "");
        let out = self.currency_strip_re.replace_all(&out, "");
        let out = self.verb_strip_re.replace_all(&out, "");
        self.whitespace_re
            .replace_all(&out, " ")
            .trim()
            .to_string()
    }
}

fn default_parser() -> &'static CommandParser {
    static PARSER: OnceLock<CommandParser> = OnceLock::new();
    PARSER.get_or_init(|| {
        CommandParser::new(Lexicon::default()).expect("default lexicon compiles")
    })
}

/// Parses with the built-in en-IN lexicon.
pub fn parse(raw_text: &str) -> ParseResult {
    default_parser().parse(raw_text)
}
