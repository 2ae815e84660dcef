use crate::lexicon::Lexicon;
use regex::Regex;

// Currency markers and digit runs as they appear in lowercased transcripts.
// Amounts keep `[.,]` groups in the capture and strip them afterwards; no
// locale-aware decimal handling is attempted.
pub(crate) const CURRENCY: &str = r"(?:₹|rupees?|rs\.?)";
const NUMBER: &str = r"(\d+(?:[.,]\d+)?)";

/// One entry of the ordered amount-extraction table.
#[derive(Debug)]
pub struct AmountRule {
    pub name: &'static str,
    pub re: Regex,
}

/// A located amount: stripped digits plus the byte span of the whole match
/// (used by the around-amount payee strategy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountMatch {
    pub digits: String,
    pub start: usize,
    pub end: usize,
    pub rule: &'static str,
}

fn alternation(words: &[String]) -> String {
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

/// Compiles the lexicon into the six-rule priority table. Rules are tried
/// in order and the first match wins, so "pay 100 to 200" resolves to the
/// verb-adjacent amount.
pub(crate) fn build_rules(lexicon: &Lexicon) -> Result<Vec<AmountRule>, regex::Error> {
    let verbs = alternation(&lexicon.amount_verbs);
    let markers = alternation(&lexicon.amount_markers);

    let mut postpositions = lexicon.leading_postpositions.clone();
    postpositions.extend(lexicon.recipient_postpositions.iter().cloned());
    let postpositions = alternation(&postpositions);

    let table = [
        ("currency-prefix", format!(r"^{CURRENCY}?\s*{NUMBER}")),
        (
            "verb-then-amount",
            format!(r"(?:{verbs})\s*{CURRENCY}?\s*{NUMBER}"),
        ),
        (
            "amount-then-verb",
            format!(r"{NUMBER}\s*{CURRENCY}\s*(?:{verbs})"),
        ),
        (
            "marker-then-amount",
            format!(r"(?:{markers})\s*{CURRENCY}?\s*{NUMBER}"),
        ),
        (
            "amount-then-postposition",
            format!(r"{NUMBER}\s*{CURRENCY}?\s*(?:{postpositions})"),
        ),
        ("bare-number", NUMBER.to_string()),
    ];

    table
        .into_iter()
        .map(|(name, pattern)| Regex::new(&pattern).map(|re| AmountRule { name, re }))
        .collect()
}

pub(crate) fn extract_amount(rules: &[AmountRule], text: &str) -> Option<AmountMatch> {
    for rule in rules {
        let Some(caps) = rule.re.captures(text) else {
            continue;
        };
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        return Some(AmountMatch {
            digits: digits.as_str().replace(['.', ','], ""),
            start: whole.start(),
            end: whole.end(),
            rule: rule.name,
        });
    }
    None
}
