use crate::amount::AmountMatch;
use crate::lexicon::Lexicon;
use regex::Regex;

// Payee extraction is deliberately recall-over-precision: five cheap,
// order-sensitive heuristics tried in a fixed order. The try-order must
// not change; downstream tests depend on it being reproducible.

pub(crate) struct PayeeRules {
    postposition_rules: Vec<PostpositionRule>,
    before_amount_rules: Vec<Regex>,
    marker_strip_re: Regex,
    whitespace_re: Regex,
}

struct PostpositionRule {
    re: Regex,
}

impl PayeeRules {
    pub(crate) fn build(lexicon: &Lexicon) -> Result<Self, regex::Error> {
        // Transcripts are Latin-script transliterations, so `[a-z]` word
        // runs are the name alphabet.
        let mut postposition_rules = Vec::new();
        for particle in &lexicon.recipient_postpositions {
            let p = regex::escape(particle);
            postposition_rules.push(PostpositionRule {
                re: Regex::new(&format!(r"([a-z]+(?:\s+[a-z]+)*?)\s+{p}\s+"))?,
            });
        }
        for particle in &lexicon.leading_postpositions {
            let p = regex::escape(particle);
            postposition_rules.push(PostpositionRule {
                re: Regex::new(&format!(r"(?:^|\s){p}\s+([a-z]+(?:\s+[a-z]+)*?)(?:\s|$)"))?,
            });
        }

        let mut before_amount_rules = Vec::new();
        for particle in lexicon
            .recipient_postpositions
            .iter()
            .chain(lexicon.leading_postpositions.iter())
        {
            let p = regex::escape(particle);
            before_amount_rules.push(Regex::new(&format!(
                r"([a-z]+(?:\s+[a-z]+)*?)\s+{p}\s*$"
            ))?);
        }

        let mut strip_words: Vec<String> = lexicon.action_verbs.iter().cloned().collect();
        strip_words.sort();
        strip_words.extend(lexicon.amount_markers.iter().cloned());
        let strip_words = strip_words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            postposition_rules,
            before_amount_rules,
            marker_strip_re: Regex::new(&format!(r"\b(?:{strip_words})\b"))?,
            whitespace_re: Regex::new(r"\s+")?,
        })
    }
}

pub(crate) struct PayeeContext<'a> {
    /// Lowercased, trimmed transcript.
    pub text: &'a str,
    /// Case-preserved, trimmed transcript.
    pub original: &'a str,
    /// Transcript with digits, currency tokens and action verbs stripped.
    pub name_candidate: &'a str,
    pub amount: Option<&'a AmountMatch>,
}

type Strategy = fn(&Lexicon, &PayeeRules, &PayeeContext) -> Option<String>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("postposition-anchor", postposition_anchor),
    ("around-amount", around_amount),
    ("trailing-content-words", trailing_content_words),
    ("capitalized-tokens", capitalized_tokens),
    ("leading-content-words", leading_content_words),
];

/// Runs the cascade: first strategy with a non-empty candidate wins, then
/// one cleanup pass re-filters the chosen words. The cleanup can still
/// reject the candidate outright (it does not fall through to later
/// strategies), matching the fixed try-order contract.
pub(crate) fn extract_payee(
    lexicon: &Lexicon,
    rules: &PayeeRules,
    cx: &PayeeContext,
) -> Option<String> {
    let mut candidate = None;
    for (_name, strategy) in STRATEGIES {
        if let Some(found) = strategy(lexicon, rules, cx) {
            candidate = Some(found);
            break;
        }
    }
    candidate.and_then(|c| final_cleanup(lexicon, &c))
}

fn is_content_word(lexicon: &Lexicon, word: &str) -> bool {
    word.chars().count() > 2
        && !word.chars().all(|c| c.is_ascii_digit())
        && !lexicon.is_stop_word(word)
        && !lexicon.is_action_verb(word)
}

fn is_currency_word(word: &str) -> bool {
    matches!(word, "rupee" | "rupees" | "rs")
}

fn content_words<'a>(lexicon: &Lexicon, text: &'a str) -> Vec<&'a str> {
    text.split_whitespace()
        .filter(|w| is_content_word(lexicon, w))
        .collect()
}

fn postposition_anchor(lexicon: &Lexicon, rules: &PayeeRules, cx: &PayeeContext) -> Option<String> {
    for rule in &rules.postposition_rules {
        let Some(caps) = rule.re.captures(cx.name_candidate) else {
            continue;
        };
        let Some(name) = caps.get(1) else {
            continue;
        };
        let words = content_words(lexicon, name.as_str());
        if !words.is_empty() {
            return Some(capitalize_name(&words.join(" ")));
        }
    }
    None
}

fn around_amount(lexicon: &Lexicon, rules: &PayeeRules, cx: &PayeeContext) -> Option<String> {
    let amount = cx.amount?;

    // "[name] ko [amount]": the postposition lands at the end of the text
    // preceding the amount match.
    let before = cx.text[..amount.start].trim();
    for re in &rules.before_amount_rules {
        let Some(caps) = re.captures(before) else {
            continue;
        };
        let Some(name) = caps.get(1) else {
            continue;
        };
        let words = content_words(lexicon, name.as_str());
        if !words.is_empty() {
            return Some(capitalize_name(&words.join(" ")));
        }
    }

    // Otherwise harvest what follows the amount, minus verbs and markers.
    let after = cx.text[amount.end..].trim();
    let cleaned = rules.marker_strip_re.replace_all(after, "");
    let cleaned = rules.whitespace_re.replace_all(&cleaned, " ");
    let words: Vec<&str> = cleaned
        .trim()
        .split_whitespace()
        .filter(|w| is_content_word(lexicon, w) && !is_currency_word(w))
        .take(3)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(capitalize_name(&words.join(" ")))
    }
}

fn trailing_content_words(
    lexicon: &Lexicon,
    _rules: &PayeeRules,
    cx: &PayeeContext,
) -> Option<String> {
    let words = content_words(lexicon, cx.name_candidate);
    if words.is_empty() {
        return None;
    }
    let tail = &words[words.len().saturating_sub(2)..];
    Some(capitalize_name(&tail.join(" ")))
}

fn capitalized_tokens(lexicon: &Lexicon, _rules: &PayeeRules, cx: &PayeeContext) -> Option<String> {
    let words: Vec<&str> = cx
        .original
        .split_whitespace()
        .filter(|w| {
            let Some(first) = w.chars().next() else {
                return false;
            };
            let lower = w.to_lowercase();
            w.chars().count() > 2
                && first.is_uppercase()
                && !w.chars().all(|c| c.is_ascii_digit())
                && !lexicon.is_stop_word(&lower)
                && !lexicon.is_action_verb(&lower)
        })
        .collect();
    if words.is_empty() {
        return None;
    }
    let tail = &words[words.len().saturating_sub(2)..];
    Some(capitalize_name(&tail.join(" ")))
}

fn leading_content_words(
    lexicon: &Lexicon,
    _rules: &PayeeRules,
    cx: &PayeeContext,
) -> Option<String> {
    let words = content_words(lexicon, cx.name_candidate);
    if words.is_empty() {
        return None;
    }
    let head = &words[..words.len().min(2)];
    Some(capitalize_name(&head.join(" ")))
}

fn final_cleanup(lexicon: &Lexicon, candidate: &str) -> Option<String> {
    let words: Vec<&str> = candidate
        .split_whitespace()
        .filter(|w| {
            let lower = w.to_lowercase();
            !lexicon.is_stop_word(&lower) && !lexicon.is_action_verb(&lower)
        })
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(capitalize_name(&words.join(" ")))
    }
}

/// Title-cases each word, except that a token already starting with an
/// uppercase letter and longer than two characters is kept verbatim (it is
/// treated as an already-proper-cased name). This can misfire on
/// sentence-initial words; the behavior is intentional.
pub(crate) fn capitalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if first.is_uppercase() && word.chars().count() > 2 {
        return word.to_string();
    }
    let rest = chars.as_str().to_lowercase();
    format!("{}{rest}", first.to_uppercase())
}
