use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-locale word sets driving amount and payee extraction.
///
/// Pure data: the parser compiles these into its rule tables, so swapping
/// in a different lexicon (e.g. loaded from config) swaps the whole
/// language surface without touching any extraction logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    /// Words that can never be part of a payee name.
    pub stop_words: HashSet<String>,

    /// Verbs stripped from the name-candidate text (whole-word).
    pub action_verbs: HashSet<String>,

    /// Verbs accepted adjacent to an amount ("pay 100", "100 rupees bhejo").
    pub amount_verbs: Vec<String>,

    /// Trailing recipient particles ("Abheek ko", "Ravi kku"), in priority order.
    pub recipient_postpositions: Vec<String>,

    /// Leading recipient markers ("to Rahul").
    pub leading_postpositions: Vec<String>,

    /// Particles accepted immediately before an amount ("ko 100", "se 50").
    pub amount_markers: Vec<String>,
}

impl Lexicon {
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn is_action_verb(&self, word: &str) -> bool {
        self.action_verbs.contains(word)
    }
}

fn word_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn word_list(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl Default for Lexicon {
    /// The combined en-IN lexicon: English, Hinglish, Tamil and Kannada
    /// transliterations sharing one Latin-script surface.
    fn default() -> Self {
        Self {
            stop_words: word_set(&[
                // English function words and currency
                "pay", "send", "transfer", "to", "rupees", "rs", "rupee", "the", "a", "an",
                "and", "or", "but", "in", "on", "at", "for", "of", "with", "by", "from", "as",
                "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
                "did", "will", "would", "could", "should", "may", "might", "must", "can",
                "this", "that", "these", "those",
                // Conversational filler; keeps small talk from becoming a payee
                "hello", "hi", "hey", "there", "please", "okay", "yes", "thanks", "thank",
                "you",
                // Hinglish
                "ko", "bejo", "bhejo", "de", "kar", "karo", "bhej", "bhejna", "dena", "karna",
                "mein", "se", "par", "ki", "ka", "ke", "ne", "bhejdo",
                // Tamil
                "ku", "kku", "kodungo", "kudungo", "kodu", "kodunga", "kudunga", "koduthu",
                "kuduthu", "kodukka", "kudukka", "anuppu", "anuppungo", "anuppunga",
                "anuppuva", "anuppuvom", "kodukiren", "kodutharen",
                // Kannada
                "ge", "kke", "kalisu", "koduva", "koduvudu", "kalisuva", "kalisuvudu",
                "koduve", "kalisuve",
            ]),
            action_verbs: word_set(&[
                "pay", "send", "transfer", "bejo", "bhejo", "de", "do", "kar", "karo",
                "kodungo", "kudungo", "kodu", "kodunga", "kudunga", "anuppu", "anuppungo",
                "kalisu", "koduva", "kalisuva",
            ]),
            amount_verbs: word_list(&[
                "pay", "send", "transfer", "bejo", "bhejo", "kodu", "kalisu", "kodungo",
                "anuppu",
            ]),
            recipient_postpositions: word_list(&["ko", "ku", "kku", "ge", "kke"]),
            leading_postpositions: word_list(&["to"]),
            amount_markers: word_list(&[
                "to", "ko", "ku", "kku", "ge", "kke", "mein", "se", "par",
            ]),
        }
    }
}
