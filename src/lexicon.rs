//! Keyword lexicon and intent classification.
//!
//! Classification is presence-based: the lowercased instruction is scanned
//! for each family's variants in a fixed priority order (add, update, delete,
//! date-bearing how-many/find, how-many, filter). First family with a hit
//! wins; no scoring, no fuzzy matching. Each family carries its French
//! synonyms alongside the English variants, since the data this fronts comes
//! from a bilingual import pipeline.

use serde::{Deserialize, Serialize};

/// The classified purpose of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Add,
    Update,
    Delete,
    DateQuery,
    Count,
    Filter,
    Unrecognized,
}

/// Keyword families used to classify instructions.
///
/// The default lexicon covers the supported English vocabulary plus French
/// pairs. Families are matched by substring presence against the lowercased
/// instruction, so multi-word phrases ("how many", "mettre a jour") work the
/// same way as single words.
#[derive(Debug, Clone)]
pub struct IntentLexicon {
    add: Vec<&'static str>,
    update: Vec<&'static str>,
    delete: Vec<&'static str>,
    count: Vec<&'static str>,
    find: Vec<&'static str>,
    date_markers: Vec<&'static str>,
    today: Vec<&'static str>,
    yesterday: Vec<&'static str>,
}

impl Default for IntentLexicon {
    fn default() -> Self {
        Self {
            add: vec!["add", "insert", "ajouter", "ajoute"],
            update: vec!["update", "edit", "set", "modifier", "modifie", "mettre a jour"],
            delete: vec!["delete", "remove", "supprimer", "supprime"],
            count: vec!["how many", "count", "combien"],
            find: vec![
                "find", "show", "display", "filter", "list", "trouver", "afficher", "montrer",
            ],
            date_markers: vec!["date"],
            today: vec!["today", "aujourd'hui"],
            yesterday: vec!["yesterday", "hier"],
        }
    }
}

impl IntentLexicon {
    /// Classify an instruction into its intent family.
    pub fn classify(&self, instruction: &str) -> Intent {
        let text = instruction.to_lowercase();

        if hits(&self.add, &text) {
            return Intent::Add;
        }
        if hits(&self.update, &text) {
            return Intent::Update;
        }
        if hits(&self.delete, &text) {
            return Intent::Delete;
        }

        let count = hits(&self.count, &text);
        let find = hits(&self.find, &text);
        if hits(&self.date_markers, &text) && (count || find) {
            return Intent::DateQuery;
        }
        if count {
            return Intent::Count;
        }
        if find {
            return Intent::Filter;
        }

        Intent::Unrecognized
    }

    /// True when the (lowercased) text carries a find-family keyword.
    /// The date-query branch uses this to choose rows-vs-count output.
    pub fn has_find_keyword(&self, lowered: &str) -> bool {
        hits(&self.find, lowered)
    }

    /// True when the (lowercased) text names today.
    pub fn mentions_today(&self, lowered: &str) -> bool {
        hits(&self.today, lowered)
    }

    /// True when the (lowercased) text names yesterday.
    pub fn mentions_yesterday(&self, lowered: &str) -> bool {
        hits(&self.yesterday, lowered)
    }
}

fn hits(family: &[&str], lowered: &str) -> bool {
    family.iter().any(|kw| lowered.contains(kw))
}
