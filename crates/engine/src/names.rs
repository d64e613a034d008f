//! Fragment-grammar name generator used for monsters and save files.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::RngCore;
use thiserror::Error;

const DEFAULT_PREFIXES: &[&str] = &[
    "Ash", "Bram", "Cold", "Dun", "Ember", "Fen", "Grim", "Hollow", "Iron", "Mire", "Oak",
    "Raven", "Stone", "Thorn", "Vex", "Wither",
];
const DEFAULT_SUFFIXES: &[&str] = &[
    "bane", "crag", "fang", "gard", "hold", "maw", "moor", "rot", "shade", "spire", "tusk",
    "vale", "wick",
];
const DEFAULT_EPITHETS: &[&str] = &[
    "the Ashen",
    "the Bold",
    "of the Deep",
    "the Gnawing",
    "of Seven Pits",
    "the Unburied",
    "the Wary",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameGrammarError {
    #[error("name grammar table '{table}' is empty")]
    EmptyTable { table: &'static str },
    #[error("name fragment '{fragment}' in table '{table}' is not usable")]
    InvalidFragment {
        table: &'static str,
        fragment: String,
    },
}

/// Immutable fragment tables. A name is `prefix + suffix + " " + epithet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameGrammar {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    epithets: Vec<String>,
}

impl NameGrammar {
    /// Fragments may hold ASCII letters and digits; epithets may also hold
    /// single inner spaces.
    pub fn new(
        prefixes: Vec<String>,
        suffixes: Vec<String>,
        epithets: Vec<String>,
    ) -> Result<Self, NameGrammarError> {
        validate_table("prefixes", &prefixes, false)?;
        validate_table("suffixes", &suffixes, false)?;
        validate_table("epithets", &epithets, true)?;
        Ok(Self {
            prefixes,
            suffixes,
            epithets,
        })
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn epithets(&self) -> &[String] {
        &self.epithets
    }

    /// Every non-space character that can appear in a generated name.
    pub fn fragment_charset(&self) -> BTreeSet<char> {
        self.prefixes
            .iter()
            .chain(&self.suffixes)
            .chain(&self.epithets)
            .flat_map(|fragment| fragment.chars())
            .filter(|ch| *ch != ' ')
            .collect()
    }
}

impl Default for NameGrammar {
    fn default() -> Self {
        let owned = |table: &[&str]| -> Vec<String> {
            table.iter().map(|s| s.to_string()).collect()
        };
        Self {
            prefixes: owned(DEFAULT_PREFIXES),
            suffixes: owned(DEFAULT_SUFFIXES),
            epithets: owned(DEFAULT_EPITHETS),
        }
    }
}

fn validate_table(
    table: &'static str,
    fragments: &[String],
    allow_inner_spaces: bool,
) -> Result<(), NameGrammarError> {
    if fragments.is_empty() {
        return Err(NameGrammarError::EmptyTable { table });
    }
    for fragment in fragments {
        let words_ok = if allow_inner_spaces {
            fragment.split(' ').all(|word| !word.is_empty())
        } else {
            !fragment.is_empty() && !fragment.contains(' ')
        };
        let chars_ok = fragment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == ' ');
        if !words_ok || !chars_ok {
            return Err(NameGrammarError::InvalidFragment {
                table,
                fragment: fragment.clone(),
            });
        }
    }
    Ok(())
}

fn pick<'a>(table: &'a [String], rng: &mut dyn RngCore) -> &'a str {
    // Tables are validated non-empty at construction.
    table.choose(rng).map(String::as_str).unwrap_or_default()
}

pub fn generate_name(grammar: &NameGrammar, rng: &mut dyn RngCore) -> String {
    let prefix = pick(&grammar.prefixes, rng);
    let suffix = pick(&grammar.suffixes, rng);
    let epithet = pick(&grammar.epithets, rng);
    format!("{prefix}{suffix} {epithet}")
}

/// Filesystem-safe variant of [`generate_name`].
pub fn generate_file_name(grammar: &NameGrammar, rng: &mut dyn RngCore) -> String {
    generate_name(grammar, rng).replace(' ', "-")
}
