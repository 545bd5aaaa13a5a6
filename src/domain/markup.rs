use std::collections::BTreeSet;

use regex::{Captures, Regex};
use tracing::warn;

use crate::domain::crossref::CrossrefTable;

const MARKUP: [(&str, &str); 4] = [
    ("{{{", "```"),
    ("}}}", "```"),
    ("'''", "**"),
    ("[[BR]]", ""),
];

/// Converts Trac wiki text into the remote tracker's markdown, pointing
/// `#<id>` references at the migrated issue numbers.
pub struct TextRewriter {
    crossref_token: Regex,
}

impl TextRewriter {
    pub fn new() -> Self {
        Self {
            crossref_token: Regex::new(r"#([0-9]+)").expect("crossreference pattern is valid"),
        }
    }

    pub fn rewrite(&self, crossref: &CrossrefTable, text: &str) -> String {
        let (rewritten, unresolved) = self.rewrite_references(crossref, text);
        for old in unresolved {
            warn!(ticket = %old, "failed to resolve crossreferenced ticket, leaving as is");
        }

        MARKUP
            .iter()
            .fold(rewritten, |acc, (from, to)| acc.replace(from, to))
    }

    /// Returns the text with every known `#<id>` rewritten, plus the ids
    /// that had no mapping. Ids too large to be a ticket count as misses.
    fn rewrite_references(
        &self,
        crossref: &CrossrefTable,
        text: &str,
    ) -> (String, BTreeSet<String>) {
        let mut unresolved = BTreeSet::new();
        let rewritten = self
            .crossref_token
            .replace_all(text, |caps: &Captures<'_>| {
                let resolved = caps[1]
                    .parse::<u64>()
                    .ok()
                    .and_then(|old| crossref.resolve(old).ok());
                match resolved {
                    Some(new) => format!("#{new}"),
                    None => {
                        unresolved.insert(caps[1].to_string());
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();
        (rewritten, unresolved)
    }
}

impl Default for TextRewriter {
    fn default() -> Self {
        Self::new()
    }
}
