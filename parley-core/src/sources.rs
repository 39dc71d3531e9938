use std::collections::HashMap;

use parley_client::RankedResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Source;

const MAX_TITLE_CHARS: usize = 35;
const TITLE_HEAD_CHARS: usize = 15;
const TITLE_TAIL_CHARS: usize = 17;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("reference index {index} out of range ({len} ranked results)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Which sources a widget shows under an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDisplay {
    All,
    #[default]
    LinkToSourceOnly,
    None,
}

impl SourceDisplay {
    pub fn filter<'a>(self, sources: &'a [Source]) -> Vec<&'a Source> {
        match self {
            SourceDisplay::All => sources.iter().collect(),
            SourceDisplay::LinkToSourceOnly => sources.iter().filter(|s| s.has_link()).collect(),
            SourceDisplay::None => Vec::new(),
        }
    }
}

impl std::str::FromStr for SourceDisplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SourceDisplay::All),
            "link_to_source_only" | "links" => Ok(SourceDisplay::LinkToSourceOnly),
            "none" => Ok(SourceDisplay::None),
            _ => Err(format!("unknown source display mode: {}", s)),
        }
    }
}

/// Resolves cited indices into sources, in citation order.
///
/// Repeated titles are numbered by occurrence (`"A"`, `"A (2)"`, ...) rather
/// than merged, so every citation keeps its own entry.
pub fn format_sources(
    reference_indices: &[usize],
    ranked_results: &[RankedResult],
) -> Result<Vec<Source>, SourceError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut sources = Vec::with_capacity(reference_indices.len());

    for &index in reference_indices {
        let result = ranked_results.get(index).ok_or(SourceError::IndexOutOfRange {
            index,
            len: ranked_results.len(),
        })?;
        let document = &result.metadata;

        let count = seen.entry(document.title.as_str()).or_insert(0);
        *count += 1;

        let title = if *count > 1 {
            format!("{} ({})", document.title, count)
        } else {
            document.title.clone()
        };

        sources.push(Source {
            document: document.clone(),
            display_title: truncate_title(&title),
        });
    }

    Ok(sources)
}

/// Shortens titles over 35 characters to `head...tail`, 35 characters total.
pub fn truncate_title(title: &str) -> String {
    let len = title.chars().count();
    if len <= MAX_TITLE_CHARS {
        return title.to_string();
    }

    let head: String = title.chars().take(TITLE_HEAD_CHARS).collect();
    let tail: String = title.chars().skip(len - TITLE_TAIL_CHARS).collect();
    format!("{}...{}", head, tail)
}
