//! Pure extractors over post text.

/// Returns the alphanumeric part of every `$`-prefixed token, case preserved,
/// duplicates included.
pub fn extract_tickers(text: &str) -> Vec<&str> {
    let mut tickers = Vec::new();
    let mut rest = text;

    while let Some(dollar) = rest.find('$') {
        let after = &rest[dollar + 1..];
        let len = after
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(after.len());
        if len > 0 {
            tickers.push(&after[..len]);
        }
        rest = &after[len..];
    }

    tickers
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive whole-word search for `needle` in `haystack`.
/// `needle` must already be lowercase.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, matched)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        let after_ok = haystack[start + matched.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c));
        before_ok && after_ok
    })
}

/// Fixed, finite set of exchange names, partitioned into search groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeCatalog {
    names: Vec<String>,
    groups: Vec<Vec<String>>,
}

impl ExchangeCatalog {
    /// Names are stored lowercase. Groups are expected to be drawn from
    /// `names`; `ScoutConfig::validate` enforces this for configured catalogs.
    pub fn new(names: Vec<String>, groups: Vec<Vec<String>>) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|n| n.to_lowercase()).collect();
        Self {
            names: lower(names),
            groups: groups.into_iter().map(lower).collect(),
        }
    }

    /// Builds groups of at most `group_size` consecutive catalog entries.
    pub fn chunked(names: Vec<String>, group_size: usize) -> Self {
        let groups = names
            .chunks(group_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        Self::new(names, groups)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Every catalog entry mentioned as a whole word, in catalog order.
    pub fn detect_mentions(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.names
            .iter()
            .filter(|name| contains_word(&lowered, name))
            .cloned()
            .collect()
    }
}
