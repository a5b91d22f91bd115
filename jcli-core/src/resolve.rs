//! Name resolution
//!
//! Resolves partial operator input ("eur", "feature-123") against the known
//! names of one namespace. Matching is tried in stages: exact, substring,
//! then hyphen/slash token matching. When nothing matches, the closest names
//! are offered as suggestions.
//!
//! How ties are broken is decided by a [`ResolvePolicy`]. Services and jobs
//! report ties as [`Resolution::Ambiguous`]; branches let the most recently
//! used candidate win.

use crate::domain::name::Namespace;
use crate::error::{Error, Result};

/// Maximum number of names offered when nothing matches
pub const MAX_SUGGESTIONS: usize = 5;

/// Known names of a single namespace
#[derive(Debug, Clone)]
pub struct NameStore {
    namespace: Namespace,
    names: Vec<String>,
    /// Names are stored most recent first and their index is their rank
    ranked: bool,
}

impl NameStore {
    /// Build a store from names in their natural order
    ///
    /// Exact duplicates are dropped, keeping the first occurrence.
    pub fn new<I, S>(namespace: Namespace, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace,
            names: dedup(names),
            ranked: false,
        }
    }

    /// Build a store carrying recency ranks
    ///
    /// `names` must be ordered most recently used first.
    pub fn with_recency<I, S>(namespace: Namespace, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace,
            names: dedup(names),
            ranked: true,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn has_recency(&self) -> bool {
        self.ranked
    }

    /// Recency rank of a name (0 = most recent), if the store is ranked
    pub fn recency_rank(&self, name: &str) -> Option<usize> {
        if !self.ranked {
            return None;
        }
        self.names.iter().position(|n| n == name)
    }
}

fn dedup<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.into();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// What to do when several names match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Report every candidate and let the caller decide
    Ambiguous,
    /// Pick the most recently used candidate
    MostRecent,
}

/// Namespace-specific resolution behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvePolicy {
    pub tie_break: TieBreak,
    /// Common name prefix that is ignored when ranking and token matching,
    /// e.g. `test-collateral-` in `test-collateral-api-build`
    pub ignored_prefix: Option<String>,
    pub max_suggestions: usize,
}

impl ResolvePolicy {
    pub fn for_namespace(namespace: Namespace) -> Self {
        let tie_break = match namespace {
            Namespace::Branch => TieBreak::MostRecent,
            Namespace::Service | Namespace::Job => TieBreak::Ambiguous,
        };
        Self {
            tie_break,
            ignored_prefix: None,
            max_suggestions: MAX_SUGGESTIONS,
        }
    }

    pub fn with_ignored_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().to_lowercase();
        self.ignored_prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    fn strip<'a>(&self, lower: &'a str) -> Option<&'a str> {
        self.ignored_prefix
            .as_deref()
            .and_then(|prefix| lower.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
    }
}

/// Result of resolving a partial name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The input equals a stored name, ignoring case
    Exact(String),
    /// Exactly one name matched, or the tie-break picked one
    Unique(String),
    /// Several names matched; best ranked first
    Ambiguous(Vec<String>),
    /// Nothing matched; closest names first
    NoMatch(Vec<String>),
}

impl Resolution {
    /// The resolved name for `Exact` and `Unique`
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Exact(name) | Resolution::Unique(name) => Some(name),
            Resolution::Ambiguous(_) | Resolution::NoMatch(_) => None,
        }
    }

    /// Turn the resolution into a name or a resolution error
    ///
    /// With `accept_best`, an ambiguous resolution yields its first ranked
    /// candidate instead of an error.
    pub fn into_name(self, namespace: Namespace, input: &str, accept_best: bool) -> Result<String> {
        match self {
            Resolution::Exact(name) | Resolution::Unique(name) => Ok(name),
            Resolution::Ambiguous(mut candidates) if accept_best && !candidates.is_empty() => {
                Ok(candidates.swap_remove(0))
            }
            Resolution::Ambiguous(candidates) => Err(Error::Ambiguous {
                namespace,
                input: input.to_string(),
                candidates,
            }),
            Resolution::NoMatch(suggestions) => Err(Error::NoMatch {
                namespace,
                input: input.to_string(),
                suggestions,
            }),
        }
    }
}

/// Resolve with the default policy of the store's namespace
pub fn resolve(partial: &str, store: &NameStore) -> Resolution {
    resolve_with(partial, store, &ResolvePolicy::for_namespace(store.namespace()))
}

/// Resolve a partial name against a store
pub fn resolve_with(partial: &str, store: &NameStore, policy: &ResolvePolicy) -> Resolution {
    let needle = partial.trim().to_lowercase();
    if needle.is_empty() {
        let first = store.names.iter().take(policy.max_suggestions).cloned();
        return Resolution::NoMatch(first.collect());
    }

    if let Some(name) = exact_match(partial.trim(), &needle, store) {
        return Resolution::Exact(name.clone());
    }

    let substring: Vec<usize> = matching(store, |lower| lower.contains(&needle));
    if !substring.is_empty() {
        return pick(substring, &needle, store, policy);
    }

    let partial_tokens = tokens(&needle);
    let tokenized: Vec<usize> = matching(store, |lower| {
        token_match(&partial_tokens, lower)
            || policy
                .strip(lower)
                .is_some_and(|rest| token_match(&partial_tokens, rest))
    });
    if !tokenized.is_empty() {
        return pick(tokenized, &needle, store, policy);
    }

    Resolution::NoMatch(suggest(&needle, store, policy))
}

fn exact_match<'a>(input: &str, needle: &str, store: &'a NameStore) -> Option<&'a String> {
    store
        .names
        .iter()
        .find(|name| name.as_str() == input)
        .or_else(|| store.names.iter().find(|name| name.to_lowercase() == needle))
}

fn matching(store: &NameStore, pred: impl Fn(&str) -> bool) -> Vec<usize> {
    store
        .names
        .iter()
        .enumerate()
        .filter(|(_, name)| pred(&name.to_lowercase()))
        .map(|(idx, _)| idx)
        .collect()
}

fn pick(mut candidates: Vec<usize>, needle: &str, store: &NameStore, policy: &ResolvePolicy) -> Resolution {
    if candidates.len() == 1 {
        return Resolution::Unique(store.names[candidates[0]].clone());
    }

    if policy.tie_break == TieBreak::MostRecent && store.ranked {
        // Index order is recency order in a ranked store.
        candidates.sort_unstable();
        return Resolution::Unique(store.names[candidates[0]].clone());
    }

    candidates.sort_by_cached_key(|&idx| {
        let lower = store.names[idx].to_lowercase();
        let leading = lower.starts_with(needle)
            || policy.strip(&lower).is_some_and(|rest| rest.starts_with(needle));
        (!leading, lower.len(), lower, idx)
    });

    if policy.tie_break == TieBreak::MostRecent {
        return Resolution::Unique(store.names[candidates[0]].clone());
    }

    Resolution::Ambiguous(
        candidates
            .into_iter()
            .map(|idx| store.names[idx].clone())
            .collect(),
    )
}

fn tokens(s: &str) -> Vec<&str> {
    s.split(['-', '/']).filter(|t| !t.is_empty()).collect()
}

/// Token-granular prefix match in either direction
///
/// Either every partial token abbreviates the corresponding leading name
/// token, or the name's tokens are a leading run of the partial's tokens.
fn token_match(partial: &[&str], lower_name: &str) -> bool {
    if partial.is_empty() {
        return false;
    }
    let name = tokens(lower_name);
    if name.is_empty() {
        return false;
    }

    let abbreviates = partial.len() <= name.len()
        && partial.iter().zip(&name).all(|(p, n)| n.starts_with(p));
    let extends =
        name.len() <= partial.len() && name.iter().zip(partial).all(|(n, p)| n == p);

    abbreviates || extends
}

/// Closest names to `needle`
///
/// Ranked by longest shared prefix, then smallest edit distance, then
/// store order.
fn suggest(needle: &str, store: &NameStore, policy: &ResolvePolicy) -> Vec<String> {
    let mut scored: Vec<(usize, usize, usize)> = store
        .names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let lower = name.to_lowercase();
            let mut shared = shared_prefix(needle, &lower);
            let mut distance = levenshtein(needle, &lower);
            if let Some(rest) = policy.strip(&lower) {
                shared = shared.max(shared_prefix(needle, rest));
                distance = distance.min(levenshtein(needle, rest));
            }
            (idx, shared, distance)
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));

    scored
        .into_iter()
        .take(policy.max_suggestions)
        .map(|(idx, _, _)| store.names[idx].clone())
        .collect()
}

fn shared_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Levenshtein edit distance over chars
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}
