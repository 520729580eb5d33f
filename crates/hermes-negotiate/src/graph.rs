//! Weighted media-type graphs.
//!
//! A [`TypeGraph`] maps a media group (`application`) to its subtypes
//! (`json`, `xml`) and the weight the owner assigned to each. Client graphs
//! come from `Accept`/`Content-Type` headers via [`TypeGraph::parse`]; server
//! graphs come from the list of types an operation produces via
//! [`TypeGraph::aggregate`]. [`TypeGraph::intersect`] combines the two and
//! [`TypeGraph::walk`] enumerates the result in preference order.
//!
//! ```text
//!   client: text/html, text/plain;q=0.9     server: text/troff, text/html
//!
//!   text ─┬─ html  1.0                       text ─┬─ troff 1.0
//!         └─ plain 0.9                             └─ html  1.0
//!
//!   intersect(server, client):  text ── html 1.0
//! ```

use hermes_core::mime::WILDCARD;
use hermes_core::MimeType;
use std::collections::BTreeMap;

/// One parsed media range from a header, before it is folded into a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    /// Top-level type, possibly `*`.
    pub group: String,
    /// Subtype, possibly `*`.
    pub subtype: String,
    /// Quality weight in `[0, 1]`.
    pub weight: f32,
}

impl AcceptEntry {
    /// Parses a single media range such as `text/html;level=1;q=0.7`.
    ///
    /// Returns `None` for entries without a `/` (other than a bare `*`).
    #[must_use]
    pub fn parse(part: &str) -> Option<Self> {
        let mut params = part.split(';');
        let range = params.next()?.trim().to_ascii_lowercase();
        let range = if range == WILDCARD { "*/*".to_string() } else { range };

        let (group, subtype) = range.split_once('/')?;
        let (group, subtype) = (group.trim(), subtype.trim());
        if group.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut weight = 1.0_f32;
        for param in params {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("q") {
                continue;
            }
            // Unparsable q keeps the default weight.
            if let Ok(q) = value.trim().parse::<f32>() {
                if !q.is_nan() {
                    weight = q.clamp(0.0, 1.0);
                }
            }
        }

        Some(Self {
            group: group.to_string(),
            subtype: subtype.to_string(),
            weight,
        })
    }
}

/// A weighted set of media types, grouped by top-level type.
///
/// # Example
///
/// ```
/// use hermes_core::MimeType;
/// use hermes_negotiate::TypeGraph;
///
/// let client = TypeGraph::parse("text/html, application/json;q=0.9");
/// let server = TypeGraph::aggregate(&[MimeType::APPLICATION_JSON, MimeType::TEXT_PLAIN]);
///
/// let matches = TypeGraph::intersect(&server, &client).walk();
/// assert_eq!(matches, vec![MimeType::APPLICATION_JSON]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeGraph {
    groups: BTreeMap<String, BTreeMap<String, f32>>,
}

impl TypeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `Accept`-style header value.
    ///
    /// Subtypes with a structured suffix (`vnd.api+json`) keep their full
    /// entry and are also exploded into one entry per `+`-separated part,
    /// all under the same group and weight. Later duplicates overwrite
    /// earlier ones.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut graph = Self::new();
        for entry in header
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(AcceptEntry::parse)
        {
            graph.insert(&entry.group, &entry.subtype, entry.weight);
            if entry.subtype.contains('+') {
                for part in entry.subtype.split('+').filter(|s| !s.is_empty()) {
                    graph.insert(&entry.group, part, entry.weight);
                }
            }
        }
        graph
    }

    /// Builds a graph from the types a server can produce, each at weight 1.
    ///
    /// Types are kept whole so codec lookups see the canonical type.
    #[must_use]
    pub fn aggregate<'a, I>(types: I) -> Self
    where
        I: IntoIterator<Item = &'a MimeType>,
    {
        let mut graph = Self::new();
        for mime in types {
            graph.insert(mime.group(), mime.subtype(), 1.0);
        }
        graph
    }

    /// Intersects a server graph with a client graph.
    ///
    /// A client `*/*` entry at weight `q` admits every server type at `q`
    /// unless the client names that exact type. A client `group/*` entry
    /// admits every server type in that group. `*/subtype` is not a wildcard.
    /// Result weights always come from the client. Neither input is modified.
    #[must_use]
    pub fn intersect(server: &Self, client: &Self) -> Self {
        let expanded;
        let client = match client.weight(WILDCARD, WILDCARD) {
            Some(q) => {
                let mut copy = client.clone();
                for (group, subtypes) in &server.groups {
                    let entry = copy.groups.entry(group.clone()).or_default();
                    for subtype in subtypes.keys() {
                        entry.entry(subtype.clone()).or_insert(q);
                    }
                }
                expanded = copy;
                &expanded
            }
            None => client,
        };

        let mut result = Self::new();
        for (group, subtypes) in &server.groups {
            let Some(accepted) = client.groups.get(group) else {
                continue;
            };
            let wildcard = accepted.get(WILDCARD).copied();
            for subtype in subtypes.keys() {
                if let Some(weight) = accepted.get(subtype).copied().or(wildcard) {
                    result.insert(group, subtype, weight);
                }
            }
        }
        result
    }

    /// Returns every entry in preference order.
    ///
    /// Entries are ordered by weight descending, then by canonical
    /// `group/subtype` string descending, so the order is total and does not
    /// depend on how the graph was built.
    #[must_use]
    pub fn walk(&self) -> Vec<MimeType> {
        let mut entries: Vec<(MimeType, f32)> = self
            .groups
            .iter()
            .flat_map(|(group, subtypes)| {
                subtypes
                    .iter()
                    .map(move |(subtype, weight)| (MimeType::new(group, subtype), *weight))
            })
            .collect();
        entries.sort_by(|(a, wa), (b, wb)| wb.total_cmp(wa).then_with(|| b.cmp(a)));
        entries.into_iter().map(|(mime, _)| mime).collect()
    }

    /// Inserts or overwrites an entry. The weight is clamped to `[0, 1]`.
    pub fn insert(&mut self, group: &str, subtype: &str, weight: f32) {
        self.groups
            .entry(group.to_ascii_lowercase())
            .or_default()
            .insert(subtype.to_ascii_lowercase(), weight.clamp(0.0, 1.0));
    }

    /// Returns the weight of an exact entry.
    #[must_use]
    pub fn weight(&self, group: &str, subtype: &str) -> Option<f32> {
        self.groups.get(group)?.get(subtype).copied()
    }

    /// Returns true if the graph contains the exact type.
    #[must_use]
    pub fn contains(&self, mime: &MimeType) -> bool {
        self.weight(mime.group(), mime.subtype()).is_some()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    /// Returns true if the graph has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(BTreeMap::is_empty)
    }
}
