// Schema knowledge about the shipped configuration universe.
//
// The mirror treats most sections as plain string values; a few sections hold
// comma-delimited lists. Which sections those are, which keys get randomized
// on first run, and the parser artifact key are data here, not conditionals
// scattered through the parsing code.

/// How a section's raw values appear in the live mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// Values stay as single strings.
    Plain,
    /// Values are comma-delimited and are split into lists.
    List,
}

/// Sections whose values are comma-delimited lists.
const LIST_SECTIONS: &[&str] = &["Indexers", "PotatoIndexers", "Quality"];

/// Key emitted by some INI parsers as a section-name artifact; never user
/// data, always dropped from the mirror.
pub const ARTIFACT_KEY: &str = "__name__";

/// What kind of random value a first-run key receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandomKind {
    /// Hour of day, zero-padded to two characters ("00".."23").
    Hour,
    /// Minute, zero-padded to two characters ("00".."59").
    Minute,
    /// 128-bit value as 32 lowercase hex characters.
    ApiKey,
}

/// The template keys that `ConfigStore::initialize` overwrites with random
/// values: the search schedule pair, the update schedule pair, and the API
/// key. Each schedule component is drawn independently.
pub const RANDOMIZED_KEYS: &[(&str, &str, RandomKind)] = &[
    ("Search", "searchtimehr", RandomKind::Hour),
    ("Search", "searchtimemin", RandomKind::Minute),
    ("Server", "installupdatehr", RandomKind::Hour),
    ("Server", "installupdatemin", RandomKind::Minute),
    ("Server", "apikey", RandomKind::ApiKey),
];

/// Look up how values in the named section are represented in the mirror.
pub fn value_kind(section: &str) -> ValueKind {
    if LIST_SECTIONS.contains(&section) {
        ValueKind::List
    } else {
        ValueKind::Plain
    }
}
