//! Priority roster: curated authors, institutions, and adjacent-topic
//! keywords that boost an item's final score multiplicatively.

use std::collections::{HashMap, HashSet};

use magpie_core::Item;

/// Priority level of a curated author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorPriority {
    /// Always surfaced; score floor-clamped so it cannot be crowded out.
    Critical,
    High,
    Medium,
}

impl AuthorPriority {
    /// Score multiplier for this priority level.
    pub fn multiplier(&self) -> f64 {
        match self {
            AuthorPriority::Critical => 2.0,
            AuthorPriority::High => 1.5,
            AuthorPriority::Medium => 1.25,
        }
    }
}

/// Outcome of the post-hoc boost evaluation for one item.
#[derive(Debug, Clone, Copy)]
pub struct Boost {
    /// Multiplier applied after the weighted sum. 1.0 means no boost.
    pub multiplier: f64,
    /// Whether a critical-priority author matched; such items are
    /// floor-clamped to at least 0.95.
    pub critical: bool,
}

/// Curated roster of authors, institutions, and cross-domain keywords.
///
/// Matching is case-insensitive substring matching: author rosters are
/// keyed by full lowercase names, institutions and keywords matched
/// against title + body text.
#[derive(Debug, Clone)]
pub struct PriorityRoster {
    authors: HashMap<String, AuthorPriority>,
    institutions: HashSet<String>,
    adjacent_keywords: HashSet<String>,
}

impl Default for PriorityRoster {
    fn default() -> Self {
        let mut authors = HashMap::new();
        for name in ["michael levin", "beth barnes", "francois chollet"] {
            authors.insert(name.to_string(), AuthorPriority::Critical);
        }
        for name in [
            "dario amodei",
            "chris olah",
            "jan leike",
            "ilya sutskever",
            "andrej karpathy",
            "yann lecun",
            "demis hassabis",
            "jeff dean",
            "jason wei",
            "shunyu yao",
            "paul christiano",
            "stuart russell",
            "jared kaplan",
        ] {
            authors.insert(name.to_string(), AuthorPriority::High);
        }
        authors.insert("neel nanda".to_string(), AuthorPriority::Medium);

        let institutions = [
            "anthropic",
            "openai",
            "deepmind",
            "google deepmind",
            "meta ai",
            "metr",
            "alignment research center",
            "center for ai safety",
            "redwood research",
            "allen discovery center",
            "mit csail",
            "mila",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let adjacent_keywords = [
            "bioelectricity",
            "bioelectric",
            "morphogenesis",
            "collective intelligence",
            "xenobot",
            "regeneration",
            "developmental biology",
            "cellular automata",
            "self-organization",
            "emergence",
            "swarm intelligence",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            authors,
            institutions,
            adjacent_keywords,
        }
    }
}

impl PriorityRoster {
    /// An empty roster: no boosts ever apply.
    pub fn empty() -> Self {
        Self {
            authors: HashMap::new(),
            institutions: HashSet::new(),
            adjacent_keywords: HashSet::new(),
        }
    }

    /// Add or replace a curated author.
    pub fn add_author(&mut self, name: impl Into<String>, priority: AuthorPriority) {
        self.authors.insert(name.into().to_lowercase(), priority);
    }

    /// The highest priority among curated authors found in an author
    /// string.
    pub fn author_priority(&self, author_string: &str) -> Option<AuthorPriority> {
        let lower = author_string.to_lowercase();
        let mut best: Option<AuthorPriority> = None;
        for (name, priority) in &self.authors {
            if lower.contains(name.as_str()) {
                best = match (best, *priority) {
                    (None, p) => Some(p),
                    (Some(AuthorPriority::Critical), _) | (_, AuthorPriority::Critical) => {
                        Some(AuthorPriority::Critical)
                    }
                    (Some(AuthorPriority::High), _) | (_, AuthorPriority::High) => {
                        Some(AuthorPriority::High)
                    }
                    _ => Some(AuthorPriority::Medium),
                };
            }
        }
        best
    }

    /// Whether any curated institution is mentioned in the text.
    pub fn institution_match(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.institutions.iter().any(|i| lower.contains(i.as_str()))
    }

    /// Whether the text touches a curated cross-domain topic.
    pub fn adjacent_match(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.adjacent_keywords
            .iter()
            .any(|k| lower.contains(k.as_str()))
    }

    /// Evaluate the full boost for an item.
    pub fn evaluate(&self, item: &Item) -> Boost {
        let mut multiplier = 1.0;
        let mut critical = false;

        if let Some(priority) = item
            .author
            .as_deref()
            .and_then(|author| self.author_priority(author))
        {
            multiplier *= priority.multiplier();
            critical = priority == AuthorPriority::Critical;
        }

        let text = format!("{} {}", item.title, item.body());
        if self.institution_match(&text) {
            multiplier *= 1.2;
        }
        if self.adjacent_match(&text) {
            multiplier *= 1.3;
        }

        Boost {
            multiplier,
            critical,
        }
    }
}
