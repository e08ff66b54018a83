use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    Ransomware,
    Keylogger,
    RemoteAccess,
    CommandControl,
    Phishing,
    Exploit,
}

impl CategoryId {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Ransomware => "ransomware",
            CategoryId::Keylogger => "keylogger",
            CategoryId::RemoteAccess => "remote_access",
            CategoryId::CommandControl => "command_control",
            CategoryId::Phishing => "phishing",
            CategoryId::Exploit => "exploit",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryContext {
    pub display_name: String,
    pub description: String,
    pub examples: Vec<String>,
}

impl CategoryContext {
    fn new(display_name: &str, description: &str, examples: &[&str]) -> Self {
        Self {
            display_name: display_name.to_string(),
            description: description.to_string(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Context table
// ---------------------------------------------------------------------------

/// Read-only context keyed by category.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: HashMap<CategoryId, CategoryContext>,
}

impl CategoryTable {
    pub fn new(entries: impl IntoIterator<Item = (CategoryId, CategoryContext)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&CategoryContext> {
        self.entries.get(&id)
    }

    pub fn standard() -> Self {
        Self::new([
            (
                CategoryId::Ransomware,
                CategoryContext::new(
                    "Ransomware defense",
                    "File-encrypting extortion software: detection, backup strategy and recovery planning.",
                    &["recovery runbook", "backup integrity checks"],
                ),
            ),
            (
                CategoryId::Keylogger,
                CategoryContext::new(
                    "Keylogger detection",
                    "Keystroke-capture software: indicators of compromise and endpoint controls.",
                    &["endpoint detection rules", "hardening checklist"],
                ),
            ),
            (
                CategoryId::RemoteAccess,
                CategoryContext::new(
                    "Remote access control",
                    "Remote administration tools and unauthorized access: inventory, monitoring and containment.",
                    &["access review", "containment procedure"],
                ),
            ),
            (
                CategoryId::CommandControl,
                CategoryContext::new(
                    "Command-and-control monitoring",
                    "Attacker-operated infrastructure: network telemetry, blocking and triage.",
                    &["egress filtering policy", "triage notes"],
                ),
            ),
            (
                CategoryId::Phishing,
                CategoryContext::new(
                    "Phishing awareness",
                    "Deceptive messages: reporting procedures, training material and mail filtering.",
                    &["staff training module", "reporting workflow"],
                ),
            ),
            (
                CategoryId::Exploit,
                CategoryContext::new(
                    "Vulnerability management",
                    "Software flaws: disclosure, patching and mitigation guidance.",
                    &["advisory", "patch rollout plan"],
                ),
            ),
        ])
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Ordered keyword routing; first matching rule wins.
#[derive(Debug, Clone)]
pub struct CategorySelector {
    rules: Vec<(Vec<String>, CategoryId)>,
    fallback: CategoryId,
}

impl CategorySelector {
    pub fn new(fallback: CategoryId) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn rule(mut self, keywords: &[&str], category: CategoryId) -> Self {
        let keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.rules.push((keywords, category));
        self
    }

    pub fn standard() -> Self {
        Self::new(CategoryId::Exploit)
            .rule(&["ransom", "encrypt"], CategoryId::Ransomware)
            .rule(&["keylog"], CategoryId::Keylogger)
            .rule(&["rat ", "remote access", "backdoor"], CategoryId::RemoteAccess)
            .rule(&["c2", "command and control"], CategoryId::CommandControl)
            .rule(&["phish"], CategoryId::Phishing)
    }

    pub fn select(&self, text: &str) -> CategoryId {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(_, category)| *category)
            .unwrap_or(self.fallback)
    }
}

impl Default for CategorySelector {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Selector plus the context table it indexes into.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub selector: CategorySelector,
    pub table: CategoryTable,
}

impl Catalog {
    pub fn context_for(&self, text: &str) -> (CategoryId, Option<&CategoryContext>) {
        let id = self.selector.select(text);
        (id, self.table.get(id))
    }
}
