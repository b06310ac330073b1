use serde::{Deserialize, Serialize};

/// Which definition is appended to a label before embedding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionSource {
    /// Definition derived from the item's note.
    Note,
    /// Definition looked up on Wikipedia.
    Wiki,
    /// Definition written by a language model.
    Llm,
    /// No definition.
    #[default]
    None,
}

/// Candidate definitions for a label, one per source. Missing ones read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definitions {
    /// From the note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// From Wikipedia.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki: Option<String>,
    /// From a language model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
}

impl Definitions {
    /// The definition for `source`, or `""`.
    pub fn get(&self, source: DefinitionSource) -> &str {
        let def = match source {
            DefinitionSource::Note => self.note.as_deref(),
            DefinitionSource::Wiki => self.wiki.as_deref(),
            DefinitionSource::Llm => self.llm.as_deref(),
            DefinitionSource::None => None,
        };
        def.unwrap_or("")
    }
}

/// One input row: a leaf label, the note it came from, and its definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledItem {
    /// Leaf-level category text.
    pub label: String,
    /// Free text the label was derived from.
    pub note: String,
    /// Candidate definitions.
    #[serde(default)]
    pub definitions: Definitions,
}

impl LabeledItem {
    /// Item with a normalized label and no definitions.
    pub fn new(label: &str, note: impl Into<String>) -> Self {
        Self {
            label: normalize_label(label),
            note: note.into(),
            definitions: Definitions::default(),
        }
    }

    /// Set the definition for one source.
    pub fn with_definition(
        mut self,
        source: DefinitionSource,
        definition: impl Into<String>,
    ) -> Self {
        let slot = match source {
            DefinitionSource::Note => &mut self.definitions.note,
            DefinitionSource::Wiki => &mut self.definitions.wiki,
            DefinitionSource::Llm => &mut self.definitions.llm,
            DefinitionSource::None => return self,
        };
        *slot = Some(definition.into());
        self
    }

    /// One item per `;`-separated sub-label of `labels`, sharing `note` and `definitions`.
    ///
    /// Sub-labels are normalized; empty ones are dropped.
    pub fn explode(labels: &str, note: &str, definitions: &Definitions) -> Vec<Self> {
        labels
            .split(';')
            .map(normalize_label)
            .filter(|l| !l.is_empty())
            .map(|label| Self {
                label,
                note: note.to_string(),
                definitions: definitions.clone(),
            })
            .collect()
    }

    /// The text that gets embedded: `template + " " + label + ". " + definition`, trimmed.
    pub fn augmented_label(&self, template: &str, source: DefinitionSource) -> String {
        format!(
            "{} {}. {}",
            template,
            self.label,
            self.definitions.get(source)
        )
        .trim()
        .to_string()
    }
}

/// Collapse whitespace, turn `?` and line breaks into spaces, trim.
pub fn normalize_label(label: &str) -> String {
    label
        .replace('?', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
