//! Entity and summary data model.
//!
//! An [`EntitySummary`] is the schema-shaped description of one discovered
//! software entity. Summaries live in a [`SummaryMap`] keyed by entity name,
//! the single shared namespace that validation, naming correction, and graph
//! analysis read and write.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named software construct discovered from documentation.
///
/// Entities are value-like; they are never mutated, only replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name, possibly path-like (e.g. `"auth/login"`).
    pub name: String,
    /// Entity type as reported by discovery (e.g. `"Service"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the module the entity belongs to, when known.
    #[serde(default)]
    pub parent: Option<String>,
}

impl Entity {
    /// Returns the composite identity key `name|type|parent`.
    ///
    /// An absent parent contributes the empty string. The key is exact and
    /// order-sensitive; it deduplicates discovery output and guards the
    /// refinement visited set.
    #[must_use]
    pub fn composite_key(&self) -> String {
        format!("{}|{}|{}", self.name, self.kind, self.parent.as_deref().unwrap_or(""))
    }
}

/// Confidence tier derived from the weighted-signal score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// High confidence; fully accepted.
    Verified,
    /// Medium confidence; inferred but plausible.
    Inferred,
    /// Low confidence; needs manual verification.
    NeedsVerification,
    /// Below the minimum trust threshold; presumed fabricated.
    Hallucination,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Verified => "verified",
            Self::Inferred => "inferred",
            Self::NeedsVerification => "needs_verification",
            Self::Hallucination => "hallucination",
        };
        f.write_str(s)
    }
}

/// A backend name collection that model output renders either as a JSON
/// array of names or as an object keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameColl {
    /// Array form: `["AuthService", ...]`.
    List(Vec<String>),
    /// Object form: `{"AuthService": {...}, ...}`.
    Map(BTreeMap<String, serde_json::Value>),
}

impl NameColl {
    /// Returns the names in this collection in document order (array form)
    /// or key order (object form).
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::List(items) => items.iter().map(String::as_str).collect(),
            Self::Map(items) => items.keys().map(String::as_str).collect(),
        }
    }

    /// Returns `true` if the collection contains the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::List(items) => items.iter().any(|n| n == name),
            Self::Map(items) => items.contains_key(name),
        }
    }
}

impl Default for NameColl {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// Frontend portion of an entity summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontend {
    /// File paths or page routes.
    pub pages: Vec<String>,
    /// Reusable UI component names.
    pub components: Vec<String>,
    /// Query or custom API hook names.
    #[serde(rename = "apiHooks")]
    pub api_hooks: Vec<String>,
    /// User-facing route paths.
    pub routes: Vec<String>,
}

/// Backend portion of an entity summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Backend {
    /// Controller names.
    pub controllers: NameColl,
    /// Service class names.
    pub services: NameColl,
    /// Data-access layer names.
    pub repositories: NameColl,
    /// DTO definitions keyed by DTO name.
    pub dtos: BTreeMap<String, serde_json::Value>,
    /// API endpoint descriptions (method, route, input, output).
    pub api: Vec<serde_json::Value>,
}

/// Events emitted and listened to by an entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Events {
    /// Emitted event names.
    pub emit: Vec<String>,
    /// Listened event names.
    pub listen: Vec<String>,
}

/// Test artifacts associated with an entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPlan {
    /// Unit test file names.
    pub unit: Vec<String>,
    /// End-to-end test script names.
    pub e2e: Vec<String>,
}

/// A dependency whose existence could not be fully confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyAssessment {
    /// The dependency name as declared.
    pub name: String,
    /// The confidence score the dependency received.
    pub confidence: f64,
    /// The contributing-signal reasons behind the score.
    pub reasons: Vec<String>,
}

/// Validation metadata attached to a summary by the confidence validator
/// and naming corrector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Validation {
    /// Weighted-signal confidence score in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Tier derived from the score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
    /// Whether the name fails every recognized naming convention.
    pub naming_issue: bool,
    /// Candidate replacement names, best guess first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub naming_suggestions: Vec<String>,
    /// Dependencies kept out of the main list pending verification.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncertain_dependencies: Vec<DependencyAssessment>,
    /// Dependencies dropped as untrustworthy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_dependencies: Vec<DependencyAssessment>,
    /// Most relevant source paragraphs supporting this entity.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub documentation_evidence: Vec<String>,
    /// Dependency names stripped because their target was removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_dependencies: Vec<String>,
}

/// Schema-shaped summary of one entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySummary {
    /// The unique module name.
    pub module: String,
    /// Short description of the entity's purpose.
    pub description: String,
    /// Frontend surface.
    pub frontend: Frontend,
    /// Backend surface.
    pub backend: Backend,
    /// Names of other entities this one depends on.
    pub dependencies: Vec<String>,
    /// Emitted and listened events.
    pub events: Events,
    /// Associated test artifacts.
    pub test: TestPlan,
    /// Name of the entity this summary describes. Stamped at persistence
    /// time; directory names are sanitized, so reloads recover the
    /// original, possibly path-like name from here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    /// Validation metadata, present once the validator has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Original name, when this summary was renamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// Names merged into this summary by the naming corrector.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<String>,
}

impl EntitySummary {
    /// Builds the deterministic fallback skeleton for an entity.
    ///
    /// `module` is the first path segment of the entity name and
    /// `description` is synthesized as `"{type} for {name}"`. All containers
    /// are empty but structurally valid.
    #[must_use]
    pub fn skeleton(entity: &Entity) -> Self {
        let module = entity.name.split('/').next().unwrap_or(&entity.name).to_string();
        Self {
            module,
            description: format!("{} for {}", entity.kind, entity.name),
            ..Self::default()
        }
    }

    /// Returns the validation block, creating an empty one if absent.
    pub fn validation_mut(&mut self) -> &mut Validation {
        self.validation.get_or_insert_with(Validation::default)
    }
}

/// The shared, mutable namespace of all summaries, keyed by entity name.
pub type SummaryMap = BTreeMap<String, EntitySummary>;

/// Human-readable schema description embedded into summarization prompts.
pub const SCHEMA_HINT: &str = r#"{
  "module": "string - the unique name of the module",
  "description": "string - short summary of the module purpose",
  "frontend": {
    "pages": ["string - file path or page route"],
    "components": ["string - reusable UI components"],
    "apiHooks": ["string - query or custom API hooks"],
    "routes": ["string - user-facing route paths"]
  },
  "backend": {
    "controllers": ["string - controller names"],
    "services": ["string - service class names"],
    "repositories": ["string - DB abstraction layer names"],
    "dtos": { "DtoName": { "fields": ["string - field names"] } },
    "api": [
      {
        "method": "string - HTTP verb",
        "route": "string - backend route",
        "input": "string - DTO name",
        "output": "string - response structure or DTO"
      }
    ]
  },
  "dependencies": ["string - other module names"],
  "events": {
    "emit": ["string - emitted event names"],
    "listen": ["string - listened event names"]
  },
  "test": {
    "unit": ["string - unit test file names"],
    "e2e": ["string - e2e test script names"]
  }
}"#;
