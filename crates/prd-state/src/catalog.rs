//! Section catalog
//!
//! The fixed, ordered set of sections a document is made of. Every entry
//! carries:
//! - the template the generator follows (overview, expected content, rating criteria)
//! - keyword triggers deciding when a message concerns the section
//! - phrases that signal the user wants to move to the section

use crate::error::StateError;
use crate::section::{Section, SectionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Body line of a section that has never been generated
pub const INITIAL_PLACEHOLDER: &str = "This section will be populated as you provide information.";

/// Generation template for one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTemplate {
    /// Title used as the single top-level heading
    pub title: String,
    /// One-sentence purpose of the section
    pub overview: String,
    /// Details the section is expected to contain
    pub expected_content: Vec<String>,
    /// Criteria the star rating is judged against
    pub rating_criteria: Vec<String>,
    /// Extra layout instructions appended to the prompt
    #[serde(default)]
    pub custom_formatting: Option<String>,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Section identity
    pub id: SectionId,
    /// Generation template
    pub template: SectionTemplate,
    /// Lowercase keywords; any hit means the section should update
    #[serde(default)]
    pub update_triggers: Vec<String>,
    /// Lowercase phrases requesting a move to this section
    #[serde(default)]
    pub transition_phrases: Vec<String>,
}

impl SectionSpec {
    /// Section title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.template.title
    }

    /// Content of the section before anything was generated
    #[must_use]
    pub fn initial_content(&self) -> String {
        format!("# {}\n{INITIAL_PLACEHOLDER}", self.template.title)
    }

    /// Whether `text` mentions anything this section tracks
    #[must_use]
    pub fn should_update_when(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.update_triggers.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Whether `text` asks to move to this section
    #[must_use]
    pub fn is_transition_request(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.transition_phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

/// Ordered, duplicate-free set of sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SectionSpec>", into = "Vec<SectionSpec>")]
pub struct SectionCatalog {
    entries: Vec<SectionSpec>,
}

impl SectionCatalog {
    /// Build a catalog, rejecting empty or duplicated id sets
    ///
    /// # Errors
    /// [`StateError::EmptyCatalog`] or [`StateError::DuplicateSection`].
    pub fn new(entries: Vec<SectionSpec>) -> Result<Self, StateError> {
        if entries.is_empty() {
            return Err(StateError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.clone()) {
                return Err(StateError::DuplicateSection(entry.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// All entries in document order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[SectionSpec] {
        &self.entries
    }

    /// Section ids in document order
    pub fn ids(&self) -> impl Iterator<Item = &SectionId> + '_ {
        self.entries.iter().map(|e| &e.id)
    }

    /// Number of sections
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed catalog
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SectionSpec> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    /// Position of a section in document order
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id.as_str() == id)
    }

    /// Title for `id`, falling back to the raw id
    #[must_use]
    pub fn title_or_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, SectionSpec::title)
    }

    /// Fresh sections, each holding its placeholder content
    #[must_use]
    pub fn initial_sections(&self) -> Vec<Section> {
        self.entries
            .iter()
            .map(|e| Section::new(e.id.clone(), e.title(), e.initial_content()))
            .collect()
    }

    /// The default product requirements document layout
    #[must_use]
    pub fn prd_default() -> Self {
        Self {
            entries: vec![
                spec(
                    "project-overview",
                    "Project Overview",
                    "Provides a high-level description of the project, stakeholders, \
                     and objectives.",
                    &["Project Name", "Stakeholders", "Goals", "References"],
                    &["Contact details", "Measurable objectives", "Timeline", "Budget"],
                    &[
                        "project", "stakeholder", "goal", "objective", "sponsor", "contact",
                        "department", "team lead", "delivery", "@",
                    ],
                    &[
                        "start with project overview",
                        "begin with overview",
                        "let's talk about project overview",
                    ],
                ),
                spec(
                    "problem-statement",
                    "Problem Statement",
                    "Describes the business problem being solved and expected outcomes.",
                    &["Current State", "Challenges", "Desired State", "Business Impact"],
                    &["Quantifiable metrics", "Clear impact", "Timeline dependencies"],
                    &[
                        "problem", "challenge", "pain point", "current state", "outcome",
                        "impact", "metric", "revenue", "engagement", "%",
                    ],
                    &[
                        "move to problem statement",
                        "let's discuss the problem",
                        "tell me about the problem statement",
                    ],
                ),
                spec(
                    "scope",
                    "Scope of the Project",
                    "Defines what is included and excluded from the project.",
                    &["In-Scope", "Out-of-Scope", "Constraints", "Assumptions"],
                    &["Clear boundaries", "Specific inclusions/exclusions", "Constraints"],
                    &[
                        "scope", "include", "exclude", "constraint", "assumption", "limitation",
                        "phase", "timeline", "team size", "integration",
                    ],
                    &[
                        "let's talk about scope",
                        "define the scope",
                        "move to scope section",
                        "what's in scope",
                    ],
                ),
                spec(
                    "user-stories",
                    "User Stories",
                    "Outlines the user stories that capture required functionality.",
                    &["Actor", "Action", "Benefit", "Acceptance Criteria"],
                    &["User role clarity", "Specific actions", "Clear benefits"],
                    &[
                        "user story", "user stories", "as a ", "i want", "so that",
                        "acceptance criteria", "user role",
                    ],
                    &[
                        "let's discuss user stories",
                        "talk about user stories",
                        "what are the user stories",
                    ],
                ),
                spec(
                    "use-cases",
                    "Use Cases",
                    "Detailed scenarios showing how users interact with the system.",
                    &["Actor", "Preconditions", "Flow", "Postconditions"],
                    &["Complete flows", "Error cases", "Alternate paths"],
                    &[
                        "use case", "scenario", "precondition", "postcondition", "step",
                        "interaction",
                    ],
                    &[
                        "move to use cases",
                        "what are the use cases",
                        "let's talk about use cases",
                    ],
                ),
                spec(
                    "business-process",
                    "Business Processes",
                    "Documents the business processes, workflows, and organizational activities \
                     involved in the system.",
                    &[
                        "Process Diagrams",
                        "Process Descriptions",
                        "Integration Points",
                        "Process Metrics",
                    ],
                    &[
                        "Process clarity",
                        "Decision points",
                        "Exception handling",
                        "Process ownership",
                    ],
                    &[
                        "business process", "workflow", "process flow", "flowchart",
                        "decision point", "approval",
                    ],
                    &[
                        "let's discuss business processes",
                        "talk about the workflows",
                        "show me the process flows",
                        "create flowcharts",
                        "describe the business processes",
                    ],
                ),
                spec(
                    "data-model",
                    "Data Model",
                    "Entity relationship diagrams and data mappings between source and target \
                     systems.",
                    &["Entities", "Attributes", "Relationships", "Source-to-Target Mappings"],
                    &["Entity completeness", "Relationship cardinality", "Data sources"],
                    &[
                        "data model", "entity", "entities", "attribute", "relationship", "schema",
                        "database", "erd", "source system", "target system", "dashboard", "report",
                    ],
                    &[
                        "let's discuss data model",
                        "talk about the entities",
                        "show me the erd",
                        "create a data model",
                        "describe the database schema",
                        "map the data sources",
                    ],
                ),
                spec(
                    "prototype",
                    "Prototype",
                    "Interactive prototype demonstrating key user interfaces and interactions.",
                    &["HTML Structure", "CSS Styling", "Interactive Features", "Design Analysis"],
                    &["Semantic HTML", "Accessibility", "Dark Theme", "Responsive Design"],
                    &[
                        "prototype", "ui", "screen", "interface", "design", "layout", "button",
                        "mockup",
                    ],
                    &[
                        "let's see the prototype",
                        "show me the prototype",
                        "move to prototype",
                        "discuss the interface",
                        "talk about the design",
                    ],
                ),
            ],
        }
    }
}

impl Default for SectionCatalog {
    fn default() -> Self {
        Self::prd_default()
    }
}

impl TryFrom<Vec<SectionSpec>> for SectionCatalog {
    type Error = StateError;

    fn try_from(entries: Vec<SectionSpec>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<SectionCatalog> for Vec<SectionSpec> {
    fn from(catalog: SectionCatalog) -> Self {
        catalog.entries
    }
}

fn spec(
    id: &str,
    title: &str,
    overview: &str,
    expected: &[&str],
    criteria: &[&str],
    triggers: &[&str],
    transitions: &[&str],
) -> SectionSpec {
    let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    SectionSpec {
        id: SectionId::new(id),
        template: SectionTemplate {
            title: title.to_string(),
            overview: overview.to_string(),
            expected_content: owned(expected),
            rating_criteria: owned(criteria),
            custom_formatting: None,
        },
        update_triggers: owned(triggers),
        transition_phrases: owned(transitions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_and_titles() {
        let catalog = SectionCatalog::prd_default();
        let ids: Vec<&str> = catalog.ids().map(SectionId::as_str).collect();
        assert_eq!(
            ids,
            vec![
                "project-overview",
                "problem-statement",
                "scope",
                "user-stories",
                "use-cases",
                "business-process",
                "data-model",
                "prototype",
            ]
        );
        assert_eq!(catalog.title_or_id("scope"), "Scope of the Project");
        assert_eq!(catalog.title_or_id("unknown"), "unknown");
    }

    #[test]
    fn initial_content_is_heading_plus_placeholder() {
        let catalog = SectionCatalog::prd_default();
        let sections = catalog.initial_sections();
        assert_eq!(sections.len(), 8);
        assert_eq!(
            sections[1].content,
            "# Problem Statement\nThis section will be populated as you provide information."
        );
        assert!(sections.iter().all(Section::is_placeholder));
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        let mut entries = SectionCatalog::prd_default().entries().to_vec();
        entries.push(entries[0].clone());
        assert!(matches!(
            SectionCatalog::new(entries),
            Err(StateError::DuplicateSection(id)) if id.as_str() == "project-overview"
        ));
        assert!(matches!(SectionCatalog::new(Vec::new()), Err(StateError::EmptyCatalog)));
    }

    #[test]
    fn triggers_and_transitions_ignore_case() {
        let catalog = SectionCatalog::prd_default();
        let scope = catalog.get("scope").unwrap();
        assert!(scope.should_update_when("Mobile is OUT OF SCOPE for phase one"));
        assert!(scope.is_transition_request("OK, let's talk about scope now"));

        let data_model = catalog.get("data-model").unwrap();
        assert!(data_model.is_transition_request("Show me the ERD please"));
    }
}
