//! Relevant-info enhancement and placeholder repair
//!
//! Before generation the relevant info is extended with section-specific
//! instructions when content detectors fire. After generation, leftover
//! `[PENDING]` placeholders are filled from patterns found in the info.

use crate::completion::{completed_items, next_steps_block};
use once_cell::sync::Lazy;
use prd_state::SectionHistory;
use regex::Regex;

/// Marker of a field the model could not fill
pub const PENDING: &str = "[PENDING]";

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid detector regex")
}

static OVERVIEW_WORDS: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"(?i)\b(deliver|contact|stakeholder|department|team lead|analytics|business",
        r"|project name|project reference|goal|objectives)\b",
    ))
});
static EMAIL: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b"));
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| regex(r"\b\d+(\.\d+)?%"));
static METRIC_WORDS: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)\b(average|current|expected|increase|revenue|engagement|session)\b.*\b\d+\b")
});
static HTML_TAG: Lazy<Regex> = Lazy::new(|| regex(r"<[^>]+>"));
static CSS_BLOCK: Lazy<Regex> = Lazy::new(|| regex(r"\{[^}]*\}"));
static JS_FUNCTION: Lazy<Regex> = Lazy::new(|| regex(r"function\s+\w+\s*\([^)]*\)"));
static PROCESS_WORDS: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"(?i)\b(workflow|process flow|flowchart|decision point|process step",
        r"|mermaid|diagram|flow)\b",
    ))
});
static DATA_MODEL_WORDS: Lazy<Regex> = Lazy::new(|| {
    regex(concat!(
        r"(?i)\b(entity|attribute|relationship|schema|database|table|column|key|erd|mapping",
        r"|source system|target system|data flow|transformation)\b",
    ))
});

/// Mentions stakeholders, contacts, goals or an email address
#[must_use]
pub fn contains_overview_info(text: &str) -> bool {
    OVERVIEW_WORDS.is_match(text) || EMAIL.is_match(text)
}

/// Mentions percentages or quantified measures
#[must_use]
pub fn contains_metrics(text: &str) -> bool {
    PERCENTAGE.is_match(text) || METRIC_WORDS.is_match(text)
}

/// Contains HTML, CSS or JavaScript fragments
#[must_use]
pub fn contains_ui_components(text: &str) -> bool {
    HTML_TAG.is_match(text) || CSS_BLOCK.is_match(text) || JS_FUNCTION.is_match(text)
}

/// Mentions workflows or diagrams
#[must_use]
pub fn contains_process_info(text: &str) -> bool {
    PROCESS_WORDS.is_match(text)
}

/// Mentions entities, schemas or mappings
#[must_use]
pub fn contains_data_model_info(text: &str) -> bool {
    DATA_MODEL_WORDS.is_match(text)
}

/// Number of `[PENDING]` placeholders in `content`
#[must_use]
pub fn count_pending(content: &str) -> usize {
    content.matches(PENDING).count()
}

const OVERVIEW_HINT: &str = "\n\nCRITICAL: This message contains project overview information \
    that MUST be used to update any [PENDING] placeholders. Preserve exact names, titles, and \
    contact details as provided. Format exactly according to the template provided.";
const METRICS_HINT: &str = "\n\nCRITICAL: This message contains specific metrics that MUST be \
    precisely reflected in the metrics section. Use the exact numbers, percentages and timeframes \
    as provided. Format exactly according to the metrics template.";
const UI_HINT: &str = "\n\nCRITICAL: This message contains UI component code that MUST be \
    integrated into the prototype. Preserve exact HTML structure, CSS styles, and JavaScript \
    functionality. Ensure all components follow accessibility guidelines and dark theme \
    compatibility.";
const PROCESS_HINT: &str = "\n\nCRITICAL: This message contains business process information \
    that MUST be reflected in the Mermaid diagrams. Update or create diagrams for the workflows, \
    decision points, and process steps described, with valid syntax matching the written \
    descriptions. Use a separate diagram for each process.";
const DATA_MODEL_HINT: &str = "\n\nCRITICAL: This message contains data model information that \
    MUST be reflected in the ERD diagrams. Update or create diagrams for the entities, attributes, \
    and relationships described, with valid syntax matching the written description. Include \
    mapping diagrams and tables for any source-to-target mappings.";
const PENDING_HINT: &str = "\n\nHIGH PRIORITY: There are [PENDING] placeholders in the project \
    overview information that should be replaced with the specific details provided in this \
    message.";
const COMPLETED_NOTE: &str = "\n\nIMPORTANT: Remove these completed items from Next Steps and \
    their corresponding Examples:\n";

/// Extend `relevant_info` with instructions for `section_id`
#[must_use]
pub fn enhance_relevant_info(
    section_id: &str,
    relevant_info: &str,
    history: &SectionHistory,
) -> String {
    let mut enhanced = relevant_info.to_string();

    let hint = match section_id {
        "project-overview" if contains_overview_info(relevant_info) => Some(OVERVIEW_HINT),
        "problem-statement" if contains_metrics(relevant_info) => Some(METRICS_HINT),
        "prototype" if contains_ui_components(relevant_info) => Some(UI_HINT),
        "business-process" if contains_process_info(relevant_info) => Some(PROCESS_HINT),
        "data-model" if contains_data_model_info(relevant_info) => Some(DATA_MODEL_HINT),
        _ => None,
    };
    if let Some(hint) = hint {
        enhanced.push_str(hint);
    }

    let Some(last) = history.last_content.as_deref().filter(|c| !c.is_empty()) else {
        return enhanced;
    };

    let completed = completed_items(last);
    if !completed.is_empty() {
        enhanced.push_str(COMPLETED_NOTE);
        enhanced.push_str(&completed.join("\n"));
    }

    if section_id == "project-overview"
        && count_pending(last) > 0
        && contains_overview_info(relevant_info)
    {
        enhanced.push_str(PENDING_HINT);
    }
    enhanced
}

struct Substitution {
    trigger: Regex,
    capture: Regex,
    target: Regex,
    prefix: &'static str,
    render: fn(&regex::Captures<'_>) -> Option<String>,
}

fn first_group(caps: &regex::Captures<'_>) -> Option<String> {
    caps.get(1).map(|m| m.as_str().trim().to_string())
}

fn name_and_title(caps: &regex::Captures<'_>) -> Option<String> {
    let name = caps.get(1)?.as_str().trim();
    let title = caps.get(2)?.as_str().trim();
    Some(format!("{name} ({title})"))
}

fn labelled(key: &str, label: &'static str) -> Substitution {
    Substitution {
        trigger: regex(&format!("(?i){key}")),
        capture: regex(&format!(r"(?i){key}:?\s*([^\n.]+)")),
        target: regex(&format!("{label}: PENDING")),
        prefix: label,
        render: first_group,
    }
}

static SUBSTITUTIONS: Lazy<Vec<Substitution>> = Lazy::new(|| {
    vec![
        labelled("project name", "Project Name"),
        Substitution {
            trigger: regex(r"(?i)delivery:.*?\(.*?\)"),
            capture: regex(r"(?i)delivery:\s*([^(]+)\s*\(([^)]+)\)"),
            target: regex(r"• Delivery:\s*\[PENDING\]"),
            prefix: "• Delivery",
            render: name_and_title,
        },
        Substitution {
            trigger: regex(r"(?i)contact:.*?@"),
            capture: regex(r"(?i)contact:\s*([a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})"),
            target: regex(r"Contact:\s*\[PENDING\]"),
            prefix: "Contact",
            render: first_group,
        },
        labelled("metrics", "Metrics"),
        labelled("ui components", "UI Components"),
        labelled("business process", "Business Process"),
        labelled("data model", "Data Model"),
    ]
});

static DEPARTMENT_TRIGGER: Lazy<Regex> = Lazy::new(|| regex(r"(?i)department"));
static DEPARTMENT_AFTER: Lazy<Regex> = Lazy::new(|| regex(r"(?i)department:?\s*([^\n.]+)"));
static DEPARTMENT_BEFORE: Lazy<Regex> = Lazy::new(|| regex(r"(?i)([^\n.]+)\s*department"));
const DEPARTMENT_PLACEHOLDER: &str = "[Department/Organization: PENDING]";

/// Fill known placeholders in `content` from values stated in `relevant_info`
///
/// Each placeholder is replaced at most once.
#[must_use]
pub fn update_placeholders(content: &str, relevant_info: &str) -> String {
    let mut updated = content.to_string();

    for sub in SUBSTITUTIONS.iter() {
        if !sub.trigger.is_match(relevant_info) {
            continue;
        }
        let Some(value) = sub.capture.captures(relevant_info).and_then(|c| (sub.render)(&c)) else {
            continue;
        };
        let replacement = format!("{}: {value}", sub.prefix);
        updated = sub.target.replacen(&updated, 1, regex::NoExpand(&replacement)).into_owned();
    }

    if DEPARTMENT_TRIGGER.is_match(relevant_info) {
        let dept = DEPARTMENT_AFTER
            .captures(relevant_info)
            .or_else(|| DEPARTMENT_BEFORE.captures(relevant_info))
            .and_then(|c| first_group(&c));
        if let Some(dept) = dept {
            updated = updated.replacen(DEPARTMENT_PLACEHOLDER, &dept, 1);
        }
    }

    updated
}

/// Completed Next Steps items of `old` that still appear in `new`
#[must_use]
pub fn lingering_completed_items(old: &str, new: &str) -> Vec<String> {
    let Some(new_block) = next_steps_block(new) else {
        return Vec::new();
    };
    completed_items(old)
        .into_iter()
        .filter(|item| new_block.contains(item.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[test]
    fn detectors() {
        assert!(contains_overview_info("Our stakeholder is finance"));
        assert!(contains_overview_info("reach me at jane.doe@acme.io"));
        assert!(!contains_overview_info("we like bikes"));

        assert!(contains_metrics("Churn dropped 12.5% last year"));
        assert!(contains_metrics("Average session is 4 minutes"));
        assert!(!contains_metrics("sessions are long"));

        assert!(contains_ui_components("<button>Go</button>"));
        assert!(contains_ui_components(".btn { color: red }"));
        assert!(contains_ui_components("function submit(form) { }"));
        assert!(!contains_ui_components("a plain sentence"));

        assert!(contains_process_info("The approval workflow has two steps"));
        assert!(!contains_process_info("overflowing bins"));

        assert!(contains_data_model_info("Each Order entity has a customer key"));
        assert!(contains_data_model_info("Show the ERD"));
        assert!(!contains_data_model_info("keyboard layout"));
    }

    #[test]
    fn enhance_adds_section_hint_only_for_matching_section() {
        let history = SectionHistory::default();
        let info = "Checkout conversion is 3%";
        let enhanced = enhance_relevant_info("problem-statement", info, &history);
        assert!(enhanced.contains("specific metrics"));
        assert_eq!(enhance_relevant_info("scope", info, &history), info);
    }

    #[test]
    fn enhance_lists_completed_items_and_pending_note() {
        let last = "# Project Overview\nProject Name: [PENDING]\n\n\
                    📈 Next Steps:\n1. Add sponsor ✓\n2. Add contact";
        let history = SectionHistory::default().with_generated(last, Utc::now());

        let enhanced =
            enhance_relevant_info("project-overview", "The stakeholder is Dana", &history);
        assert!(enhanced.starts_with("The stakeholder is Dana\n\nCRITICAL:"));
        assert!(enhanced.contains(&format!("{COMPLETED_NOTE}1. Add sponsor ✓")));
        assert!(enhanced.ends_with(PENDING_HINT));
    }

    #[test]
    fn placeholders_are_filled_once() {
        let content = "Project Name: PENDING\n• Delivery: [PENDING]\nContact: [PENDING]\n\
                       [Department/Organization: PENDING]\nMetrics: PENDING\nMetrics: PENDING";
        let info = "Project name: Atlas. Delivery: Sam Lee (PM). Contact: sam@atlas.dev\n\
                    Department: Finance\nMetrics: 20% fewer tickets";

        let updated = update_placeholders(content, info);
        assert_eq!(
            updated,
            "Project Name: Atlas\n• Delivery: Sam Lee (PM)\nContact: sam@atlas.dev\nFinance\n\
             Metrics: 20% fewer tickets\nMetrics: PENDING"
        );
    }

    #[test]
    fn department_before_keyword() {
        let updated = update_placeholders(
            "[Department/Organization: PENDING]",
            "Owned by the Logistics department",
        );
        assert_eq!(updated, "Owned by the Logistics");
    }

    #[test]
    fn lingering_items_are_reported() {
        let old = "📈 Next Steps:\n1. Add sponsor ✓\n2. Add contact";
        let kept = "📈 Next Steps:\n1. Add sponsor ✓\n2. Add contact";
        let cleaned = "📈 Next Steps:\n1. Add contact";
        assert_eq!(lingering_completed_items(old, kept), vec!["1. Add sponsor ✓"]);
        assert!(lingering_completed_items(old, cleaned).is_empty());
    }
}
