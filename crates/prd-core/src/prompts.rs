//! System prompts of the pipeline agents

use prd_state::{SectionHistory, SectionTemplate};

/// Classifier prompt deciding whether a message should update the document
pub const ROUTER_PROMPT: &str = r#"
## Role
You classify whether the latest message carries content that should update a Product
Requirements Document (PRD).

## Update the PRD when the message:
- states a requirement, goal, metric, contact, date, budget or scope decision
- asks to add, change or remove something in the document
- confirms a change the assistant proposed ("Yes, go ahead", "Yes, please remove it")

## Do not update the PRD when the message:
- asks for an explanation, an example or advice ("What are typical metrics for this?")
- discusses ideas without committing to them ("Do you think we should include mobile support?")
- answers a process question ("I want to start by describing a prototype")

Return a JSON object and nothing else:
{
  "is_prd_section_related": boolean
}
"#;

/// Rolling per-section summary prompt
pub const SECTION_SUMMARY_PROMPT: &str = r"
You summarize conversation messages for one section of a product document.
1. Keep the context that matters to this section
2. Keep technical details verbatim
3. When a previous summary is given, merge it with the new message and favour the new information
4. Be concise
5. Answer in this layout:
  [summarized previous context if any]
  Latest update: [key points from current message]
";

/// Marker every per-section summary carries
pub const LATEST_UPDATE_MARKER: &str = "Latest update:";

/// Prompt summarizing a stretch of chat history; `{chat_history}` is replaced
pub const CONVERSATION_SUMMARY_PROMPT: &str = r"
# Task
Summarize the recent chat history between a 'user' and an 'assistant' so the conversation
about a Product Requirements Document (PRD) can continue.

# Rules
1. Stay brief, ideally under 700 words.
2. Keep questions, answers, decisions and disagreements.
3. Skip greetings and filler.
4. Favour requirements, features, goals, user needs and scope.
5. Output the summary text only.

--- CONTEXT START ---
## Recent Chat History:
{chat_history}

--- CONTEXT END ---

# Concise Summary:
";

/// Prompt folding the latest exchange into the running summary
pub const UPDATED_SUMMARY_PROMPT: &str = r"
# Task
Update an existing conversation summary with the latest exchange between a 'user' and an
'assistant'.

# Rules
1. Merge the new points into the previous summary.
2. Stay brief, ideally under 500 words, and drop repetition.
3. Favour information relevant to the Product Requirements Document (PRD).
4. Keep specific agreements and technical details.
5. Output the summary text only.

--- CONTEXT START ---

## Previous Summary:
{previous_summary}

## Latest User Message:
{user_message}

## Latest Assistant Response:
{assistant_response}

--- CONTEXT END ---

# Updated Concise Summary:
";

/// Prompt of the conversational agent
#[must_use]
pub fn conversation_prompt(
    formatted_messages: &str,
    document_context: &str,
    chat_summary: &str,
    update_summary: &str,
) -> String {
    let updates = if update_summary.is_empty() {
        String::new()
    } else {
        format!("Recent Updates:\n{update_summary}\n\n")
    };
    let summary = if chat_summary.is_empty() {
        String::new()
    } else {
        format!("Conversation context: {chat_summary}")
    };

    format!(
        r#"
## Role
You guide a user through writing a Product Requirements Document (PRD). Other agents write
the document; you talk with the user, answer questions and steer the conversation toward the
information the document still lacks.

## Rules
1. Be conversational and concise, aiming for under 150 words.
2. Do not write document content yourself.
3. Use the current document to avoid asking for what is already captured; its
   "⭐ Provided Information Rating" and "📈 Next Steps" lines show what is missing.
4. When sections were just updated, mention which ones briefly.
5. When the user wants to move on, pick the next incomplete section from the document.
6. Remind the user now and then that they can paste or upload material in any format.

## When the document is empty
Ask whether the user wants to start with a prototype description or with a business process
that needs improvement. Then explore the ideal future state first, the current state second,
and the gap between them.

## Reply layout
1. One sentence acknowledging the input or the updates.
2. The direct answer.
3. An open question with two or three concrete examples to help the user answer.

--- CONTEXT START ---

## CURRENT PRD DOCUMENT:
{document_context}

## RECENT PRD UPDATES:
{updates}

## CONVERSATION SUMMARY:
{summary}

## RECENT MESSAGES:
{formatted_messages}

--- CONTEXT END ---
"#
    )
}

/// Prompt generating one section from its template and history
#[must_use]
pub fn section_prompt(template: &SectionTemplate, history: &SectionHistory) -> String {
    let title = &template.title;
    let last_content = history.last_content_or_empty();
    let mut notes = String::new();
    if !history.chat_summary.is_empty() {
        let summary = &history.chat_summary;
        notes.push_str(&format!("\n   Conversation notes for this section:\n   {summary}\n"));
    }
    if !history.last_relevant_info.is_empty() {
        let info = &history.last_relevant_info;
        notes.push_str(&format!("\n   Information used last time:\n   {info}\n"));
    }
    let expected = template
        .expected_content
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n   ");
    let criteria = template
        .rating_criteria
        .iter()
        .map(|item| format!("- Check for {item}"))
        .collect::<Vec<_>>()
        .join("\n     ");
    let custom = template.custom_formatting.as_deref().unwrap_or_default();

    format!(
        r#"
Generate content for the {title} section. Follow these rules strictly:
1. Start with exactly this heading: # {title}
2. Use no other headings, not even lower level ones.
3. Return plain markdown, not wrapped in a code block.

4. Previous content:
```markdown
{last_content}
```
{notes}
5. Update rules:
   - Copy URLs exactly as given, with markdown link formatting
   - When the user says "no [something]", show "[Something]: N/A"
   - Keep previously captured information unless it is explicitly replaced
   - When a task is completed (marked with ✓), REMOVE it from Next Steps

6. {overview}
   Include these details:
   {expected}

7. Layout of the # {title} section:
   - One main point per paragraph
   - Bullet points for lists
   - Metrics and numbers on separate lines
   - ⭐ Provided Information Rating and 📈 Next Steps are plain text, never bold or headings

   {custom}

   ⭐ Provided Information Rating: [Score]/★★★★★
   [Short explanation of completeness. Also:
     {criteria}]

   📈 Next Steps:
   [For each missing item:
     - Mark with "✓" when the new information satisfies it
     - Otherwise keep it in the same order
     - Remove completed items and renumber from 1
     - Never re-add a removed item]

8. Rating scale:
    ★☆☆☆☆: Information missing or lacks basic details
    ★★☆☆☆: Basic information provided but missing specific details
    ★★★☆☆: Good detail level but missing some important elements
    ★★★★☆: Comprehensive with most details, needs minor additions
    ★★★★★: All Next Steps completed and removed, or none listed
    The rating MUST increase when Next Steps are completed.

9. Next steps are specific and actionable, derived from the missing rating requirements, most
   important first.

10. Mark blank fields with "[PENDING]" only, never variants like "[PENDING Email]".
11. Removing completed items is mandatory.
"#,
        overview = template.overview,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use prd_state::SectionCatalog;

    #[test]
    fn section_prompt_embeds_template() {
        let catalog = SectionCatalog::prd_default();
        let template = &catalog.get("scope").unwrap().template;
        let mut history = SectionHistory::default()
            .with_generated("# Scope of the Project\nold", chrono::Utc::now());
        history.chat_summary = "Latest update: billing only".into();
        let prompt = section_prompt(template, &history);
        assert!(prompt.contains("# Scope of the Project"));
        assert!(prompt.contains("old\n```"));
        assert!(prompt.contains("Latest update: billing only"));
        assert!(!prompt.contains("Information used last time"));
        for item in &template.expected_content {
            assert!(prompt.contains(&format!("- {item}")));
        }
    }

    #[test]
    fn conversation_prompt_omits_empty_blocks() {
        let prompt = conversation_prompt("No recent messages.", "doc", "", "");
        assert!(!prompt.contains("Recent Updates:"));
        assert!(!prompt.contains("Conversation context:"));

        let prompt = conversation_prompt("x", "doc", "talked about bikes", "Sections updated");
        assert!(prompt.contains("Recent Updates:\nSections updated"));
        assert!(prompt.contains("Conversation context: talked about bikes"));
    }
}
