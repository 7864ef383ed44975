//! Prompt text sent to the model
//!
//! Holds the tutor persona instruction, the title-summary template, and the
//! quick-start prompts offered on the welcome screen.

/// Default system instruction for the C tutor persona
pub const C_TUTOR_SYSTEM_INSTRUCTION: &str = "\
You are an expert C programming language tutor and mentor. Draw on K&R, \
K.N. King's \"C Programming: A Modern Approach\", \"Expert C Programming\", \
\"C: A Reference Manual\", APUE, \"21st Century C\", \"Pointers on C\" and \
\"Understanding and Using C Pointers\", and on every C standard from K&R C \
through C23.

For every topic explain the syntax, what happens during preprocessing, \
compilation, linking and execution, why the feature exists, complete \
commented example programs, common pitfalls and undefined behavior, memory \
and performance details, the standard that introduced it, and related \
concepts to study next.

When asked for practice questions, present all questions grouped by \
difficulty first (Beginner, Medium, Hard, Advanced), then a '---' separator, \
then detailed answers.

Always format with markdown, and always put C code in ```c fenced blocks.";

/// Placeholder title given to a session until a summary arrives
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// Quick-start prompts shown on the welcome screen
pub const QUICK_START_PROMPTS: [&str; 4] = [
    "Explain how pointers work",
    "Give me practice questions on structs",
    "Explain the C compilation process",
    "What's new in C23?",
];

/// Build the one-shot prompt asking for a short session title
///
/// The model reply is quoted only up to `excerpt_chars` characters.
///
/// # Examples
///
/// ```
/// use ctutor::prompts::build_title_prompt;
///
/// let prompt = build_title_prompt("What is malloc?", "malloc allocates", 200);
/// assert!(prompt.contains("User: \"What is malloc?\""));
/// assert!(prompt.ends_with("Title:"));
/// ```
pub fn build_title_prompt(user_text: &str, model_text: &str, excerpt_chars: usize) -> String {
    let excerpt: String = model_text.chars().take(excerpt_chars).collect();
    format!(
        "Based on the following user query and AI response, generate a short, descriptive \
title for this chat session (max 5 words).\n\
User: \"{}\"\n\
AI Response: \"{}...\"\n\
Title:",
        user_text, excerpt
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_prompt_truncates_model_text() {
        let model_text = "x".repeat(500);
        let prompt = build_title_prompt("q", &model_text, 200);
        assert!(prompt.contains(&format!("\"{}...\"", "x".repeat(200))));
        assert!(!prompt.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_title_prompt_truncates_on_char_boundary() {
        let prompt = build_title_prompt("q", "ééé", 2);
        assert!(prompt.contains("\"éé...\""));
    }

    #[test]
    fn test_system_instruction_asks_for_c_fences() {
        assert!(C_TUTOR_SYSTEM_INSTRUCTION.contains("```c"));
    }

    #[test]
    fn test_quick_start_prompts_are_distinct() {
        let mut prompts = QUICK_START_PROMPTS.to_vec();
        prompts.dedup();
        assert_eq!(prompts.len(), 4);
    }
}
