//! The fixed summarization instruction.
//!
//! Kept in one place so tests can assert on it without a live model.
//! Callers can override it via [`crate::config::SummaryConfig::instruction`].

/// Instruction sent ahead of every page's text.
///
/// The page text is appended directly after the final period, with no
/// separator.
pub const SUMMARY_INSTRUCTION: &str = "Summarize this page in 15-20 lines under the heading of summary. You have to summarize, even if there are different, unlike topics on that page. (Kindly provide the response in proper paragraphing). However, if there is no text, then print Nothing to summarize. Additionally, after summarizing the text, enlist difficult terms up to 15, along with their single line meaning.";

/// Literal reply the instruction asks for when a page has no text.
pub const NOTHING_TO_SUMMARIZE: &str = "Nothing to summarize";

/// Concatenate the instruction and a page's text into the user message.
pub fn build_prompt(instruction: &str, page_text: &str) -> String {
    let mut prompt = String::with_capacity(instruction.len() + page_text.len());
    prompt.push_str(instruction);
    prompt.push_str(page_text);
    prompt
}
