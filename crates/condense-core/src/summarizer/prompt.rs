//! Prompt templates for summarization

/// Build the summarization prompt for `text`.
///
/// With a question the model is asked to keep what relates to it without
/// answering it; otherwise it covers the topics present. Either way a text
/// with no extractable information gets described instead.
pub fn summarization_prompt(text: &str, question: Option<&str>) -> String {
    let instructions = match question {
        Some(question) => format!(
            "Concisely summarize the following text, focusing on information related to \
             the question \"{question}\". Do not answer the question itself. \
             If the text does not contain information, describe the type of text."
        ),
        None => "Concisely summarize the following text, covering the topics present in the \
                 text and nothing more. If the text does not contain information, describe \
                 the type of text."
            .to_string(),
    };

    format!("{instructions}\n\nText: \"\"\"{text}\"\"\"\n\nSummary/description:")
}
