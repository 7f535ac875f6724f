//! Prompt construction shared by every backend.

/// Build the instruction prompt for `question` grounded on `passage`.
///
/// Quotes are stripped from the passage and newlines flattened to spaces so it
/// sits on a single quoted line of the template.
pub fn build_prompt(question: &str, passage: &str) -> String {
    let passage = flatten_passage(passage);
    format!(
        "You are a helpful and informative bot that answers questions using text from the \
reference passage included below. Be sure to respond in a complete sentence, being \
comprehensive, including all relevant background information. However, you are talking \
to a non-technical audience, so break down complicated concepts and strike a friendly \
and conversational tone. The length of the response should be relevant to the prompt. \
Provide longer responses only if asked.\n\
If the passage is irrelevant to the answer, you may ignore it.\n\
Redraft the response properly with proper sentence formation. Make sure the response \
length is reasonable and readable.\n\
QUESTION: '{question}'\n\
PASSAGE: '{passage}'\n\
ANSWER:\n"
    )
}

fn flatten_passage(passage: &str) -> String {
    passage
        .chars()
        .filter(|c| !matches!(c, '\'' | '"'))
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
