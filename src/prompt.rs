/// Builds the request sent to the text generator for a reader's question.
pub fn recommendation_prompt(query: &str) -> String {
    format!(
        "Answer this question: {query}\n\n\
         Return a list of book recommendations in NDJSON format. \
         Each line should be a valid JSON object with: title, author, isbn, genre, and reason.\n"
    )
}
