use crate::llm::models::ChatMessage;

/// Instruction sent as the system message of every completion.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a SQL expert. Using only the MySQL schema below, write an optimized SQL query that answers the incoming request.
Return the answer only as the following JSON object (do not put markdown fences before or after it):
{
  "sql": "SQL QUERY"
}"#;

/// Builds the system + user exchange for one question.
/// The question is inserted verbatim after the schema text.
pub fn compose_messages(schema: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(format!(
            "Database schema:\n{}\n\nQUESTION: {}",
            schema, question
        )),
    ]
}
