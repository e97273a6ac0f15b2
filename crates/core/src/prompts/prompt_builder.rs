use crate::conversation::ConversationTurn;

const SQL_PREAMBLE: &str = "You are an expert at turning English questions into SQL queries.\n\
Using the database schema below, write a single SQL query that answers the user's question.\n\
Take the conversation history into account when the question refers back to it.\n\
Return ONLY the SQL statement: no explanation, no markdown, no code fences.";

const ANSWER_PREAMBLE: &str = "Using the schema, the SQL query and its execution result below, \
write a short human-readable answer for the user.\n\
Do not mention the SQL unless it helps explain the answer.";

const EMPTY_HISTORY: &str = "(no previous messages)";

/// Render turns as `Human: ...` / `AI: ...` lines, oldest first.
pub fn render_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return EMPTY_HISTORY.to_string();
    }
    history
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking the model for one SQL statement answering `question`.
pub fn build_sql_prompt(schema: &str, history: &[ConversationTurn], question: &str) -> String {
    format!(
        "{preamble}\n\n<SCHEMA>{schema}</SCHEMA>\n\nConversation History:\n{history}\n\nQuestion: {question}\nSQL Query:",
        preamble = SQL_PREAMBLE,
        schema = schema,
        history = render_history(history),
        question = question,
    )
}

/// Prompt asking the model to explain a query result in plain language.
pub fn build_answer_prompt(schema: &str, sql: &str, result: &str) -> String {
    format!(
        "{preamble}\n\n<SCHEMA>{schema}</SCHEMA>\n\nSQL query: {sql}\nSQL result:\n{result}\n\nResponse:",
        preamble = ANSWER_PREAMBLE,
        schema = schema,
        sql = sql,
        result = result,
    )
}
