/// Pull the SQL statement out of a model reply.
///
/// Models regularly wrap the statement in a markdown fence or echo the
/// `SQL Query:` label from the prompt. Returns `None` when nothing is left.
pub fn extract_sql(response: &str) -> Option<String> {
    let mut text = response.trim();

    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        // Skip the info string (`sql`, `mysql`, ...) on the opening line.
        let body = match after_fence.find('\n') {
            Some(newline) => &after_fence[newline + 1..],
            None => after_fence,
        };
        text = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
        text = text.trim();
    }

    for label in ["SQL Query:", "SQLQuery:", "SQL:"] {
        let matches_label = text
            .get(..label.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(label));
        if matches_label {
            text = text[label.len()..].trim();
            break;
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
