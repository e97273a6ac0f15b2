/// Format one table for the schema description: its DDL followed by a
/// comment block holding up to N sample rows, tab separated.
pub(crate) fn table_block(
    table: &str,
    create_statement: &str,
    columns: &[String],
    samples: &[Vec<String>],
) -> String {
    let mut block = create_statement.trim_end().to_string();
    if samples.is_empty() {
        return block;
    }

    let noun = if samples.len() == 1 { "row" } else { "rows" };
    block.push_str(&format!(
        "\n\n/*\n{} {} from {} table:\n{}",
        samples.len(),
        noun,
        table,
        columns.join("\t")
    ));
    for row in samples {
        block.push('\n');
        block.push_str(&row.join("\t"));
    }
    block.push_str("\n*/");
    block
}

/// Join per-table blocks into the full description.
pub(crate) fn join_blocks(blocks: Vec<String>) -> String {
    if blocks.is_empty() {
        return "(no tables)".to_string();
    }
    blocks.join("\n\n")
}

/// Cut long sample values so a wide table cannot flood the prompt.
pub(crate) fn clip_sample(value: String) -> String {
    const MAX_SAMPLE_CHARS: usize = 100;
    if value.chars().count() <= MAX_SAMPLE_CHARS {
        return value;
    }
    let mut clipped: String = value.chars().take(MAX_SAMPLE_CHARS).collect();
    clipped.push_str("...");
    clipped
}

pub(crate) fn quote_mysql_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub(crate) fn quote_sqlite_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
