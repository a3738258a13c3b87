//! Prompts for VLM-based table extraction.
//!
//! Callers can override both via [`crate::config::PipelineConfig::system_prompt`]
//! and [`crate::config::PipelineConfig::user_prompt`]; the constants here are
//! used only when no override is provided.

/// Default system prompt instructing the model to return tables as JSON.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You extract tabular data from images of document pages.

Return the data as JSON:
- A JSON array with one object per table row.
- Use the table's column headers as object keys, exactly as printed.
- Keep every row in the order it appears on the page.
- Keep numbers as printed; do not compute totals or reformat values.
- Use null for empty cells.

If the page holds several tables, return one array containing the rows of
all of them in reading order. If the page holds no table, return [].

Output ONLY the JSON. Do not add commentary or explanations."#;

/// Default user instruction paired with each page image.
pub const DEFAULT_USER_PROMPT: &str =
    "Extract tables from this image and return structured data.";
