//! Small text helpers shared by the generators.

/// `create_readme` -> `Create Readme`, `ask-question` -> `Ask Question`.
///
/// Dashes and underscores become spaces, and the first character of every
/// word is upper-cased. Everything else is left alone.
pub fn to_capital_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;
    for c in input.chars() {
        let c = if c == '-' || c == '_' { ' ' } else { c };
        let is_word = c.is_alphanumeric();
        if is_word && !in_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }
    out
}

/// Prepends an MDX frontmatter block.
pub fn add_frontmatter(content: &str, title: &str, description: &str) -> String {
    format!("---\ntitle: {title}\ndescription: {description}\n---\n\n{content}")
}

/// Wraps source text in a fenced code block for a prompt.
pub fn code_fence(content: &str, language: &str) -> String {
    let fence = if content.contains("```") { "````" } else { "```" };
    format!("{fence}{language}\n{}\n{fence}", content.trim_end())
}
