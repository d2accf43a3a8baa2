use std::collections::BTreeMap;
use std::fmt::Write;

use super::candidate::{CandidateTable, SelectionCandidate};

const UNCATEGORIZED: &str = "Other";

const TOOL_SELECTION_PROMPT: &str = "\
You are an autonomous AI agent. I have a list of tools to choose from and a task I need you to \
accomplish. Recommend the tools that would be required for you to complete the task.

Respond with a JSON object and no other content, in this format:
{\"tools\": [{\"tool_id\": <tool_id>, \"reason\": \"<why the tool is needed>\"}]}

---- TASK ----
{task}
---- TOOLS ----
{tools}";

/// Prompt asking the model to pick tools for `task` from `table`.
///
/// Candidates are grouped under their first category; uncategorized ones
/// come last.
pub fn build_prompt(task: &str, table: &CandidateTable) -> String {
    let mut groups: BTreeMap<&str, Vec<(String, &SelectionCandidate)>> = BTreeMap::new();
    let mut other = Vec::new();
    for (key, candidate) in table.entries() {
        match candidate.categories.first() {
            Some(category) => groups.entry(category.as_str()).or_default().push((key, candidate)),
            None => other.push((key, candidate)),
        }
    }

    let mut tools = String::new();
    let ungrouped = groups.is_empty();
    for (category, entries) in groups {
        render_group(&mut tools, Some(category), &entries);
    }
    if !other.is_empty() {
        render_group(&mut tools, (!ungrouped).then_some(UNCATEGORIZED), &other);
    }

    TOOL_SELECTION_PROMPT
        .replace("{task}", task.trim())
        .replace("{tools}", tools.trim_end())
}

fn render_group(out: &mut String, heading: Option<&str>, entries: &[(String, &SelectionCandidate)]) {
    if let Some(heading) = heading {
        let _ = writeln!(out, "# {}", heading);
    }
    for (key, candidate) in entries {
        let _ = writeln!(out, "tool_id: {}", key);
        let _ = writeln!(out, "name: {}", candidate.name);
        let _ = writeln!(out, "description: {}", candidate.description);
        let _ = writeln!(out, "arguments: {}", candidate.signature);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::candidate::Addressing;

    fn candidate(pack_id: &str, category: Option<&str>) -> SelectionCandidate {
        SelectionCandidate {
            pack_id: pack_id.to_string(),
            name: pack_id.rsplit('/').next().unwrap_or(pack_id).to_string(),
            description: "does things".to_string(),
            signature: "f(path: string)".to_string(),
            categories: category.map(|c| vec![c.to_string()]).unwrap_or_default(),
        }
    }

    #[test]
    fn test_prompt_lists_pseudo_ids() {
        let table = CandidateTable::new(
            vec![candidate("a/b/read_file", None), candidate("a/b/write_file", None)],
            Addressing::PseudoId,
        );
        let prompt = build_prompt("Summarize notes.txt", &table);

        assert!(prompt.contains("---- TASK ----\nSummarize notes.txt\n"));
        assert!(prompt.contains("tool_id: 1\nname: read_file\n"));
        assert!(prompt.contains("tool_id: 2\nname: write_file\n"));
        assert!(prompt.contains("arguments: f(path: string)"));
        assert!(!prompt.contains("a/b/read_file"));
        assert!(!prompt.contains("# Other"));
    }

    #[test]
    fn test_prompt_lists_real_ids() {
        let table = CandidateTable::new(vec![candidate("a/b/read_file", None)], Addressing::RealId);
        assert!(build_prompt("t", &table).contains("tool_id: a/b/read_file\n"));
    }

    #[test]
    fn test_prompt_groups_by_category() {
        let table = CandidateTable::new(
            vec![
                candidate("a/b/search", Some("Web")),
                candidate("a/b/misc", None),
                candidate("a/b/read_file", Some("Files")),
            ],
            Addressing::PseudoId,
        );
        let prompt = build_prompt("t", &table);

        let files = prompt.find("# Files").unwrap();
        let web = prompt.find("# Web").unwrap();
        let other = prompt.find("# Other").unwrap();
        assert!(files < web && web < other);
        // Keys follow table order, not group order
        assert!(prompt[files..web].contains("tool_id: 3"));
    }
}
