//! Tab completion of command names for the line editor.

use crate::resolver::BUILTIN_NAMES;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

/// Completes the word under the cursor with builtin names and the names of the
/// files found in the `PATH` directories.
///
/// A unique match is inserted followed by a space. Several matches sharing a
/// longer prefix than the typed word are completed up to that prefix. Otherwise
/// every match is offered, which the editor lists on the second tab.
pub struct ShellHelper {
    search_path: Vec<PathBuf>,
}

impl ShellHelper {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Sorted, deduplicated command names starting with `prefix`.
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        let mut names: BTreeSet<String> = BUILTIN_NAMES
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| name.to_string())
            .collect();

        for dir in &self.search_path {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str()
                    && name.starts_with(prefix)
                {
                    names.insert(name.to_string());
                }
            }
        }
        names.into_iter().collect()
    }
}

/// Longest prefix shared by every name; empty when there are none.
pub fn longest_common_prefix(names: &[String]) -> &str {
    let Some((first, rest)) = names.split_first() else {
        return "";
    };
    let mut end = first.len();
    for name in rest {
        end = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(end);
    }
    &first[..end]
}

/// Byte offset where the word ending at `pos` starts.
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == '|')
        .map_or(0, |(i, c)| i + c.len_utf8())
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let word = &line[start..pos];
        let names = self.commands_starting_with(word);
        log::debug!("completing {word:?}: {} candidates", names.len());

        let candidates = match names.as_slice() {
            [] => Vec::new(),
            [name] => vec![Pair {
                display: name.clone(),
                replacement: format!("{name} "),
            }],
            _ => {
                let prefix = longest_common_prefix(&names);
                if prefix.len() > word.len() {
                    vec![Pair {
                        display: prefix.to_string(),
                        replacement: prefix.to_string(),
                    }]
                } else {
                    names
                        .iter()
                        .map(|name| Pair {
                            display: name.clone(),
                            replacement: format!("{name} "),
                        })
                        .collect()
                }
            }
        };
        Ok((start, candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::DefaultHistory;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "completion_test_{}_{}",
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn complete(helper: &ShellHelper, line: &str) -> (usize, Vec<String>) {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, pairs) = helper.complete(line, line.len(), &ctx).unwrap();
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn test_longest_common_prefix() {
        assert_eq!(longest_common_prefix(&[]), "");
        assert_eq!(longest_common_prefix(&names(&["echo"])), "echo");
        assert_eq!(longest_common_prefix(&names(&["xyz_foo", "xyz_foo_bar", "xyz_foo_baz"])), "xyz_foo");
        assert_eq!(longest_common_prefix(&names(&["echo", "exit"])), "e");
        assert_eq!(longest_common_prefix(&names(&["cd", "pwd"])), "");
        assert_eq!(longest_common_prefix(&names(&["été", "étang"])), "ét");
    }

    #[test]
    fn test_candidates_merge_builtins_and_path() {
        let first = make_unique_temp_dir();
        let second = make_unique_temp_dir();
        fs::write(first.join("export_tool"), "").unwrap();
        fs::write(second.join("export_tool"), "").unwrap();
        fs::write(second.join("echoer"), "").unwrap();
        fs::create_dir_all(second.join("exdir")).unwrap();

        let helper = ShellHelper::new(vec![first.clone(), PathBuf::from("/nonexistent_dir"), second.clone()]);
        assert_eq!(
            helper.commands_starting_with("e"),
            names(&["echo", "echoer", "exit", "export_tool"])
        );
        assert_eq!(helper.commands_starting_with("hist"), names(&["history"]));
        assert!(helper.commands_starting_with("zzz_none").is_empty());

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    fn test_complete_unique_prefix_and_ambiguous() {
        let dir = make_unique_temp_dir();
        for name in ["xyz_foo", "xyz_foo_bar", "xyz_foo_baz"] {
            fs::write(dir.join(name), "").unwrap();
        }
        let helper = ShellHelper::new(vec![dir.clone()]);

        assert_eq!(complete(&helper, "ech"), (0, names(&["echo "])));
        assert_eq!(complete(&helper, "echo hi | hist"), (10, names(&["history "])));
        assert_eq!(complete(&helper, "xy"), (0, names(&["xyz_foo"])));
        assert_eq!(
            complete(&helper, "xyz_foo"),
            (0, names(&["xyz_foo ", "xyz_foo_bar ", "xyz_foo_baz "]))
        );
        assert_eq!(complete(&helper, "xyz_foo_b"), (0, names(&["xyz_foo_ba"])));
        assert_eq!(complete(&helper, "qqq_nothing"), (0, Vec::new()));

        let _ = fs::remove_dir_all(dir);
    }
}
