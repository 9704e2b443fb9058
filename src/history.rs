use std::fs;
use std::io;
use std::path::Path;

/// Lines entered during this session, oldest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read prior history from a file holding one command per line.
    ///
    /// Blank lines are skipped.
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Ok(Self { entries })
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The last `limit` entries (all of them when `limit` is `None` or too large),
    /// paired with their 1-based position in the whole history.
    pub fn tail(&self, limit: Option<usize>) -> impl Iterator<Item = (usize, &str)> {
        let limit = limit.unwrap_or(self.entries.len());
        let start = self.entries.len().saturating_sub(limit);
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, line)| (i + 1, line.as_str()))
    }
}
