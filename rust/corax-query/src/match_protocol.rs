//! The protocol every match implements, leaf or combinator.

use std::fmt;

use corax_common::Result;

/// How far [`QueryMatch::count`] can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Low,
    Normal,
    High,
}

/// A lazy, single pass sequence of ascending, deduplicated result ids.
pub trait QueryMatch {
    /// Number of ids, exact or estimated according to [`QueryMatch::confidence`].
    fn count(&self) -> u64;

    fn confidence(&self) -> Confidence;

    /// Writes the next ids into `matches` and returns how many were written.
    /// 0 means the match is exhausted.
    fn fill(&mut self, matches: &mut [u64]) -> Result<usize>;

    /// Intersects the match with the ascending candidates `buffer[..matches]`,
    /// writing the survivors to the start of `buffer` and returning their count.
    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize>;

    /// Writes relevance scores of `matches` into `scores`; matches that do not
    /// score leave `scores` untouched.
    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        let _ = (matches, scores);
        Ok(())
    }

    fn inspect(&self) -> QueryInspectionNode;
}

impl<M: QueryMatch + ?Sized> QueryMatch for Box<M> {
    fn count(&self) -> u64 {
        (**self).count()
    }

    fn confidence(&self) -> Confidence {
        (**self).confidence()
    }

    fn fill(&mut self, matches: &mut [u64]) -> Result<usize> {
        (**self).fill(matches)
    }

    fn and_with(&mut self, buffer: &mut [u64], matches: usize) -> Result<usize> {
        (**self).and_with(buffer, matches)
    }

    fn score(&mut self, matches: &[u64], scores: &mut [f32]) -> Result<()> {
        (**self).score(matches, scores)
    }

    fn inspect(&self) -> QueryInspectionNode {
        (**self).inspect()
    }
}

/// Drains `m` with batches of `batch` ids.
pub fn drain(m: &mut dyn QueryMatch, batch: usize) -> Result<Vec<u64>> {
    let mut out = Vec::new();
    let mut buf = vec![0u64; batch.max(1)];
    loop {
        let n = m.fill(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

/// Debug description of a match tree.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInspectionNode {
    pub name: String,
    pub parameters: Vec<(String, String)>,
    pub children: Vec<QueryInspectionNode>,
}

impl QueryInspectionNode {
    pub fn new(name: impl Into<String>) -> QueryInspectionNode {
        QueryInspectionNode {
            name: name.into(),
            parameters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.push((name.into(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: QueryInspectionNode) -> Self {
        self.children.push(child);
        self
    }

    /// Adds the `Count` parameter shared by every node.
    pub fn with_count(self, count: u64, confidence: Confidence) -> Self {
        self.with_parameter("Count", format!("{count} [{confidence:?}]"))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.name, indent = depth * 2)?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            write!(f, " {{{}}}", params.join(", "))?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for QueryInspectionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
