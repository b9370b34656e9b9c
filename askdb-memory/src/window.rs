use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One past turn kept for later prompts.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContextEntry {
    pub query: String,
    pub text_response: String,
    pub sql_query: String,
}

impl ContextEntry {
    pub fn new(
        query: impl Into<String>,
        text_response: impl Into<String>,
        sql_query: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            text_response: text_response.into(),
            sql_query: sql_query.into(),
        }
    }
}

/// FIFO of at most `capacity` turns; the oldest is evicted first.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContextWindow {
    capacity: usize,
    entries: VecDeque<ContextEntry>,
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, entry: ContextEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &ContextEntry> + '_ {
        self.entries.iter()
    }

    pub fn chat_history_recent_first(&self) -> Vec<&ContextEntry> {
        self.entries.iter().rev().collect()
    }

    /// History as prompt text, most recent turn first.
    pub fn render_recent_first(&self) -> String {
        self.entries
            .iter()
            .rev()
            .enumerate()
            .map(|(age, entry)| {
                let mut turn = format!("Turn -{}\nQuestion: {}\n", age + 1, entry.query);
                if !entry.sql_query.is_empty() {
                    turn.push_str(&format!("SQL: {}\n", entry.sql_query));
                }
                turn.push_str(&format!("Answer: {}", entry.text_response));
                turn
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
