//! Run-level counters.

use serde::{Deserialize, Serialize};

use crate::report::Category;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_processed: usize,
    pub thoughts: usize,
    pub urls_explicit: usize,
    pub urls_inferred: usize,
    pub todos: usize,
    pub gibberish: usize,
    pub salvaged: usize,
    pub entities_found: usize,
}

impl RunStatistics {
    /// Count one classified fragment.
    pub fn record(&mut self, category: Category, entity_count: usize) {
        self.total_processed += 1;
        self.entities_found += entity_count;
        match category {
            Category::Thought => self.thoughts += 1,
            Category::UrlExplicit => self.urls_explicit += 1,
            Category::UrlInferred => self.urls_inferred += 1,
            Category::Todo => self.todos += 1,
            Category::Gibberish => self.gibberish += 1,
            Category::Salvaged => self.salvaged += 1,
        }
    }

    pub fn urls(&self) -> usize {
        self.urls_explicit + self.urls_inferred
    }

    /// Sum of the per-category counters.
    pub fn classified(&self) -> usize {
        self.thoughts + self.urls() + self.todos + self.gibberish + self.salvaged
    }

    /// Share of fragments that became thoughts, URLs or todos.
    pub fn clean_ratio(&self) -> f64 {
        (self.thoughts + self.urls() + self.todos) as f64 / self.total_processed.max(1) as f64
    }

    pub fn salvage_ratio(&self) -> f64 {
        self.salvaged as f64 / (self.salvaged + self.gibberish).max(1) as f64
    }

    pub fn url_inference_ratio(&self) -> f64 {
        self.urls_inferred as f64 / self.urls().max(1) as f64
    }
}
