//! Undo/redo history built on portfolio snapshots.
//!
//! The history listens for [`PortfolioEvent::UndoPointRequested`]. Each
//! edit runs against the live portfolio with a deep clone taken just before
//! it; if the edit requested an undo point, the clone becomes one undo
//! step. Undo swaps the live document with the stored snapshot.
//!
//! Pointer gestures use **batching**: one snapshot is taken when the
//! gesture starts and every edit until the outermost `end_batch()` folds
//! into a single step.

use folio_core::{Portfolio, PortfolioEvent, Result};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Undo steps kept; the oldest are dropped first. Default: **100**.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

#[derive(Debug)]
struct Entry {
    snapshot: Portfolio,
    description: String,
}

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
    config: HistoryConfig,
    /// Set by the portfolio listener when an undo point is requested.
    requested: Rc<Cell<bool>>,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    batch_snapshot: Option<Portfolio>,
    batch_dirty: bool,
}

impl History {
    /// A history recording undo points raised by `portfolio`.
    pub fn attach(portfolio: &mut Portfolio, config: HistoryConfig) -> Self {
        let requested = Rc::new(Cell::new(false));
        let flag = Rc::clone(&requested);
        portfolio.on_event(move |event| {
            if *event == PortfolioEvent::UndoPointRequested {
                flag.set(true);
            }
        });
        Self {
            undo_stack: Vec::with_capacity(config.max_depth),
            redo_stack: Vec::new(),
            config,
            requested,
            batch_depth: 0,
            batch_snapshot: None,
            batch_dirty: false,
        }
    }

    /// Start a batch group. Nested calls only deepen the group.
    pub fn begin_batch(&mut self, portfolio: &Portfolio) -> Result<()> {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(portfolio.deep_clone()?);
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
        Ok(())
    }

    /// End a batch group. When the outermost group closes after at least one
    /// recorded edit, the snapshot from `begin_batch` becomes one undo step.
    pub fn end_batch(&mut self, description: &str) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let snapshot = self.batch_snapshot.take();
        if self.batch_dirty
            && let Some(snapshot) = snapshot
        {
            self.push(Entry {
                snapshot,
                description: description.to_string(),
            });
        }
        self.batch_dirty = false;
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Run `edit` on the live portfolio, recording an undo step if the edit
    /// requested one.
    pub fn execute<R>(
        &mut self,
        portfolio: &mut Portfolio,
        description: &str,
        edit: impl FnOnce(&mut Portfolio) -> R,
    ) -> Result<R> {
        self.requested.set(false);
        if self.batch_depth > 0 {
            let result = edit(portfolio);
            self.batch_dirty |= self.requested.get();
            return Ok(result);
        }

        let snapshot = portfolio.deep_clone()?;
        let result = edit(portfolio);
        if self.requested.get() {
            self.push(Entry {
                snapshot,
                description: description.to_string(),
            });
        }
        Ok(result)
    }

    fn push(&mut self, entry: Entry) {
        log::debug!("undo point: {}", entry.description);
        self.undo_stack.push(entry);
        if self.undo_stack.len() > self.config.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Restore the state before the last step. Returns its description.
    pub fn undo(&mut self, portfolio: &mut Portfolio) -> Result<Option<String>> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let current = portfolio.deep_clone()?;
        portfolio.restore(entry.snapshot);
        self.redo_stack.push(Entry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Ok(Some(entry.description))
    }

    /// Reapply the last undone step. Returns its description.
    pub fn redo(&mut self, portfolio: &mut Portfolio) -> Result<Option<String>> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let current = portfolio.deep_clone()?;
        portfolio.restore(entry.snapshot);
        self.undo_stack.push(Entry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Ok(Some(entry.description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::presets;
    use pretty_assertions::assert_eq;

    #[test]
    fn selection_changes_are_not_undo_steps() {
        let mut portfolio = Portfolio::new();
        let mut history = History::attach(&mut portfolio, HistoryConfig::default());
        history
            .execute(&mut portfolio, "select", |p| p.select_sketch(None))
            .unwrap()
            .unwrap();
        assert!(!history.can_undo());
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut portfolio = Portfolio::new();
        let mut history = History::attach(&mut portfolio, HistoryConfig { max_depth: 3 });
        for i in 0..5 {
            history
                .execute(&mut portfolio, "add color", |p| {
                    p.add_color(&format!("C{i}"), presets::RED)
                })
                .unwrap();
        }
        assert_eq!(history.undo_depth(), 3);
        while history.undo(&mut portfolio).unwrap().is_some() {}
        let names: Vec<_> = portfolio.colors().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["C0", "C1"]);
    }

    #[test]
    fn empty_batch_no_undo_entry() {
        let mut portfolio = Portfolio::new();
        let mut history = History::attach(&mut portfolio, HistoryConfig::default());
        history.begin_batch(&portfolio).unwrap();
        history.end_batch("nothing");
        assert!(!history.can_undo());
        assert!(!history.is_batching());
    }
}
