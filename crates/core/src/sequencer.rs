//! Forward-gated navigation over a course's modules.
//!
//! The sequencer keeps `0 <= current <= frontier <= len - 1` at all times.
//! Learners may revisit any module up to the frontier; moving past it only
//! happens through `advance`.

use thiserror::Error;

use crate::model::{Module, ModuleContent, ModuleKind, QuizPayload, VideoRef};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequencerError {
    #[error("course has no modules")]
    EmptyCourse,
}

/// Outcome of `ModuleSequencer::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    CourseCompleted,
}

/// Active module payload, dispatched by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveContent<'a> {
    Text(&'a str),
    Video(&'a VideoRef),
    Test(&'a QuizPayload),
}

/// How a module appears in the course outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Current,
    Reached,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub index: usize,
    pub number: i64,
    pub title: String,
    pub kind: ModuleKind,
    pub status: EntryStatus,
}

/// Position summary, e.g. "module 3 of 8".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerProgress {
    /// 1-based position of the current module.
    pub position: usize,
    pub total: usize,
    pub frontier: usize,
}

#[derive(Debug, Clone)]
pub struct ModuleSequencer {
    modules: Vec<Module>,
    current: usize,
    frontier: usize,
}

impl ModuleSequencer {
    /// Orders the modules by number and starts at the first one.
    ///
    /// Modules sharing a number keep their fetch order.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::EmptyCourse` if `modules` is empty.
    pub fn new(mut modules: Vec<Module>) -> Result<Self, SequencerError> {
        if modules.is_empty() {
            return Err(SequencerError::EmptyCourse);
        }
        modules.sort_by_key(Module::number);
        Ok(Self {
            modules,
            current: 0,
            frontier: 0,
        })
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Always false: an empty course cannot be sequenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn frontier(&self) -> usize {
        self.frontier
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 == self.modules.len()
    }

    /// Jumps to a previously reached module.
    ///
    /// Returns `false` and leaves the state untouched when `index` lies
    /// beyond the frontier.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index > self.frontier {
            return false;
        }
        self.current = index;
        true
    }

    /// Moves to the next module, or reports completion on the last one.
    pub fn advance(&mut self) -> Advance {
        if self.is_last() {
            return Advance::CourseCompleted;
        }
        self.current += 1;
        self.frontier = self.frontier.max(self.current);
        Advance::Moved(self.current)
    }

    /// Raises the frontier to the last module numbered at most `module_num`.
    ///
    /// Used to restore saved progress. Never lowers the frontier and never
    /// moves the current module.
    pub fn restore_frontier(&mut self, module_num: i64) {
        if let Some(index) = self
            .modules
            .iter()
            .rposition(|m| m.number() <= module_num)
        {
            self.frontier = self.frontier.max(index);
        }
    }

    /// Module number at the frontier, the value worth persisting.
    #[must_use]
    pub fn frontier_module_num(&self) -> i64 {
        self.modules[self.frontier].number()
    }

    #[must_use]
    pub fn active_module(&self) -> &Module {
        &self.modules[self.current]
    }

    #[must_use]
    pub fn active(&self) -> ActiveContent<'_> {
        match self.active_module().content() {
            ModuleContent::Text(body) => ActiveContent::Text(body),
            ModuleContent::Video(video) => ActiveContent::Video(video),
            ModuleContent::Test(payload) => ActiveContent::Test(payload),
        }
    }

    #[must_use]
    pub fn progress(&self) -> SequencerProgress {
        SequencerProgress {
            position: self.current + 1,
            total: self.modules.len(),
            frontier: self.frontier,
        }
    }

    #[must_use]
    pub fn outline(&self) -> Vec<OutlineEntry> {
        self.modules
            .iter()
            .enumerate()
            .map(|(index, m)| OutlineEntry {
                index,
                number: m.number(),
                title: m.title().to_owned(),
                kind: m.kind(),
                status: if index == self.current {
                    EntryStatus::Current
                } else if index <= self.frontier {
                    EntryStatus::Reached
                } else {
                    EntryStatus::Locked
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, ModuleId};

    fn text_module(number: i64) -> Module {
        Module::new(
            ModuleId::new(format!("m{number}")),
            CourseId::new("c1"),
            number,
            format!("Module {number}"),
            ModuleContent::Text(format!("body {number}")),
        )
    }

    fn sequencer(n: i64) -> ModuleSequencer {
        ModuleSequencer::new((1..=n).map(text_module).collect()).unwrap()
    }

    #[test]
    fn empty_course_is_rejected() {
        assert_eq!(
            ModuleSequencer::new(Vec::new()).unwrap_err(),
            SequencerError::EmptyCourse
        );
    }

    #[test]
    fn modules_are_ordered_by_number() {
        let seq = ModuleSequencer::new(vec![text_module(3), text_module(1), text_module(2)])
            .unwrap();
        let numbers: Vec<i64> = seq.modules().iter().map(Module::number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.frontier(), 0);
    }

    #[test]
    fn go_to_beyond_frontier_is_a_noop() {
        let mut seq = sequencer(4);
        assert!(!seq.go_to(2));
        assert!(!seq.go_to(usize::MAX));
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.frontier(), 0);
    }

    #[test]
    fn revisiting_keeps_the_frontier() {
        let mut seq = sequencer(4);
        seq.advance();
        seq.advance();
        assert!(seq.go_to(0));
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.frontier(), 2);
        assert!(seq.go_to(2));
        assert!(!seq.go_to(3));
    }

    #[test]
    fn advance_from_a_revisited_module_does_not_lower_frontier() {
        let mut seq = sequencer(4);
        seq.advance();
        seq.advance();
        seq.go_to(0);
        assert_eq!(seq.advance(), Advance::Moved(1));
        assert_eq!(seq.frontier(), 2);
    }

    #[test]
    fn advance_at_last_module_reports_completion_each_time() {
        let mut seq = sequencer(2);
        assert_eq!(seq.advance(), Advance::Moved(1));
        assert_eq!(seq.advance(), Advance::CourseCompleted);
        assert_eq!(seq.advance(), Advance::CourseCompleted);
        assert_eq!(seq.current_index(), 1);
    }

    #[test]
    fn index_stays_in_bounds_under_any_navigation() {
        let mut seq = sequencer(3);
        for step in 0..50_usize {
            if step % 3 == 0 {
                seq.advance();
            } else {
                seq.go_to(step % 7);
            }
            assert!(seq.current_index() <= seq.frontier());
            assert!(seq.frontier() < seq.len());
        }
    }

    #[test]
    fn outline_marks_locked_modules() {
        let mut seq = sequencer(3);
        seq.advance();
        seq.go_to(0);
        let statuses: Vec<EntryStatus> = seq.outline().into_iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![EntryStatus::Current, EntryStatus::Reached, EntryStatus::Locked]
        );
    }

    #[test]
    fn restore_frontier_uses_module_numbers() {
        let mut seq = ModuleSequencer::new(vec![text_module(10), text_module(20), text_module(30)])
            .unwrap();
        seq.restore_frontier(25);
        assert_eq!(seq.frontier(), 1);
        assert_eq!(seq.current_index(), 0);
        seq.restore_frontier(5);
        assert_eq!(seq.frontier(), 1);
        assert_eq!(seq.frontier_module_num(), 20);
    }

    #[test]
    fn active_dispatches_by_type() {
        let seq = sequencer(1);
        assert_eq!(seq.active(), ActiveContent::Text("body 1"));
        assert_eq!(seq.progress().position, 1);
        assert_eq!(seq.progress().total, 1);
    }
}
