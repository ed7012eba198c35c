//! Per-tool state and the active-tool selector.
//!
//! Each tool has a [`ToolState`]. [`Session::begin`] marks the tool busy
//! and hands out a [`Ticket`]; [`Session::settle`] re-enables the tool and
//! returns the result only if the ticket is still the latest for that tool
//! and the tool is still active. Switching away from a tool abandons its
//! pending operation, so a late answer is dropped instead of landing in a
//! form the user has left.

use crate::error::ToolverseError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolId {
    #[default]
    PdfTools,
    ResumeMaker,
    CaptionGenerator,
    KidsStoryMaker,
    HomeworkSolver,
    BudgetPlanner,
    ImageGenerator,
    Notes,
}

impl ToolId {
    pub const ALL: [ToolId; 8] = [
        ToolId::PdfTools,
        ToolId::ResumeMaker,
        ToolId::CaptionGenerator,
        ToolId::KidsStoryMaker,
        ToolId::HomeworkSolver,
        ToolId::BudgetPlanner,
        ToolId::ImageGenerator,
        ToolId::Notes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolId::PdfTools => "PDF & Document Tools",
            ToolId::ResumeMaker => "Resume Maker",
            ToolId::CaptionGenerator => "Caption Generator",
            ToolId::KidsStoryMaker => "Kids Story Maker",
            ToolId::HomeworkSolver => "Homework Solver",
            ToolId::BudgetPlanner => "Budget Planner",
            ToolId::ImageGenerator => "Image Generator",
            ToolId::Notes => "Personal Notes",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Proof that an operation was started. Hand it back to [`Session::settle`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Ticket {
    tool: ToolId,
    seq: u64,
}

impl Ticket {
    pub fn tool(&self) -> ToolId {
        self.tool
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolState {
    busy: bool,
    latest: u64,
}

impl ToolState {
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

#[derive(Debug, Default)]
pub struct Session {
    active: ToolId,
    states: HashMap<ToolId, ToolState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> ToolId {
        self.active
    }

    pub fn state(&self, tool: ToolId) -> ToolState {
        self.states.get(&tool).cloned().unwrap_or_default()
    }

    /// Make `tool` the active one. The previously active tool's pending
    /// operation, if any, is abandoned.
    pub fn select(&mut self, tool: ToolId) {
        if tool == self.active {
            return;
        }
        let previous = self.states.entry(self.active).or_default();
        if previous.busy {
            debug!("Abandoning pending operation of {}", self.active);
            previous.busy = false;
            previous.latest += 1;
        }
        self.active = tool;
    }

    /// Start an operation on `tool`. Rejected while one is in flight.
    pub fn begin(&mut self, tool: ToolId) -> Result<Ticket, ToolverseError> {
        let state = self.states.entry(tool).or_default();
        if state.busy {
            return Err(ToolverseError::Busy {
                tool: tool.label().to_string(),
            });
        }
        state.busy = true;
        state.latest += 1;
        Ok(Ticket {
            tool,
            seq: state.latest,
        })
    }

    /// Finish the operation behind `ticket`. Returns `result` when it may
    /// be shown, `None` when it is stale.
    pub fn settle<T>(&mut self, ticket: Ticket, result: T) -> Option<T> {
        let state = self.states.entry(ticket.tool).or_default();
        if ticket.seq != state.latest {
            debug!("Discarding stale result for {}", ticket.tool);
            return None;
        }
        state.busy = false;
        (self.active == ticket.tool).then_some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_while_busy_is_rejected() {
        let mut s = Session::new();
        let t = s.begin(ToolId::PdfTools).unwrap();
        let err = s.begin(ToolId::PdfTools).unwrap_err();
        assert!(matches!(err, ToolverseError::Busy { .. }));
        assert_eq!(s.settle(t, 1), Some(1));
        assert!(!s.state(ToolId::PdfTools).is_busy());
        assert!(s.begin(ToolId::PdfTools).is_ok());
    }

    #[test]
    fn tools_are_independent() {
        let mut s = Session::new();
        let _pdf = s.begin(ToolId::PdfTools).unwrap();
        assert!(s.begin(ToolId::BudgetPlanner).is_ok());
    }

    #[test]
    fn switching_away_discards_late_result() {
        let mut s = Session::new();
        s.select(ToolId::KidsStoryMaker);
        let t = s.begin(ToolId::KidsStoryMaker).unwrap();
        s.select(ToolId::Notes);
        assert!(!s.state(ToolId::KidsStoryMaker).is_busy());
        s.select(ToolId::KidsStoryMaker);
        assert_eq!(s.settle(t, "story"), None);
    }

    #[test]
    fn newer_ticket_wins() {
        let mut s = Session::new();
        let old = s.begin(ToolId::PdfTools).unwrap();
        s.select(ToolId::Notes);
        s.select(ToolId::PdfTools);
        let new = s.begin(ToolId::PdfTools).unwrap();
        assert_eq!(s.settle(old, "old"), None);
        assert!(s.state(ToolId::PdfTools).is_busy());
        assert_eq!(s.settle(new, "new"), Some("new"));
    }

    #[test]
    fn inactive_tool_result_not_shown_but_reenabled() {
        let mut s = Session::new();
        let t = s.begin(ToolId::ImageGenerator).unwrap();
        assert_eq!(s.active(), ToolId::PdfTools);
        assert_eq!(s.settle(t, ()), None);
        assert!(!s.state(ToolId::ImageGenerator).is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(ToolId::ALL.len(), 8);
        assert_eq!(ToolId::HomeworkSolver.to_string(), "Homework Solver");
    }
}
