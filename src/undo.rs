//! Undo/Redo system for labeling decisions.
//!
//! Every label or skip produces a [`TransitionRecord`] holding the full status
//! before and after the change. Undo re-applies the old status, redo the new
//! one; nothing else is needed because a transition is self-describing. The
//! history is global across dataset types, so the most recent decision anywhere
//! is the first one undone.

use std::collections::VecDeque;
use std::path::Path;

use crate::constants::UNDO_HISTORY_SIZE;
use crate::model::{ImageStatus, TransitionRecord};

// ============================================================================
// Undo Stack
// ============================================================================

/// Configuration for the undo stack
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of transitions to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: UNDO_HISTORY_SIZE,
        }
    }
}

/// The undo/redo history stack.
///
/// Maintains two stacks:
/// - `history`: Transitions that can be undone (most recent at the back)
/// - `redo_stack`: Transitions that can be redone (most recent at the end)
///
/// When a new transition is recorded, it's pushed to history and redo_stack is cleared.
/// When undo is called, the transition is moved from history to redo_stack.
/// When redo is called, the transition is moved from redo_stack to history.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    /// Transitions that can be undone
    history: VecDeque<TransitionRecord>,
    /// Transitions that can be redone
    redo_stack: Vec<TransitionRecord>,
    /// Configuration
    config: UndoConfig,
}

impl UndoStack {
    /// Create a new empty undo stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Push a transition to the history.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, transition: TransitionRecord) {
        log::debug!("📝 Undo: pushed '{}'", transition.description());
        self.history.push_back(transition);
        self.redo_stack.clear();

        // Limit history size
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop a transition from the history for undoing.
    /// The transition is moved to the redo stack.
    pub fn pop_undo(&mut self) -> Option<TransitionRecord> {
        let transition = self.history.pop_back()?;
        log::debug!("⏪ Undo: '{}'", transition.description());
        self.redo_stack.push(transition.clone());
        Some(transition)
    }

    /// Pop a transition from the redo stack for redoing.
    /// The transition is moved back to the history.
    pub fn pop_redo(&mut self) -> Option<TransitionRecord> {
        let transition = self.redo_stack.pop()?;
        log::debug!("⏩ Redo: '{}'", transition.description());
        self.history.push_back(transition.clone());
        Some(transition)
    }

    /// Get the transition that would be undone
    pub fn peek_undo(&self) -> Option<&TransitionRecord> {
        self.history.back()
    }

    /// Get the number of transitions in undo history
    pub fn undo_count(&self) -> usize {
        self.history.len()
    }

    /// Get the number of transitions in redo history
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

/// State that transitions can be re-applied to.
pub trait StatusTarget {
    /// Force the status of one image, updating records and skip sets to match.
    fn apply_status(&mut self, dataset_type: &str, image_path: &Path, status: ImageStatus);
}

/// Undo the most recent transition by re-applying its old status.
/// Returns the undone transition, or None if there was nothing to undo.
pub fn undo_transition(
    stack: &mut UndoStack,
    target: &mut impl StatusTarget,
) -> Option<TransitionRecord> {
    let transition = stack.pop_undo()?;
    target.apply_status(
        &transition.dataset_type,
        &transition.image_path,
        transition.old_status,
    );
    Some(transition)
}

/// Redo the most recently undone transition by re-applying its new status.
/// Returns the redone transition, or None if there was nothing to redo.
pub fn redo_transition(
    stack: &mut UndoStack,
    target: &mut impl StatusTarget,
) -> Option<TransitionRecord> {
    let transition = stack.pop_redo()?;
    target.apply_status(
        &transition.dataset_type,
        &transition.image_path,
        transition.new_status,
    );
    Some(transition)
}

// ============================================================================
// Tests
// ============================================================================
