//! Pointer movement within a session.
//!
//! All rule checks live in [`ProgressState::navigate`]; the adjacency helpers
//! only compute positions.

use super::{Pointer, ProgressState};
use crate::errors::{CodebookError, CodebookResult};

impl ProgressState {
    /// Move the session pointer to `target`.
    ///
    /// Rejected when the target is out of range, when it lies behind the
    /// current pointer and `canGoBack` is off, or when it lies beyond the first
    /// open slot of the active phase and `canSkip` is off.
    pub fn navigate(&mut self, target: Pointer) -> CodebookResult<()> {
        self.check_in_range(target)?;

        if target < self.current && !self.settings.can_go_back {
            tracing::warn!(?target, current = ?self.current, "backward navigation rejected");
            return Err(CodebookError::navigation("going back is not allowed in this job"));
        }

        if !self.settings.can_skip {
            if let Some(frontier) = self.frontier() {
                if target > frontier {
                    tracing::warn!(?target, ?frontier, "forward navigation rejected");
                    return Err(CodebookError::navigation(format!(
                        "cannot skip past phase {} unit {} variable {}",
                        frontier.phase, frontier.unit, frontier.variable
                    )));
                }
            }
        }

        self.previous = self.current;
        self.current = target;
        tracing::debug!(?target, "navigated");
        Ok(())
    }

    /// The position after the current one, crossing unit and phase
    /// boundaries. `None` at the very end.
    pub fn next_pointer(&self) -> Option<Pointer> {
        let Pointer { phase, unit, variable } = self.current;
        let p = self.phases.get(phase)?;

        if variable + 1 < p.variables.len() {
            return Some(Pointer::new(phase, unit, variable + 1));
        }
        if unit + 1 < p.unit_slots() {
            return Some(Pointer::new(phase, unit + 1, 0));
        }
        if phase + 1 < self.phases.len() {
            return Some(Pointer::new(phase + 1, 0, 0));
        }
        None
    }

    /// The position before the current one. `None` at the very start.
    pub fn previous_pointer(&self) -> Option<Pointer> {
        let Pointer { phase, unit, variable } = self.current;

        if variable > 0 {
            return Some(Pointer::new(phase, unit, variable - 1));
        }
        if unit > 0 {
            let p = self.phases.get(phase)?;
            return Some(Pointer::new(phase, unit - 1, p.variables.len().saturating_sub(1)));
        }
        let prev = phase.checked_sub(1)?;
        let p = self.phases.get(prev)?;
        Some(Pointer::new(prev, p.unit_slots() - 1, p.variables.len().saturating_sub(1)))
    }

    fn check_in_range(&self, target: Pointer) -> CodebookResult<()> {
        let p = self.phases.get(target.phase).ok_or_else(|| {
            CodebookError::navigation(format!("phase index {} out of range", target.phase))
        })?;
        if target.unit >= p.unit_slots() {
            return Err(CodebookError::navigation(format!(
                "unit index {} out of range for phase {}",
                target.unit, p.phase_id
            )));
        }
        if target.variable >= p.variables.len().max(1) {
            return Err(CodebookError::navigation(format!(
                "variable index {} out of range for phase {}",
                target.variable, p.phase_id
            )));
        }
        Ok(())
    }
}
