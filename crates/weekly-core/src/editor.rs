//! # Report Editor State
//!
//! The in-progress report a user is composing, and the gate that keeps at
//! most one save of it in flight.
//!
//! ## Cascade
//!
//! Changing a level of the selection clears every level below it. Changing
//! the domain also drops content for modules that do not apply to the new
//! domain.
//!
//! ## Save Gate
//!
//! Manual saves and autosave ticks share one `SaveGate`. A save that finds
//! the gate taken is skipped, never queued.

use crate::config_graph::ConfigGraph;
use crate::{ContentEntry, Level, RecordId, Report, ReportDraft};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};

/// What started a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Manual,
    Autosave,
}

/// Why a save did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another save was already running.
    InFlight,
    /// Autosave only: selection, start date or content missing.
    Incomplete,
}

/// Result of a save attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Report),
    Skipped(SkipReason),
}

// =============================================================================
// SAVE GATE
// =============================================================================

/// Single-flight flag shared by manual saves and autosave.
#[derive(Debug, Default)]
pub struct SaveGate {
    in_flight: AtomicBool,
}

impl SaveGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate. `None` if a save is already in flight.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SaveGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SaveGuard { gate: self })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop, including when the save fails or panics.
#[derive(Debug)]
pub struct SaveGuard<'a> {
    gate: &'a SaveGate,
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

// =============================================================================
// EDITOR
// =============================================================================

/// A report being composed: the draft plus the id it was last saved under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportEditor {
    report_id: Option<RecordId>,
    draft: ReportDraft,
}

impl ReportEditor {
    /// Start a new report covering `date`.
    #[must_use]
    pub fn new_for_day(date: NaiveDate) -> Self {
        Self {
            report_id: None,
            draft: ReportDraft::for_day(date),
        }
    }

    /// Continue editing a stored report.
    #[must_use]
    pub fn from_report(report: &Report) -> Self {
        Self {
            report_id: Some(report.id.clone()),
            draft: ReportDraft::from(report),
        }
    }

    #[must_use]
    pub fn report_id(&self) -> Option<&RecordId> {
        self.report_id.as_ref()
    }

    #[must_use]
    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    /// Remember the id assigned by the first successful save.
    pub fn mark_saved(&mut self, report: &Report) {
        self.report_id = Some(report.id.clone());
    }

    pub fn select_domain(&mut self, catalog: &ConfigGraph, id: Option<RecordId>) {
        let s = &mut self.draft.selection;
        s.brand_id = None;
        s.model_id = None;
        s.baseline_id = None;
        if let Some(domain) = &id {
            self.draft.content.retain(|entry| {
                catalog
                    .find(Level::Module, &entry.module_id)
                    .is_some_and(|m| m.refs.references(Level::Domain, domain))
            });
        }
        self.draft.selection.domain_id = id;
    }

    pub fn select_brand(&mut self, id: Option<RecordId>) {
        let s = &mut self.draft.selection;
        s.brand_id = id;
        s.model_id = None;
        s.baseline_id = None;
    }

    pub fn select_model(&mut self, id: Option<RecordId>) {
        let s = &mut self.draft.selection;
        s.model_id = id;
        s.baseline_id = None;
    }

    pub fn select_baseline(&mut self, id: Option<RecordId>) {
        self.draft.selection.baseline_id = id;
    }

    /// Single-day reports: start and end move together.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.draft.start_date = Some(date);
        self.draft.end_date = Some(date);
    }

    pub fn set_period(&mut self, start: NaiveDate, end: NaiveDate) {
        self.draft.start_date = Some(start);
        self.draft.end_date = Some(end);
    }

    /// Set the work text for a module, adding the entry if needed.
    pub fn set_work(&mut self, module_id: RecordId, text: impl Into<String>) {
        let text = text.into();
        match self
            .draft
            .content
            .iter_mut()
            .find(|e| e.module_id == module_id)
        {
            Some(entry) => entry.work_content = text,
            None => self.draft.content.push(ContentEntry {
                module_id,
                work_content: text,
            }),
        }
    }

    /// Append to a module's work text on a new line.
    pub fn append_work(&mut self, module_id: RecordId, line: &str) {
        let current = self
            .draft
            .content
            .iter()
            .find(|e| e.module_id == module_id)
            .map(|e| e.work_content.clone())
            .unwrap_or_default();
        let text = if current.is_empty() {
            line.to_string()
        } else {
            format!("{current}\n{line}")
        };
        self.set_work(module_id, text);
    }

    pub fn remove_module(&mut self, module_id: &RecordId) {
        self.draft.content.retain(|e| &e.module_id != module_id);
    }

    /// Why an autosave tick would skip this draft, if it would.
    #[must_use]
    pub fn autosave_check(&self) -> Option<SkipReason> {
        (!self.draft.is_autosave_ready()).then_some(SkipReason::Incomplete)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config_graph::{NodeData, NodeRefs};
    use crate::{Identity, Role};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()
    }

    #[test]
    fn gate_is_single_flight() {
        let gate = SaveGate::new();
        let guard = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());
        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn selection_cascade_clears_lower_levels() {
        let mut editor = ReportEditor::new_for_day(day());
        editor.select_domain(&ConfigGraph::new(), Some(RecordId::new("d")));
        editor.select_brand(Some(RecordId::new("b")));
        editor.select_model(Some(RecordId::new("m")));
        editor.select_baseline(Some(RecordId::new("bl")));
        assert!(editor.draft().selection.is_complete());

        editor.select_brand(Some(RecordId::new("b2")));
        let s = &editor.draft().selection;
        assert_eq!(s.domain_id, Some(RecordId::new("d")));
        assert!(s.model_id.is_none());
        assert!(s.baseline_id.is_none());
    }

    #[test]
    fn domain_change_drops_inapplicable_modules() {
        let admin = Identity {
            user_id: RecordId::new("a"),
            username: "a".to_string(),
            name: "A".to_string(),
            role: Role::Admin,
        };
        let mut catalog = ConfigGraph::new();
        let phones = catalog
            .add_node(&admin, Level::Domain, NodeData::named("Phones"))
            .unwrap()
            .id;
        let watches = catalog
            .add_node(&admin, Level::Domain, NodeData::named("Watches"))
            .unwrap()
            .id;
        let camera = catalog
            .add_node(
                &admin,
                Level::Module,
                NodeData::named("Camera").with_refs(NodeRefs {
                    domain_ids: [phones.clone()].into_iter().collect(),
                    ..NodeRefs::default()
                }),
            )
            .unwrap()
            .id;

        let mut editor = ReportEditor::new_for_day(day());
        editor.select_domain(&catalog, Some(phones.clone()));
        editor.set_work(camera.clone(), "calibration");
        editor.select_domain(&catalog, Some(phones));
        assert_eq!(editor.draft().content.len(), 1);
        editor.select_domain(&catalog, Some(watches));
        assert!(editor.draft().content.is_empty());
    }

    #[test]
    fn work_text_is_upserted_and_appended() {
        let mut editor = ReportEditor::new_for_day(day());
        let m = RecordId::new("m");
        editor.append_work(m.clone(), "first");
        editor.append_work(m.clone(), "second");
        assert_eq!(editor.draft().content.len(), 1);
        assert_eq!(editor.draft().content[0].work_content, "first\nsecond");
        editor.set_work(m.clone(), "replaced");
        assert_eq!(editor.draft().content[0].work_content, "replaced");
        editor.remove_module(&m);
        assert!(editor.draft().content.is_empty());
    }

    #[test]
    fn autosave_check_reports_incomplete_drafts() {
        let mut editor = ReportEditor::new_for_day(day());
        assert_eq!(editor.autosave_check(), Some(SkipReason::Incomplete));
        editor.select_domain(&ConfigGraph::new(), Some(RecordId::new("d")));
        editor.select_brand(Some(RecordId::new("b")));
        editor.select_model(Some(RecordId::new("m")));
        editor.select_baseline(Some(RecordId::new("bl")));
        assert_eq!(editor.autosave_check(), Some(SkipReason::Incomplete));
        editor.set_work(RecordId::new("mod"), "");
        assert_eq!(editor.autosave_check(), None);
    }
}
