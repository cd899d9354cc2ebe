//! # Property-Based Tests
//!
//! Invariants of the record engine checked with proptest.

use chrono::{Duration, Utc};
use proptest::collection::vec;
use proptest::prelude::*;
use weekly_core::{
    ConfigGraph, Identity, Paginator, QueryEngine, RecordId, Report, ReportFilter, ReportPatch,
    ReportStatus, ReportStore, Role, Selection, escape_csv_field, plan_upload,
};

// =============================================================================
// HELPERS
// =============================================================================

/// Split one CSV record (which may span lines) into fields.
fn parse_csv_record(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            (true, '"') => quoted = false,
            (false, '"') if field.is_empty() => quoted = true,
            (false, ',') => fields.push(std::mem::take(&mut field)),
            (_, c) => field.push(c),
        }
    }
    fields.push(field);
    fields
}

fn report(id: usize, owner: &str, offset_secs: i64) -> Report {
    let at = Utc::now() + Duration::seconds(offset_secs);
    Report {
        id: RecordId::new(format!("r{id}")),
        user_id: RecordId::new(owner),
        selection: Selection::default(),
        start_date: None,
        end_date: None,
        content: Vec::new(),
        status: ReportStatus::Draft,
        created_at: at,
        updated_at: at,
    }
}

fn identity(id: &str, role: Role) -> Identity {
    Identity {
        user_id: RecordId::new(id),
        username: id.to_string(),
        name: id.to_string(),
        role,
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Escaped fields joined with commas parse back to the original fields.
    #[test]
    fn csv_fields_roundtrip(fields in vec("[a-z ,\"\r\n]{0,12}", 1..8)) {
        let row: Vec<String> = fields.iter().map(|f| escape_csv_field(f).into_owned()).collect();
        let parsed = parse_csv_record(&row.join(","));
        prop_assert_eq!(parsed, fields);
    }

    /// Fields without special characters are written verbatim.
    #[test]
    fn plain_fields_are_not_quoted(field in "[a-zA-Z0-9 _-]{0,20}") {
        let escaped = escape_csv_field(&field);
        prop_assert_eq!(escaped.as_ref(), field.as_str());
    }

    /// updatedAt never decreases, even when the stored value is in the future.
    #[test]
    fn updated_at_is_monotonic(offset in -3600i64..3600, edits in 1usize..5) {
        let original = report(0, "amy", offset);
        let mut store = ReportStore::from_records(vec![original.clone()]).expect("store");
        let amy = identity("amy", Role::User);
        let mut previous = original.updated_at;
        for _ in 0..edits {
            let updated = store
                .update(&amy, &original.id, ReportPatch::default(), &ConfigGraph::new())
                .expect("update");
            prop_assert!(updated.updated_at >= previous);
            prop_assert_eq!(updated.created_at, original.created_at);
            previous = updated.updated_at;
        }
    }

    /// The pager never leaves its valid range whatever pages are requested.
    #[test]
    fn pager_stays_in_bounds(total in 0usize..200, requests in vec(0usize..30, 0..20)) {
        let mut pager = Paginator::new(total);
        for page in requests {
            pager.go_to_page(page);
            let pages = pager.total_pages();
            prop_assert!(pager.current_page() >= 1);
            prop_assert!(pager.current_page() <= pages.max(1));
            let range = pager.range();
            prop_assert!(range.end <= total);
            prop_assert!(range.len() <= 10);
            let window = pager.window();
            prop_assert!(window.clone().count() <= 5);
            if pages > 0 {
                prop_assert!(window.contains(&pager.current_page()));
            }
        }
    }

    /// After uploading the plan, planning again uploads nothing.
    #[test]
    fn push_plan_is_idempotent(
        local_offsets in vec(-100i64..100, 0..15),
        remote_offsets in vec(-100i64..100, 0..15),
    ) {
        let local: Vec<Report> = local_offsets
            .iter()
            .enumerate()
            .map(|(i, &o)| report(i, "amy", o))
            .collect();
        let mut remote: Vec<Report> = remote_offsets
            .iter()
            .enumerate()
            .map(|(i, &o)| report(i, "amy", o))
            .collect();

        let planned: Vec<Report> = plan_upload(&local, &remote).into_iter().cloned().collect();
        for record in planned {
            match remote.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record,
                None => remote.push(record),
            }
        }
        prop_assert!(plan_upload(&local, &remote).is_empty());
    }

    /// A non-admin only ever gets back its own reports.
    #[test]
    fn non_admin_queries_are_scoped(owners in vec(0usize..3, 0..30), asked in 0usize..3) {
        let names = ["amy", "bob", "cat"];
        let reports: Vec<Report> = owners
            .iter()
            .enumerate()
            .map(|(i, &o)| report(i, names[o], 0))
            .collect();
        let store = ReportStore::from_records(reports).expect("store");
        let bob = identity("bob", Role::User);
        let filter = ReportFilter {
            user_id: Some(RecordId::new(names[asked])),
            ..ReportFilter::default()
        };
        let hits = QueryEngine::run(&store, &bob, &filter);
        prop_assert!(hits.iter().all(|r| r.user_id.as_str() == "bob"));
        prop_assert_eq!(hits.len(), owners.iter().filter(|&&o| o == 1).count());
    }
}
