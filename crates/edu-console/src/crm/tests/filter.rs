use super::common::*;
use crate::crm::domain::{EnrollmentStatus, FormationType, StudentStatus};
use crate::crm::filter::{evaluate, FilterSpec, SortColumn, SortDirection, SortSpec};
use crate::crm::roster::{Roster, RosterEntry};

fn ids(view: &[&RosterEntry]) -> Vec<String> {
    view.iter().map(|entry| entry.id().0.clone()).collect()
}

#[test]
fn empty_filters_and_search_return_roster_order() {
    let roster = sample_roster();
    let view = evaluate(&roster, &FilterSpec::default(), "", None);
    assert_eq!(ids(&view), ["s1", "s2", "s3", "s4", "s5"]);
}

#[test]
fn status_filter_keeps_only_matching_students() {
    let roster = sample_roster();
    let filters = FilterSpec {
        status: Some(StudentStatus::Active),
        ..FilterSpec::default()
    };
    let view = evaluate(&roster, &filters, "", None);
    assert_eq!(ids(&view), ["s1", "s3", "s5"]);
}

#[test]
fn search_is_case_insensitive_across_name_email_and_phone() {
    let roster = sample_roster();

    assert_eq!(ids(&evaluate(&roster, &FilterSpec::default(), "CARLA", None)), ["s3"]);
    assert_eq!(
        ids(&evaluate(&roster, &FilterSpec::default(), "bruno.lima@", None)),
        ["s2"]
    );
    assert_eq!(ids(&evaluate(&roster, &FilterSpec::default(), "000 555", None)), ["s5"]);
    assert_eq!(evaluate(&roster, &FilterSpec::default(), "   ", None).len(), 5);
}

#[test]
fn date_range_is_inclusive_on_both_bounds() {
    let roster = sample_roster();
    let filters = FilterSpec {
        registered_from: Some(date(2026, 1, 15)),
        registered_to: Some(date(2026, 2, 20)),
        ..FilterSpec::default()
    };
    let view = evaluate(&roster, &filters, "", None);
    assert_eq!(ids(&view), ["s2", "s3", "s4"]);
}

#[test]
fn revenue_range_uses_completed_payments_only() {
    let roster = sample_roster();
    let filters = FilterSpec {
        min_total_paid: Some(30_000),
        max_total_paid: Some(30_000),
        ..FilterSpec::default()
    };
    // s1 also has a pending payment and s5 only a refund; neither counts.
    let view = evaluate(&roster, &filters, "", None);
    assert_eq!(ids(&view), ["s1", "s3"]);
}

#[test]
fn enrollment_filters_match_any_enrollment() {
    let roster = sample_roster();
    let filters = FilterSpec {
        enrollment_status: Some(EnrollmentStatus::Completed),
        ..FilterSpec::default()
    };
    assert_eq!(ids(&evaluate(&roster, &filters, "", None)), ["s3"]);

    let filters = FilterSpec {
        formation_type: Some(FormationType::InPerson),
        ..FilterSpec::default()
    };
    assert_eq!(ids(&evaluate(&roster, &filters, "", None)), ["s2"]);
}

#[test]
fn filters_and_search_combine_as_conjunction() {
    let roster = sample_roster();
    let filters = FilterSpec {
        status: Some(StudentStatus::Active),
        ..FilterSpec::default()
    };
    assert_eq!(ids(&evaluate(&roster, &filters, "bruno", None)), Vec::<String>::new());
    assert_eq!(ids(&evaluate(&roster, &filters, "costa", None)), ["s5"]);
}

#[test]
fn numeric_columns_sort_numerically() {
    let roster = sample_roster();
    let sort = SortSpec {
        column: SortColumn::TotalPaid,
        direction: SortDirection::Descending,
    };
    let view = evaluate(&roster, &FilterSpec::default(), "", Some(&sort));
    // 90000, then the two 30000 ties in roster order, then the zeros in roster order.
    assert_eq!(ids(&view), ["s4", "s1", "s3", "s2", "s5"]);
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let students = vec![
        student("a", "Same Name", StudentStatus::Active, date(2026, 1, 1)),
        student("b", "Other", StudentStatus::Active, date(2026, 1, 1)),
        student("c", "same name", StudentStatus::Active, date(2026, 1, 1)),
        student("d", "Same Name", StudentStatus::Active, date(2026, 1, 1)),
    ];
    let roster = Roster::assemble(students, &[]);

    let ascending = SortSpec::ascending(SortColumn::FullName);
    let view = evaluate(&roster, &FilterSpec::default(), "", Some(&ascending));
    assert_eq!(ids(&view), ["b", "a", "c", "d"]);

    let descending = SortSpec::select(Some(ascending), SortColumn::FullName);
    let view = evaluate(&roster, &FilterSpec::default(), "", Some(&descending));
    assert_eq!(ids(&view), ["a", "c", "d", "b"]);

    let by_date = SortSpec::ascending(SortColumn::RegisteredOn);
    let view = evaluate(&roster, &FilterSpec::default(), "", Some(&by_date));
    assert_eq!(ids(&view), ["a", "b", "c", "d"]);
}

#[test]
fn selecting_columns_toggles_or_resets_direction() {
    let first = SortSpec::select(None, SortColumn::Email);
    assert_eq!(first.direction, SortDirection::Ascending);

    let second = SortSpec::select(Some(first), SortColumn::Email);
    assert_eq!(second.direction, SortDirection::Descending);

    let third = SortSpec::select(Some(second), SortColumn::Email);
    assert_eq!(third.direction, SortDirection::Ascending);

    let other = SortSpec::select(Some(second), SortColumn::TotalPaid);
    assert_eq!(other, SortSpec::ascending(SortColumn::TotalPaid));
}

#[test]
fn evaluation_is_repeatable() {
    let roster = sample_roster();
    let filters = FilterSpec {
        status: Some(StudentStatus::Active),
        ..FilterSpec::default()
    };
    let sort = SortSpec::ascending(SortColumn::Email);
    let first = evaluate(&roster, &filters, "a", Some(&sort));
    let second = evaluate(&roster, &filters, "a", Some(&sort));
    assert_eq!(first, second);
}
