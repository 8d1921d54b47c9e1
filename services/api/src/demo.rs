use crate::infra::seeded_back_office;
use chrono::{NaiveDate, TimeZone, Utc};
use clap::Args;
use edu_console::billing::{
    format_amount, BillingService, PaymentId, PaymentMethod, PaymentPlan, PaymentRecord,
    PaymentStatus,
};
use edu_console::config::AppConfig;
use edu_console::crm::{
    BulkOperation, FilterSpec, RosterViewState, SortColumn, StudentId, StudentRelationshipService,
    StudentStatus,
};
use edu_console::error::AppError;
use edu_console::export::ExportScope;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Directory receiving the invoice archive and roster export
    #[arg(long, default_value = "demo-output")]
    pub(crate) output_dir: PathBuf,
    /// First due date for the sample payment plan (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) plan_start: Option<NaiveDate>,
    /// Student whose profile service times out during the bulk tag step
    #[arg(long, default_value = "stu-003")]
    pub(crate) unreachable: String,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        output_dir,
        plan_start,
        unreachable,
    } = args;
    let config = AppConfig::load()?;

    let office = Arc::new(seeded_back_office().with_unreachable(&[unreachable.as_str()]));
    let students = StudentRelationshipService::new(
        office.clone(),
        office.clone(),
        office.clone(),
        office.clone(),
    );
    let billing = BillingService::new(
        office.clone(),
        office.clone(),
        &config.billing,
        config.issuer.clone(),
    )?;

    println!("Education console demo");

    let state = RosterViewState::default()
        .with_filters(FilterSpec {
            status: Some(StudentStatus::Active),
            ..FilterSpec::default()
        })
        .sort_by(SortColumn::TotalPaid)
        .sort_by(SortColumn::TotalPaid);
    let view = students.view(&state)?;
    println!("\nActive students by revenue");
    for entry in &view {
        println!(
            "- {:<16} {:<32} {:>14}  {} course(s)",
            entry.record.full_name,
            entry.record.email,
            format_amount(entry.total_paid, &config.billing.default_currency),
            entry.record.enrollments.len()
        );
    }

    let roster = students.roster()?;
    let state = state.select_all_visible(&roster);
    println!(
        "\nSelected {} visible student(s); tagging them as VIP",
        state.selection.len()
    );
    let completion = students
        .bulk(
            state,
            BulkOperation::Tag {
                name: "VIP".to_string(),
                color: "#3B82F6".to_string(),
            },
        )
        .await?;
    print_bulk(&completion.result);
    println!(
        "  Selection after dispatch: {} id(s)",
        completion.state.selection.len()
    );

    let reminder = ["stu-001", "stu-005"]
        .into_iter()
        .fold(RosterViewState::default(), |state, id| {
            state.toggle_selection(StudentId(id.to_string()))
        });
    let mailed = students
        .bulk(
            reminder,
            BulkOperation::Email {
                subject: "Your next module starts Monday".to_string(),
                body: "See the course page for the schedule.".to_string(),
            },
        )
        .await?;
    print_bulk(&mailed.result);
    for email in office.outbox() {
        println!("  queued '{}' for {}", email.subject, email.to);
    }

    record_sample_payment(&billing)?;

    let plan_start = plan_start.unwrap_or_else(|| Utc::now().date_naive());
    let plan = PaymentPlan::new(
        120_001,
        config.billing.default_currency.clone(),
        4,
        plan_start,
    )?;
    println!("\nPayment plan: {}", plan.summary());
    for installment in &plan.installments {
        println!(
            "  #{} due {}  {}",
            installment.sequence,
            installment.due_on,
            format_amount(installment.amount, &plan.currency)
        );
    }

    println!("\nReconciliation");
    let ids: Vec<StudentId> = roster.entries().iter().map(|entry| entry.id().clone()).collect();
    for pass in 1..=2 {
        let mut created = 0;
        let mut failed = 0;
        for id in &ids {
            let report = billing.reconcile_student(id)?;
            created += report.created.len();
            failed += report.failed.len();
        }
        println!("  pass {pass}: {created} invoice(s) created, {failed} failed");
    }

    let ana = StudentId("stu-001".to_string());
    let summary = billing.financial_summary(&ana)?;
    println!(
        "\nFinancials for {}: paid {}, pending {}, {} invoice(s), {} uninvoiced",
        ana,
        format_amount(summary.total_paid, &summary.currency),
        format_amount(summary.pending, &summary.currency),
        summary.invoice_count,
        summary.uninvoiced_payments
    );

    std::fs::create_dir_all(&output_dir)?;
    let batch = billing.invoice_archive_for(&ids)?;
    let archive_path = output_dir.join("invoices.zip");
    std::fs::write(&archive_path, &batch.archive)?;
    println!(
        "\nWrote {} invoice(s) to {}",
        batch.included.len(),
        archive_path.display()
    );
    for failure in &batch.failures {
        println!("  skipped {}: {}", failure.invoice_number, failure.reason);
    }

    let columns: Vec<String> = ["full_name", "email", "status", "total_paid", "tags"]
        .iter()
        .map(|column| column.to_string())
        .collect();
    let csv = students.export_csv(&RosterViewState::default(), ExportScope::All, &columns)?;
    let csv_path = output_dir.join("students.csv");
    std::fs::write(&csv_path, csv)?;
    println!("Wrote roster export to {}", csv_path.display());

    Ok(())
}

fn print_bulk(result: &edu_console::crm::BulkOperationResult) {
    println!(
        "  {}: attempted {}, succeeded {} ({} unchanged), failed {}",
        result.operation, result.attempted, result.succeeded, result.unchanged, result.failed
    );
    for error in &result.errors {
        println!("  ! {}: {}", error.student_id, error.message);
    }
}

fn record_sample_payment(billing: &BillingService) -> Result<(), AppError> {
    let payment = PaymentRecord {
        id: PaymentId("pay-2001".to_string()),
        student_id: StudentId("stu-006".to_string()),
        amount: 38_000,
        currency: "EUR".to_string(),
        method: PaymentMethod::Card,
        status: PaymentStatus::Completed,
        created_at: Utc
            .with_ymd_and_hms(2026, 4, 1, 11, 0, 0)
            .single()
            .unwrap_or_default(),
    };
    let stored = billing.record_payment(payment)?;
    println!(
        "\nRecorded payment {} of {} for {}",
        stored.id,
        format_amount(stored.amount, &stored.currency),
        stored.student_id
    );
    Ok(())
}
