use std::fmt::Write;
use std::process::ExitCode;

use camino::Utf8Path;
use guard::{EmailGuard, Field, FieldOutcome, Form, FormId, FormStore, Outcome, RejectionRecord};
use miette::{Context, IntoDiagnostic, Result};
use tokio::fs;
use tracing::info;

pub async fn show_settings(guard: &EmailGuard) -> Result<()> {
    let cfg = guard.block_list().await?;
    println!("Free email domains: {}", cfg.domains_csv());
    println!("Rejection message:  {}", cfg.rejection_message);
    Ok(())
}

pub async fn save_settings(guard: &EmailGuard, domains: &str, message: &str) -> Result<()> {
    let cfg = guard.save_block_list(domains, message).await?;
    println!("Saved {} domain(s).", cfg.domains.len());
    Ok(())
}

async fn read_form(path: &Utf8Path) -> Result<Form> {
    let contents = fs::read_to_string(path)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path))?;
    Ok(Form::from_json(path.as_str(), &contents)?)
}

/// Stores a form definition exported by the host.
pub async fn import_form(forms: &dyn FormStore, path: &Utf8Path) -> Result<()> {
    let form = read_form(path).await?;
    forms.put_form(&form).await?;
    info!(form_id = %form.id, enabled = form.is_enabled(), "imported form");
    println!(
        "Imported form {} (email blocker {}).",
        form.id,
        if form.is_enabled() { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn show_form(guard: &EmailGuard, id: &FormId) -> Result<()> {
    let form = guard.form(id).await?;
    println!("Form {}", form.id);
    println!("  Block free email providers: {}", form.is_enabled());
    println!("  Fields: {}", form.fields.len());
    Ok(())
}

pub async fn toggle_form(guard: &EmailGuard, id: &FormId, enabled: bool) -> Result<()> {
    guard.set_form_enabled(id, enabled).await?;
    println!(
        "Email blocker {} for form {}.",
        if enabled { "enabled" } else { "disabled" },
        id
    );
    Ok(())
}

fn exit_status(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::Allow => 0,
        Outcome::Deny(_) => 1,
    }
}

fn submission_status(outcomes: &[FieldOutcome]) -> u8 {
    outcomes
        .iter()
        .map(|o| exit_status(&o.outcome))
        .max()
        .unwrap_or(0)
}

async fn check_outcome(guard: &EmailGuard, id: &FormId, email: &str) -> Result<Outcome> {
    let form = guard.form(id).await?;
    guard.validate_field(&form, &Field::email(email)).await
}

/// Runs one address through a stored form's email check.
pub async fn check(guard: &EmailGuard, id: &FormId, email: &str) -> Result<ExitCode> {
    let outcome = check_outcome(guard, id, email).await?;
    match &outcome {
        Outcome::Allow => println!("accepted"),
        Outcome::Deny(message) => println!("rejected: {}", message),
    }
    Ok(ExitCode::from(exit_status(&outcome)))
}

/// The submission carries the form id and the field values; the guard
/// settings always come from the stored form.
async fn evaluate_submission(guard: &EmailGuard, path: &Utf8Path) -> Result<(Form, Vec<FieldOutcome>)> {
    let submitted = read_form(path).await?;
    let mut form = guard.form(&submitted.id).await?;
    form.fields = submitted.fields;

    let outcomes = guard.validate_form(&form).await?;
    Ok((form, outcomes))
}

/// Validates a whole submission file.
pub async fn submit(guard: &EmailGuard, path: &Utf8Path) -> Result<ExitCode> {
    let (form, outcomes) = evaluate_submission(guard, path).await?;
    for field_outcome in &outcomes {
        if let Outcome::Deny(message) = &field_outcome.outcome {
            println!(
                "field {} ({}): {}",
                field_outcome.index, form.fields[field_outcome.index].value, message
            );
        }
    }
    let status = submission_status(&outcomes);
    if status == 0 {
        println!("accepted");
    }
    Ok(ExitCode::from(status))
}

pub async fn list_rejections(guard: &EmailGuard) -> Result<()> {
    let records = guard.rejections().await?;
    print!("{}", render_rejections(&records));
    Ok(())
}

const HEADERS: [&str; 3] = ["Email Address", "Time", "Form ID"];

pub fn render_rejections(records: &[RejectionRecord]) -> String {
    if records.is_empty() {
        return "No failed submissions found.\n".to_string();
    }

    let rows: Vec<[&str; 3]> = records
        .iter()
        .map(|r| [r.email.as_str(), r.time.as_str(), r.form_id.as_str()])
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&HEADERS).chain(&rows) {
        let line = format!(
            "{:<w0$}  {:<w1$}  {}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1]
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}
