use crate::infra::build_mail_transport;
use clap::Args;
use intake::config::AppConfig;
use intake::error::AppError;
use intake::telemetry;
use intake::workflows::intake::{
    raw_submission_from_json, DispatchOutcome, SubmissionCategory, SubmissionOutcome,
    SubmissionService,
};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Submission category label (e.g. general_contact, auto_accident_wizard)
    #[arg(long)]
    pub(crate) category: String,
    /// JSON file containing an object of field names to values
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the outcome as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs {
        category,
        input,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let category = SubmissionCategory::new(category)?;
    let payload: Value = serde_json::from_slice(&std::fs::read(&input)?)?;
    let raw = raw_submission_from_json(payload)?;

    let transport = build_mail_transport(&config.mail, config.environment)?;
    let service = SubmissionService::from_config(&config.intake, &config.mail, transport);
    let outcome = service.process(&category, &raw).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        render_outcome(&outcome);
    }
    Ok(())
}

fn render_outcome(outcome: &SubmissionOutcome) {
    println!("Submission {} ({})", outcome.base_id, outcome.category.display_name());
    println!("State: {}", outcome.state.label());
    println!("Fields archived: {}", outcome.field_count);

    println!("\nArtifacts:");
    for artifact in &outcome.artifacts {
        let status = if artifact.written { "written" } else { "FAILED" };
        println!("  - {:<15} {:<7} {}", artifact.kind.label(), status, artifact.path.display());
        if let Some(error) = &artifact.error {
            println!("      {error}");
        }
    }

    println!("\nNotification: {}", outcome.subject);
    match &outcome.dispatch {
        DispatchOutcome::Sent {
            recipients,
            attachments,
        } => println!("  sent to {recipients} recipient(s) with {attachments} attachment(s)"),
        DispatchOutcome::Failed { error } => println!("  not sent: {error}"),
    }
}
