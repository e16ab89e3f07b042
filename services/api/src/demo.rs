use crate::infra::{
    load_snapshot, resolve_export_format, seed_demo_store, LoggingNotifier, DEMO_CYCLE,
    DEMO_INTERN_CYCLE, DEMO_JOB_CORE, DEMO_JOB_PLATFORM, DEMO_JOB_QUANT,
};
use clap::Args;
use placement_engine::config::EngineConfig;
use placement_engine::error::AppError;
use placement_engine::placement::records::fetch_all;
use placement_engine::placement::{
    ApplicationStatus, Compensation, CycleStatistics, EligibilityConfig, EligibilityRule,
    ExportFormat, NewJob, PlacedScope, PlacementEngine, PlacementError, ReportFilters,
    ReportStatus, ReportView, Student,
};
use placement_engine::store::{Filter, MemoryStore};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type DemoEngine = PlacementEngine<MemoryStore, LoggingNotifier>;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Report type (placement_summary, student_placement_status, company_wise_recruitment,
    /// branch_wise_statistics, ctc_analysis, job_applicants)
    pub(crate) report_type: String,
    /// JSON snapshot of the collections (defaults to the demo seed)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Restrict to one placement cycle
    #[arg(long)]
    pub(crate) cycle: Option<String>,
    /// Restrict to one job (required for job_applicants)
    #[arg(long)]
    pub(crate) job: Option<String>,
    /// Restrict to these branches (repeatable)
    #[arg(long = "branch")]
    pub(crate) branches: Vec<String>,
    /// Restrict to these companies (repeatable)
    #[arg(long = "company")]
    pub(crate) companies: Vec<String>,
    /// Restrict to these application statuses (repeatable)
    #[arg(long = "status")]
    pub(crate) statuses: Vec<String>,
    /// Restrict to these students (repeatable)
    #[arg(long = "student")]
    pub(crate) students: Vec<String>,
    /// Lower package bound in LPA
    #[arg(long)]
    pub(crate) min_package: Option<f64>,
    /// Upper package bound in LPA
    #[arg(long)]
    pub(crate) max_package: Option<f64>,
    /// Export format (csv or excel); inferred from --output when omitted
    #[arg(long)]
    pub(crate) format: Option<String>,
    /// Write the export here instead of printing CSV to stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

impl ReportArgs {
    fn filters(&self) -> ReportFilters {
        ReportFilters {
            cycle_id: self.cycle.clone(),
            job_id: self.job.clone(),
            branches: self.branches.clone(),
            companies: self.companies.clone(),
            status: self.statuses.clone(),
            min_package: self.min_package,
            max_package: self.max_package,
            student_ids: self.students.clone(),
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Only count selections from the same cycle when applying the placed rule
    #[arg(long)]
    pub(crate) same_cycle: bool,
    /// Directory to write report exports into
    #[arg(long)]
    pub(crate) export_dir: Option<PathBuf>,
    /// Skip the cascading delete at the end of the walkthrough
    #[arg(long)]
    pub(crate) keep_data: bool,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let format = resolve_export_format(args.format.as_deref(), args.output.as_deref())
        .map_err(PlacementError::Validation)?;
    if format == ExportFormat::Excel && args.output.is_none() {
        return Err(PlacementError::Validation(
            "excel exports need an --output path".to_string(),
        )
        .into());
    }

    let store = match &args.data {
        Some(path) => load_snapshot(path)?,
        None => seed_demo_store()?,
    };
    let engine = engine(store, EngineConfig::default());

    let report_id = engine.generate_report(&args.report_type, args.filters())?;
    let view = engine.get_report(report_id.as_str())?;
    if view.status == ReportStatus::Error {
        eprintln!(
            "report {} failed: {}",
            view.id,
            view.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    let exported = engine.export_report(report_id.as_str(), format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &exported.bytes)?;
            eprintln!(
                "wrote {} rows to {} ({})",
                view.row_count,
                path.display(),
                exported.content_type
            );
        }
        None => std::io::stdout().write_all(&exported.bytes)?,
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        same_cycle,
        export_dir,
        keep_data,
    } = args;

    let placed_scope = if same_cycle {
        PlacedScope::SameCycle
    } else {
        PlacedScope::AllTime
    };
    let store = seed_demo_store()?;
    let notifier = LoggingNotifier::default();
    let engine = PlacementEngine::new(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        EngineConfig {
            eligibility: EligibilityConfig { placed_scope },
        },
    );
    let students: Vec<Student> = fetch_all(&store, &Filter::all()).map_err(PlacementError::from)?;

    println!("Placement engine demo (placed rule: {placed_scope:?})");
    println!("\nEligibility for the 2025 placement cycle");
    for (label, job_id) in [
        ("Northwind / Platform Engineer", DEMO_JOB_PLATFORM),
        ("Helix Capital / Quant Analyst", DEMO_JOB_QUANT),
        ("Tatva Motors / Graduate Engineer", DEMO_JOB_CORE),
    ] {
        println!("- {label}");
        for student in &students {
            let decision = engine.explain_eligibility(job_id, student.id.as_str())?;
            println!("    {:<16} {}", student.name, decision.summary());
        }
    }

    println!("\nPosting a new job");
    let job = engine.post_job(NewJob {
        cycle_id: Some(DEMO_CYCLE.to_string()),
        company: "Orbit Labs".to_string(),
        role: "Data Engineer".to_string(),
        compensation: Some(Compensation::salary(12.5)),
        eligibility: EligibilityRule {
            min_cgpa: 7.5,
            branches: vec!["CSE".to_string(), "IT".to_string(), "ECE".to_string()],
            ..EligibilityRule::default()
        },
        deadline: None,
    })?;
    let announced = notifier
        .sent()
        .iter()
        .filter(|notification| notification.template == "job_posted")
        .map(|notification| notification.recipients.len())
        .sum::<usize>();
    println!(
        "- {} / {} ({}) announced to {announced} eligible students",
        job.company,
        job.role,
        job.compensation_label.as_deref().unwrap_or("undisclosed")
    );

    for student in &students {
        match engine.apply(job.id.as_str(), student.id.as_str()) {
            Ok(application) => {
                println!("    {:<16} applied ({})", student.name, application.id);
                if student.branch == "IT" {
                    engine.update_status(
                        application.id.as_str(),
                        ApplicationStatus::Selected,
                        Some("Offer".to_string()),
                    )?;
                    println!("    {:<16} selected", student.name);
                }
            }
            Err(err) => println!("    {:<16} not applied: {err}", student.name),
        }
    }

    println!("\nCycle statistics");
    render_statistics(&engine.compute_cycle_statistics(DEMO_CYCLE)?);

    let cycle_filters = ReportFilters {
        cycle_id: Some(DEMO_CYCLE.to_string()),
        ..ReportFilters::default()
    };
    for report_type in ["ctc_analysis", "branch_wise_statistics", "student_placement_status"] {
        let report_id = engine.generate_report(report_type, cycle_filters.clone())?;
        let view = engine.get_report(report_id.as_str())?;
        render_report(&view);

        if let Some(dir) = &export_dir {
            write_export(&engine, &view, dir)?;
        }
    }

    if keep_data {
        return Ok(());
    }

    println!("\nCleaning up the internship cycle");
    let summary = engine.delete_cycle(DEMO_INTERN_CYCLE)?;
    println!(
        "- removed {} cycle, {} jobs, {} applications",
        summary.cycles_deleted, summary.jobs_deleted, summary.applications_deleted
    );
    let rerun = engine.delete_cycle(DEMO_INTERN_CYCLE)?;
    println!(
        "- re-running removes {} more applications",
        rerun.applications_deleted
    );

    Ok(())
}

fn engine(store: MemoryStore, config: EngineConfig) -> DemoEngine {
    PlacementEngine::new(Arc::new(store), Arc::new(LoggingNotifier::default()), config)
}

fn render_statistics(statistics: &CycleStatistics) {
    println!(
        "- {} jobs from {} companies | {} applications from {} students",
        statistics.total_jobs,
        statistics.total_companies,
        statistics.total_applications,
        statistics.total_students_applied
    );
    println!(
        "- {} selected ({} male / {} female) | {:.2}% placed",
        statistics.total_selected,
        statistics.male_selected,
        statistics.female_selected,
        statistics.placement_percentage
    );
    println!(
        "- highest {} | average {}",
        package(statistics.highest_package),
        package(statistics.average_package)
    );
    for branch in &statistics.branch_statistics {
        println!(
            "    {:<6} {} applied, {} selected ({:.2}%)",
            branch.branch, branch.applied, branch.selected, branch.placement_percentage
        );
    }
}

fn render_report(view: &ReportView) {
    println!(
        "\nReport {} [{}] {}",
        view.report_type,
        view.status.label(),
        view.id
    );
    if let Some(message) = &view.error_message {
        println!("  error: {message}");
        return;
    }
    let Some(data) = &view.data else {
        return;
    };
    for section in &data.sections {
        println!("  {} ({} rows)", section.name, section.rows.len());
        for row in &section.rows {
            let cells: Vec<String> = row.values().map(cell).collect();
            println!("    {}", cells.join(" | "));
        }
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn package(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |lpa| format!("{lpa:.2} LPA"))
}

fn write_export(engine: &DemoEngine, view: &ReportView, dir: &Path) -> Result<(), AppError> {
    if view.status != ReportStatus::Completed {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    for format in [ExportFormat::Csv, ExportFormat::Excel] {
        let exported = engine.export_report(view.id.as_str(), format)?;
        let path = dir.join(&exported.filename);
        std::fs::write(&path, &exported.bytes)?;
        println!("  exported {}", path.display());
    }
    Ok(())
}
