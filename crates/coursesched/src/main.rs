use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use coursesched::catalog::Catalog;
use coursesched::engine::{Schedule, ScheduleOrder, SearchError};
use coursesched::time::DailyTimePeriod;
use coursesched::{CourseId, EngineConfig, SchedulingSession};

/// What the user wants scheduled, by course code.
#[derive(Debug, Default, Deserialize)]
struct Request {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    extra: Vec<String>,
    /// Registrar-style periods such as "F 12:00PM-4:00PM"
    #[serde(default)]
    blocked: Vec<DailyTimePeriod>,
    #[serde(default)]
    blocked_sections: Vec<BlockedSection>,
    /// Courses to report "would it fit" hints for
    #[serde(default)]
    candidates: Vec<String>,
    #[serde(default)]
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockedSection {
    course: String,
    section: String,
}

/// Enumerate conflict-free course schedules from a catalog
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Catalog JSON file
    catalog: PathBuf,

    /// Request JSON file with courses, blocked times and candidates
    request: Option<PathBuf>,

    /// Engine config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Required course code such as "CSCI 1200", repeatable
    #[arg(long = "require", value_name = "CODE")]
    required: Vec<String>,

    /// Optional course code, repeatable
    #[arg(long, value_name = "CODE")]
    extra: Vec<String>,

    /// Course code to report a fit hint for, repeatable
    #[arg(long, value_name = "CODE")]
    candidate: Vec<String>,

    /// Sort order: minutes, days, gaps or load
    #[arg(long)]
    sort: Option<ScheduleOrder>,

    /// Number of schedules to print
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

impl Args {
    /// Reads the request file, if any, and appends the courses given on the command line.
    fn request(&self) -> Result<Request> {
        let mut request = match &self.request {
            Some(path) => serde_json::from_str(
                &std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read request {}", path.display()))?,
            )
            .context("failed to parse request")?,
            None => Request::default(),
        };
        request.required.extend(self.required.iter().cloned());
        request.extra.extend(self.extra.iter().cloned());
        request.candidates.extend(self.candidate.iter().cloned());
        if request.required.is_empty() && request.extra.is_empty() {
            bail!("no courses requested: pass a request file or --require/--extra");
        }
        Ok(request)
    }
}

fn resolve(catalog: &Catalog, code: &str) -> Result<CourseId> {
    catalog
        .lookup(code)
        .map(|course| course.id())
        .ok_or_else(|| anyhow!("unknown course {:?}", code))
}

fn apply_request(session: &mut SchedulingSession, request: &Request) -> Result<()> {
    let catalog = Arc::clone(session.catalog());
    let required = request
        .required
        .iter()
        .map(|code| resolve(&catalog, code))
        .collect::<Result<Vec<_>>>()?;
    let extra = request
        .extra
        .iter()
        .map(|code| resolve(&catalog, code))
        .collect::<Result<Vec<_>>>()?;
    session.set_selected_courses(&required, &extra)?;

    let grid = catalog.grid();
    let mut blocked = grid.new_week_mask();
    for period in &request.blocked {
        blocked.merge(&grid.week_mask_for(period));
    }
    session.set_blocked_time(blocked);

    let mut sections = HashSet::new();
    for entry in &request.blocked_sections {
        let course = catalog
            .course(resolve(&catalog, &entry.course)?)
            .ok_or_else(|| anyhow!("unknown course {:?}", entry.course))?;
        let section = course
            .sections()
            .iter()
            .find(|s| s.number().as_str() == entry.section)
            .ok_or_else(|| anyhow!("{} has no section {:?}", course.code(), entry.section))?;
        sections.insert(section.id());
    }
    session.set_blocked_sections(sections)?;
    Ok(())
}

fn print_schedule(catalog: &Catalog, index: usize, schedule: &Schedule) {
    let metrics = schedule.metrics();
    println!(
        "Schedule {}: {} class minutes over {} days",
        index + 1,
        metrics.class_minutes,
        metrics.class_days
    );

    for option in schedule.sections() {
        let code = catalog
            .course(option.course())
            .map(|course| course.code())
            .unwrap_or_else(|| option.course().to_string());
        let numbers: Vec<&str> = option
            .sections()
            .iter()
            .filter_map(|id| catalog.section(*id))
            .map(|section| section.number().as_str())
            .collect();
        println!("  {:<12} section {}", code, numbers.join(", "));
        for period in option.periods() {
            let kind = period.kind.as_deref().unwrap_or("");
            let location = period.location.as_deref().unwrap_or("");
            println!("      {:<4} {:<26} {}", kind, period.time.to_string(), location);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let catalog = Catalog::load_json(&args.catalog, config.grid())
        .with_context(|| format!("failed to load catalog {}", args.catalog.display()))?;
    let request = args.request()?;

    let order = match (args.sort, &request.sort) {
        (Some(order), _) => order,
        (None, Some(name)) => name.parse::<ScheduleOrder>().map_err(|e| anyhow!(e))?,
        (None, None) => ScheduleOrder::default(),
    };

    let mut session = SchedulingSession::new(Arc::new(catalog), config);
    apply_request(&mut session, &request)?;
    info!(
        selected = session.selected().len(),
        order = %order,
        "Generating schedules"
    );

    match session.generate_schedules() {
        Ok(schedules) if schedules.is_empty() => {
            println!("No schedules possible: every combination has a conflict.");
        }
        Ok(mut schedules) => {
            session.sort_schedules(&mut schedules, order);
            println!("{} schedules, sorted by {}", schedules.len(), order);
            for (index, schedule) in schedules.iter().take(args.limit).enumerate() {
                print_schedule(session.catalog(), index, schedule);
            }
            if schedules.len() > args.limit {
                println!("... {} more", schedules.len() - args.limit);
            }
        }
        Err(e @ (SearchError::TooManySchedules { .. } | SearchError::SearchTooLarge { .. })) => {
            println!("{}", e.user_message());
        }
        Err(e) => return Err(e.into()),
    }

    if !request.candidates.is_empty() {
        session.settled().await;
        println!();
        for code in &request.candidates {
            let candidate = resolve(session.catalog(), code)?;
            let fits = session.would_fit_any_schedule(candidate)?;
            let conflicts: Vec<String> = session
                .selected_conflicts(candidate)?
                .into_iter()
                .filter_map(|id| session.catalog().course(id).map(|c| c.code()))
                .collect();
            if conflicts.is_empty() {
                println!("{}: {}", code, if fits { "fits" } else { "does not fit" });
            } else {
                println!(
                    "{}: {} (always conflicts with {})",
                    code,
                    if fits { "fits" } else { "does not fit" },
                    conflicts.join(", ")
                );
            }
        }
    }

    Ok(())
}
