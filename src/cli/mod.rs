pub mod dates;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use dates::{parse_or_today, parse_user_date, DateStyle};
use tracing::{level_filters::LevelFilter, warn};

use crate::{
    report::export_report,
    service::{AttendanceService, LoadStatus},
    storage::document_storage::JsonDocumentStorage,
    timetable::{
        csv::{read_csv_file, write_csv_file},
        extract::detect_batches,
        store::TimetableStore,
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, LOG_PREFIX},
        percentage::{Percentage, DEFAULT_THRESHOLD},
    },
};

#[derive(Parser, Debug)]
#[command(name = "BunkMeter", version, long_about = None)]
#[command(about = "Track class attendance and see how many classes you can still skip", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME/bunkmeter or $HOME/.local/state/bunkmeter"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(long, global = true, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Show, import or export the weekly timetable")]
    Timetable {
        #[command(subcommand)]
        command: TimetableCommand,
    },
    #[command(flatten)]
    Document(DocumentCommand),
}

/// Commands working on the attendance document.
#[derive(Subcommand, Debug)]
enum DocumentCommand {
    #[command(about = "Select your batch and build the subject list from the timetable")]
    Setup {
        #[arg(long, help = "Batch, for example B1/B3. See `bunkmeter batches`")]
        batch: String,
    },
    #[command(about = "List batches found in the timetable")]
    Batches,
    #[command(about = "Show or set the semester dates")]
    Semester {
        #[arg(help = "First day of the semester")]
        start: Option<String>,
        #[arg(help = "Last day of the semester")]
        end: Option<String>,
    },
    #[command(about = "Manage holiday periods excluded from elapsed time")]
    Holiday {
        #[command(subcommand)]
        command: HolidayCommand,
    },
    #[command(about = "Mark a subject, or every class of the day, absent")]
    Absent {
        #[arg(help = "Subject name. When omitted every class held that day is marked")]
        subject: Option<String>,
        #[arg(short, long, help = "Date of the absence. Defaults to today. Examples are \"yesterday\", \"last monday\", \"2025-03-14\"")]
        date: Option<String>,
    },
    #[command(about = "Remove a recorded absence")]
    Present {
        subject: String,
        #[arg(short, long, help = "Date of the absence. Defaults to today")]
        date: Option<String>,
    },
    #[command(about = "Manually override computed totals or attendance")]
    Override {
        #[command(subcommand)]
        command: OverrideCommand,
    },
    #[command(about = "Display attendance, status and safe skips for every subject")]
    Summary {
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, help = "Minimum attendance to stay above when counting safe skips")]
        threshold: Percentage,
    },
    #[command(about = "Export a plain-text attendance report")]
    Report {
        #[arg(long, help = "Directory to write the report into. Defaults to the current directory")]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum HolidayCommand {
    #[command(about = "Add a holiday period. A single date adds a one day holiday")]
    Add { start: String, end: Option<String> },
    #[command(about = "List holiday periods")]
    List,
    #[command(about = "Remove a holiday by its number in `holiday list`")]
    Remove { index: usize },
}

#[derive(Subcommand, Debug)]
enum OverrideCommand {
    #[command(about = "Set the number of classes held, absences still apply")]
    Total {
        subject: String,
        #[arg(allow_negative_numbers = true)]
        total: i64,
    },
    #[command(about = "Set attended and total classes, ignoring the timetable and absences")]
    Attendance {
        subject: String,
        #[arg(allow_negative_numbers = true)]
        attended: i64,
        #[arg(allow_negative_numbers = true)]
        total: i64,
    },
    #[command(about = "Remove the attendance override, or the total override with --total")]
    Clear {
        subject: String,
        #[arg(long)]
        total: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TimetableCommand {
    #[command(about = "Print the active timetable")]
    Show {
        #[arg(long, help = "Only print this day, e.g. monday")]
        day: Option<String>,
    },
    #[command(about = "Replace the timetable with a Day,Time,Subject CSV file")]
    Import { path: PathBuf },
    #[command(about = "Write the active timetable as CSV")]
    Export {
        #[arg(default_value = "my_timetable.csv")]
        path: PathBuf,
    },
    #[command(about = "Go back to the built-in timetable")]
    Reset,
}

type Service = AttendanceService<JsonDocumentStorage, DefaultClock>;

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(LOG_PREFIX, &dir, logging_level, args.log)?;

    let timetables = TimetableStore::in_dir(&dir);
    let command = match args.commands {
        Commands::Timetable { command } => {
            return process_timetable_command(command, &timetables).await
        }
        Commands::Document(command) => command,
    };

    let timetable = timetables.load_active().await;
    for day in timetable.missing_days() {
        warn!("Timetable has no entry for {day}");
    }
    let (mut service, status) =
        AttendanceService::open(JsonDocumentStorage::in_dir(&dir), DefaultClock, timetable).await;
    if let LoadStatus::Recovered(e) = status {
        eprintln!("Could not read saved data, starting fresh: {e}");
    }

    let style = args.date_style;
    let now = Local::now();
    match command {
        DocumentCommand::Setup { batch } => {
            let subjects = service.setup(&batch).await?;
            println!("Batch {batch} has {} subjects:", subjects.len());
            output::print_subjects(subjects);
            if service.state().semester_start.is_none() {
                println!("Next, set the semester dates: bunkmeter semester <start> [end]");
            }
        }
        DocumentCommand::Batches => {
            for batch in detect_batches(service.timetable()) {
                println!("{batch}");
            }
        }
        DocumentCommand::Semester { start, end } => {
            if let Some(start) = start {
                let start = parse_user_date(&start, now, style)?;
                let end = end.map(|v| parse_user_date(&v, now, style)).transpose()?;
                service.set_semester(start, end).await?;
            }
            let state = service.state();
            match state.semester_start {
                Some(start) => {
                    let end = state
                        .semester_end
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "open".into());
                    println!("Semester: {start} to {end}");
                    println!("Weeks elapsed: {}", service.weeks_elapsed());
                }
                None => println!("Semester dates are not set"),
            }
        }
        DocumentCommand::Holiday { command } => match command {
            HolidayCommand::Add { start, end } => {
                let start = parse_user_date(&start, now, style)?;
                let end = end
                    .map(|v| parse_user_date(&v, now, style))
                    .transpose()?
                    .unwrap_or(start);
                service.add_holiday(start, end).await?;
                output::print_holidays(&service.state().holidays);
            }
            HolidayCommand::List => output::print_holidays(&service.state().holidays),
            HolidayCommand::Remove { index } => {
                service.remove_holiday(index).await?;
                output::print_holidays(&service.state().holidays);
            }
        },
        DocumentCommand::Absent { subject, date } => {
            let date = parse_or_today(date.as_deref(), now, style)?;
            match subject {
                Some(subject) => {
                    if service.mark_absent(&subject, date).await? {
                        println!("Marked {subject} absent on {date}");
                    } else {
                        println!("{subject} was already marked absent on {date}");
                    }
                }
                None => {
                    let marked = service.mark_day_absent(date).await?;
                    if marked.is_empty() {
                        println!("Every class on {date} was already marked absent");
                    }
                    for subject in marked {
                        println!("Marked {subject} absent on {date}");
                    }
                }
            }
        }
        DocumentCommand::Present { subject, date } => {
            let date = parse_or_today(date.as_deref(), now, style)?;
            if service.mark_present(&subject, date).await? {
                println!("Removed absence of {subject} on {date}");
            } else {
                println!("{subject} had no absence on {date}");
            }
        }
        DocumentCommand::Override { command } => process_override_command(command, &mut service).await?,
        DocumentCommand::Summary { threshold } => {
            require_setup(&service)?;
            let overview = service.overview(threshold);
            output::print_overview(&overview, service.weeks_elapsed(), threshold);
        }
        DocumentCommand::Report { out } => {
            require_setup(&service)?;
            let out = match out {
                Some(out) => out,
                None => std::env::current_dir()?,
            };
            let path = write_report(&service, &out).await?;
            println!("Report exported to {}", path.display());
        }
    }
    Ok(())
}

fn require_setup(service: &Service) -> Result<()> {
    if !service.is_configured() {
        bail!(
            "Setup required: select your batch with `bunkmeter setup --batch <batch>` and set the \
             semester with `bunkmeter semester <start> [end]`"
        );
    }
    Ok(())
}

async fn write_report(service: &Service, out: &Path) -> Result<PathBuf> {
    let generated_at = DefaultClock.now();
    let overview = service.overview(DEFAULT_THRESHOLD);
    Ok(export_report(out, service.state(), &overview, generated_at).await?)
}

async fn process_override_command(command: OverrideCommand, service: &mut Service) -> Result<()> {
    match command {
        OverrideCommand::Total { subject, total } => {
            service.set_total_override(&subject, Some(total)).await?;
            println!("{subject}: total classes set to {total}");
        }
        OverrideCommand::Attendance {
            subject,
            attended,
            total,
        } => {
            service
                .set_attendance_override(&subject, attended, total)
                .await?;
            println!("Manual override applied for {subject}: {attended}/{total}");
        }
        OverrideCommand::Clear { subject, total } => {
            if total {
                service.set_total_override(&subject, None).await?;
                println!("{subject}: total classes follow the timetable again");
            } else if service.clear_attendance_override(&subject).await? {
                println!("{subject}: using calculated attendance again");
            } else {
                println!("No override exists for {subject}");
            }
        }
    }
    Ok(())
}

async fn process_timetable_command(
    command: TimetableCommand,
    store: &TimetableStore,
) -> Result<()> {
    match command {
        TimetableCommand::Show { day } => {
            let timetable = store.load_active().await;
            if !store.has_override().await {
                println!("Using the built-in timetable");
            }
            output::print_timetable(&timetable, day.as_deref());
        }
        TimetableCommand::Import { path } => {
            let import = read_csv_file(&path).await?;
            for skipped in &import.skipped {
                eprintln!("Skipped line {}: {}", skipped.line, skipped.reason);
            }
            store.save_override(&import.timetable).await?;
            println!(
                "Imported timetable with {} classes",
                import.timetable.occupied_cells()
            );
            println!("Run `bunkmeter setup --batch <batch>` to rebuild your subjects");
        }
        TimetableCommand::Export { path } => {
            write_csv_file(&path, &store.load_active().await).await?;
            println!("Timetable exported to {}", path.display());
        }
        TimetableCommand::Reset => {
            if store.reset().await? {
                println!("Timetable reset to default");
            } else {
                println!("Already using default timetable");
            }
        }
    }
    Ok(())
}
