//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};
use strum::IntoEnumIterator;

use athletik_lib::{
    AppService, Athlete, Change, Dashboard, Exercise, NewAthlete, PlanBook, Resource, TodayUnit,
};
use cli::{AthleteCommands, Commands, ConfigCommands, PlanCommands, SettingsCommands, UnitCommands};

fn main() -> Result<()> {
    athletik_lib::logging::init();

    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;

    for degraded in &service.load_report.degraded {
        eprintln!(
            "Warning: {} ({}) could not be read and was replaced by an empty default: {}",
            degraded.resource,
            degraded.path.display(),
            degraded.reason
        );
    }

    let header_color = service.config.theme.header();

    match cli_args.command {
        Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        Commands::Dashboard { date } => {
            let dashboard = service.dashboard(date);
            print_dashboard(&dashboard, date);
        }
        Commands::Plan(command) => {
            run_plan_command(&mut service, command, header_color, export_csv)?;
        }
        Commands::Unit(command) => run_unit_command(&mut service, command)?,
        Commands::Today { date } => {
            let units = service.units_for_today(date);
            if export_csv {
                print_today_csv(&units, date)?;
            } else if units.is_empty() {
                println!("No units planned for {}.", date.format("%d.%m.%Y"));
            } else {
                print_today_table(&units, header_color);
            }
        }
        Commands::Athlete(command) => {
            run_athlete_command(&mut service, command, header_color, export_csv)?;
        }
        Commands::Settings(SettingsCommands::SetTrainer { name }) => {
            report(service.set_trainer_name(&name))?;
        }
        Commands::Config(command) => match command {
            ConfigCommands::Show => {
                let rendered = toml::to_string_pretty(&service.config)
                    .context("Failed to render config")?;
                println!("# {}", service.get_config_path().display());
                print!("{rendered}");
            }
            ConfigCommands::SetDataDir { dir } => {
                service
                    .set_data_dir(dir.clone())
                    .context("Failed to save config")?;
                println!(
                    "Data directory set to {}. It takes effect on the next run.",
                    dir.display()
                );
            }
            ConfigCommands::SetHeaderColor { color } => match service.set_header_color(&color) {
                Ok(parsed) => println!("Header color set to {parsed:?}."),
                Err(e) => bail!("Error setting header color: {e}"),
            },
        },
        Commands::Paths => {
            println!("Config:      {}", service.get_config_path().display());
            println!("Data dir:    {}", service.data_dir().display());
            for resource in Resource::iter() {
                println!("  {resource:<12} {}", service.paths.file(resource).display());
            }
        }
    }

    Ok(())
}

fn report(result: Result<Change, athletik_lib::Error>) -> Result<()> {
    match result {
        Ok(change) => {
            println!("{change}");
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

fn run_plan_command(
    service: &mut AppService,
    command: PlanCommands,
    header_color: Color,
    export_csv: bool,
) -> Result<()> {
    match command {
        PlanCommands::Create { name } => report(service.create_plan(&name)),
        PlanCommands::Activate { name } => report(service.set_plan_status(&name, true)),
        PlanCommands::Deactivate { name } => report(service.set_plan_status(&name, false)),
        PlanCommands::List => {
            if export_csv {
                return print_plan_list_csv(service.plans());
            }
            if service.plans().is_empty() {
                println!("No training plans yet. Create one with 'plan create <NAME>'.");
            } else {
                print_plan_list(service.plans(), header_color);
            }
            Ok(())
        }
        PlanCommands::Show { name } => {
            let plans = service.plans();
            let units = plans.units_by_date_desc(&name)?;
            if export_csv {
                return print_units_csv(&name, &units);
            }
            let status = if plans.status(&name) { "active" } else { "inactive" };
            println!("Plan '{name}' ({status})");
            if units.is_empty() {
                println!("No units yet. Add one with 'unit add {name} ...'.");
            } else {
                print_units_table(&units, header_color);
            }
            Ok(())
        }
    }
}

fn run_unit_command(service: &mut AppService, command: UnitCommands) -> Result<()> {
    match command {
        UnitCommands::Add {
            plan,
            date,
            focus,
            exercises,
        } => {
            let exercises = exercises.into_iter().map(Exercise::Detailed).collect();
            report(service.add_unit(&plan, &date, &focus, exercises))
        }
        UnitCommands::AddList {
            plan,
            date,
            focus,
            exercises,
        } => report(service.add_unit_from_list(&plan, &date, &focus, &exercises)),
        UnitCommands::Delete { plan, index } => report(service.delete_unit(&plan, index)),
    }
}

fn run_athlete_command(
    service: &mut AppService,
    command: AthleteCommands,
    header_color: Color,
    export_csv: bool,
) -> Result<()> {
    match command {
        AthleteCommands::Add {
            name,
            age,
            height,
            weight,
            team,
            sport,
        } => report(service.add_athlete(NewAthlete {
            name,
            age,
            height_cm: height,
            weight_kg: weight,
            team,
            sport,
        })),
        AthleteCommands::List => {
            let athletes: Vec<&Athlete> = service.athletes().iter().collect();
            if export_csv {
                print_athletes_csv(&athletes)
            } else if athletes.is_empty() {
                println!("No athletes yet.");
                Ok(())
            } else {
                print_athlete_table(&athletes, header_color);
                Ok(())
            }
        }
        AthleteCommands::Delete { indices } => report(service.remove_athletes(&indices)),
    }
}

fn print_dashboard(dashboard: &Dashboard, date: NaiveDate) {
    println!("Welcome, {}!", dashboard.trainer_name);
    println!();
    println!("Athletes:        {}", dashboard.athlete_count);
    println!(
        "Training plans:  {} ({} active)",
        dashboard.plan_count, dashboard.active_plan_count
    );
    println!();
    let label = if date == Local::now().date_naive() {
        "Today".to_string()
    } else {
        date.format("%d.%m.%Y").to_string()
    };
    if dashboard.today.is_empty() {
        println!("{label}: no unit planned.");
    } else {
        println!("{label}:");
        for unit in &dashboard.today {
            println!("  {}: {}", unit.plan, unit.focus);
        }
    }
}

fn print_plan_list(plans: &PlanBook, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Plan").fg(header_color),
            Cell::new("Status").fg(header_color),
            Cell::new("Units").fg(header_color),
            Cell::new("Latest").fg(header_color),
        ]);

    for (name, units) in plans.plans() {
        let latest = latest_unit_date(units)
            .map_or_else(|| "-".to_string(), |d| d.format("%d.%m.%Y").to_string());
        let status = if plans.status(name) {
            Cell::new("active").fg(Color::Green)
        } else {
            Cell::new("inactive").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(name),
            status,
            Cell::new(units.len().to_string()),
            Cell::new(latest),
        ]);
    }
    println!("{table}");
}

fn latest_unit_date(units: &[athletik_lib::Unit]) -> Option<NaiveDate> {
    units.iter().filter_map(|unit| unit.parsed_date()).max()
}

fn print_units_table(units: &[(usize, &athletik_lib::Unit)], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new("Date").fg(header_color),
            Cell::new("Focus").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);

    for (index, unit) in units {
        let recognized: Vec<&Exercise> =
            unit.exercises.iter().filter(|ex| ex.is_recognized()).collect();
        let exercises = if recognized.is_empty() {
            "No exercises recorded.".to_string()
        } else {
            recognized
                .iter()
                .enumerate()
                .map(|(i, ex)| format!("{}. {ex}", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let focus = if unit.focus.is_empty() {
            "No focus"
        } else {
            unit.focus.as_str()
        };
        table.add_row(vec![
            Cell::new(index.to_string()),
            Cell::new(unit.display_date()),
            Cell::new(focus),
            Cell::new(exercises),
        ]);
    }
    println!("{table}");
}

fn print_today_table(units: &[TodayUnit], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Plan").fg(header_color),
            Cell::new("#").fg(header_color),
            Cell::new("Focus").fg(header_color),
        ]);
    for unit in units {
        table.add_row(vec![
            Cell::new(&unit.plan),
            Cell::new(unit.index.to_string()),
            Cell::new(&unit.focus),
        ]);
    }
    println!("{table}");
}

fn print_athlete_table(athletes: &[&Athlete], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Age").fg(header_color),
            Cell::new("Height (cm)").fg(header_color),
            Cell::new("Weight (kg)").fg(header_color),
            Cell::new("Team").fg(header_color),
            Cell::new("Sport").fg(header_color),
        ]);
    for (index, athlete) in athletes.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index.to_string()),
            Cell::new(&athlete.name),
            Cell::new(athlete.age.to_string()),
            Cell::new(athlete.height_cm.to_string()),
            Cell::new(athlete.weight_kg.to_string()),
            Cell::new(&athlete.team),
            Cell::new(&athlete.sport),
        ]);
    }
    println!("{table}");
}

fn print_units_csv(plan: &str, units: &[(usize, &athletik_lib::Unit)]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "Plan",
        "Index",
        "Date",
        "Focus",
        "Exercise",
        "Sets",
        "Reps",
        "Intensity",
    ])?;
    for (index, unit) in units {
        let index = index.to_string();
        if !unit.exercises.iter().any(Exercise::is_recognized) {
            writer.write_record([
                plan,
                index.as_str(),
                unit.date.as_str(),
                unit.focus.as_str(),
                "",
                "",
                "",
                "",
            ])?;
        }
        for exercise in unit.exercises.iter().filter(|ex| ex.is_recognized()) {
            let (sets, reps, intensity) = match exercise {
                Exercise::Label(_) | Exercise::Unrecognized(_) => (String::new(), "", ""),
                Exercise::Detailed(detail) => (
                    detail.sets.map_or_else(String::new, |s| s.to_string()),
                    detail.reps.as_str(),
                    detail.intensity.as_str(),
                ),
            };
            writer.write_record([
                plan,
                index.as_str(),
                unit.date.as_str(),
                unit.focus.as_str(),
                exercise.name(),
                sets.as_str(),
                reps,
                intensity,
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_plan_list_csv(plans: &PlanBook) -> Result<()> {
    write_plan_list_csv(plans, io::stdout())
}

fn write_plan_list_csv<W: io::Write>(plans: &PlanBook, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Plan", "Status", "Units", "Latest"])?;
    for (name, units) in plans.plans() {
        let status = if plans.status(name) { "active" } else { "inactive" };
        let count = units.len().to_string();
        let latest = latest_unit_date(units)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writer.write_record([name, status, count.as_str(), latest.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_today_csv(units: &[TodayUnit], date: NaiveDate) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Date", "Plan", "Index", "Focus"])?;
    let date = date.format("%Y-%m-%d").to_string();
    for unit in units {
        let index = unit.index.to_string();
        writer.write_record([
            date.as_str(),
            unit.plan.as_str(),
            index.as_str(),
            unit.focus.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_athletes_csv(athletes: &[&Athlete]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(io::stdout());
    writer.write_record(athletik_lib::athlete::COLUMNS)?;
    for athlete in athletes {
        writer.serialize(athlete)?;
    }
    writer.flush()?;
    Ok(())
}
