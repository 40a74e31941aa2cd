use clap::{Parser, Subcommand};

use planpivot::{PivotFilters, PivotParams, PlanPivot, ReportPeriod};

#[derive(Parser)]
#[command(name = "planpivot", about = "Pivot reports over planned and logged work hours")]
struct Cli {
    /// Database path (default: ~/.planpivot/planpivot.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a pivot report
    Pivot {
        /// Period shorthand: 2025, 2025-Q2 or 2025-03
        #[arg(long, conflicts_with_all = ["year", "period_type", "period_value"])]
        period: Option<String>,
        /// Report year (default: current year)
        #[arg(long)]
        year: Option<String>,
        /// month, quarter or year
        #[arg(long)]
        period_type: Option<String>,
        /// Month (1-12) or quarter (1-4)
        #[arg(long)]
        period_value: Option<String>,
        /// Comma-separated: company,department,employee,process,measure,category
        #[arg(long, short = 'g')]
        group_by: Option<String>,
        /// month or quarter
        #[arg(long)]
        time_grain: Option<String>,
        /// hours, tasks, planned, cost or kpi
        #[arg(long, short = 'm')]
        metric: Option<String>,
        /// Filters as a JSON object, e.g. '{"company_id":["c1"]}'
        #[arg(long)]
        filters: Option<String>,
        /// Only these companies (repeatable)
        #[arg(long = "company")]
        companies: Vec<String>,
        /// Only these employees (repeatable)
        #[arg(long = "user")]
        users: Vec<String>,
        /// Only these measures (repeatable)
        #[arg(long = "measure")]
        measures: Vec<String>,
        /// Only these departments (repeatable)
        #[arg(long = "department")]
        departments: Vec<String>,
        /// Only these processes (repeatable)
        #[arg(long = "process")]
        processes: Vec<String>,
        /// Only these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Output as CSV
        #[arg(long, conflicts_with = "json")]
        csv: bool,
    },
    /// Import a planning dataset (JSON) into the warehouse
    Import {
        /// Path to the dataset file
        file: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show warehouse status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

/// Repeatable filter flags, merged into the `--filters` JSON.
struct FilterFlags {
    companies: Vec<String>,
    users: Vec<String>,
    measures: Vec<String>,
    departments: Vec<String>,
    processes: Vec<String>,
    categories: Vec<String>,
}

impl FilterFlags {
    fn is_empty(&self) -> bool {
        self.companies.is_empty()
            && self.users.is_empty()
            && self.measures.is_empty()
            && self.departments.is_empty()
            && self.processes.is_empty()
            && self.categories.is_empty()
    }

    fn merge_into(self, json: Option<String>) -> anyhow::Result<Option<String>> {
        if self.is_empty() {
            return Ok(json);
        }
        let mut filters: PivotFilters = match json {
            Some(ref raw) => serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Invalid --filters JSON: {e}"))?,
            None => PivotFilters::default(),
        };
        filters.company_id.extend(self.companies);
        filters.user_id.extend(self.users);
        filters.measure_id.extend(self.measures);
        filters.department_id.extend(self.departments);
        filters.process_id.extend(self.processes);
        filters.category.extend(self.categories);
        Ok(Some(serde_json::to_string(&filters)?))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => planpivot::Database::open_at(path).await?,
        None => planpivot::Database::open().await?,
    };
    let app = PlanPivot::new(db);

    match cli.command {
        Commands::Pivot {
            period,
            year,
            period_type,
            period_value,
            group_by,
            time_grain,
            metric,
            filters,
            companies,
            users,
            measures,
            departments,
            processes,
            categories,
            json,
            csv,
        } => {
            let flags = FilterFlags {
                companies,
                users,
                measures,
                departments,
                processes,
                categories,
            };
            let mut params = PivotParams {
                year,
                period_type,
                period_value,
                group_by,
                time_grain,
                metric,
                filters: flags.merge_into(filters)?,
            };
            if let Some(p) = period {
                params = params.with_period(ReportPeriod::parse(&p)?);
            }
            handle_pivot(&app, &params, json, csv).await?;
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("Cannot read {file}: {e}"))?;
            let report = app.import_json(&content).await?;
            println!(
                "Imported {} plans into {} fact rows.",
                report.plans, report.facts
            );
            println!(
                "  Companies: {}  Departments: {}  Processes: {}  Measures: {}  Users: {}",
                report.companies, report.departments, report.processes, report.measures, report.users
            );
            if report.skipped_plans > 0 {
                println!("  {} plans had no companies and produced no rows", report.skipped_plans);
            }
        }
        Commands::Config { action } => {
            handle_config(&app, action).await?;
        }
        Commands::Status => {
            print_status(&app).await?;
        }
    }

    Ok(())
}

async fn handle_pivot(app: &PlanPivot, params: &PivotParams, json: bool, csv: bool) -> anyhow::Result<()> {
    let resp = app.pivot(params).await?;

    if json {
        println!("{}", planpivot::pivot::render::to_json(&resp)?);
    } else if csv {
        print!("{}", planpivot::pivot::render::to_csv(&resp));
    } else if resp.rows.is_empty() {
        println!("No data for {}.", period_label(&resp));
    } else {
        println!(
            "{} by {}, {}",
            resp.meta.metric.as_str(),
            resp.meta
                .group_by
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(" / "),
            period_label(&resp)
        );
        println!();
        print!("{}", planpivot::pivot::render::to_table(&resp));
        println!(
            "\n{} rows | {} h logged, {} h planned, {} tasks | {} companies, {} employees",
            resp.rows.len(),
            resp.stats.total_hours,
            resp.stats.planned_hours,
            resp.stats.total_tasks,
            resp.stats.companies_count,
            resp.stats.employees_count
        );
    }

    Ok(())
}

fn period_label(resp: &planpivot::PivotResponse) -> String {
    match resp.meta.period_value {
        Some(v) => format!("{} {} {v}", resp.meta.year, resp.meta.period_type.as_str()),
        None => resp.meta.year.to_string(),
    }
}

async fn handle_config(app: &PlanPivot, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match app.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            app.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = app.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn print_status(app: &PlanPivot) -> anyhow::Result<()> {
    let status = app.status().await?;
    println!("Warehouse Status");
    println!("  Companies:   {}", status.companies);
    println!("  Departments: {}", status.departments);
    println!("  Processes:   {}", status.processes);
    println!("  Measures:    {}", status.measures);
    println!("  Users:       {}", status.users);
    println!("  Plans:       {}", status.plans);
    println!("  Fact rows:   {}", status.facts);
    if status.years.is_empty() {
        println!("  Years:       none");
    } else {
        let years: Vec<String> = status.years.iter().map(|y| y.to_string()).collect();
        println!("  Years:       {}", years.join(", "));
    }
    Ok(())
}
