use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, Local};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use calc_core::calculations::TaxTables;
use calc_core::calculations::calculator::calculate_logged;
use calc_core::db::{MemoryRepositoryFactory, RepositoryRegistry};
use calc_core::share::{self, ShareError};
use calc_core::{
    CalculatorInput, CalculatorKind, CalculatorRepository, CalculatorResult, NewSavedScenario,
    RepositoryError, SavedScenario,
};
use calc_db_sqlite::SqliteRepositoryFactory;

use crate::cli::{Command, InputDefaults, ScenarioCommand};
use crate::config::AppConfig;
use crate::render::{render_result, render_scenario_list, write_schedule_csv};

/// Every storage backend the binary can open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(MemoryRepositoryFactory));
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Built-in tables, overridden by every year the repository holds.
///
/// A year that fails to load keeps its built-in table (if any) and is
/// logged; the calculators stay usable with a partially seeded database.
pub async fn load_tax_tables(repo: &dyn CalculatorRepository) -> TaxTables {
    let mut tables = TaxTables::builtin();

    let years = match repo.list_tax_years().await {
        Ok(years) => years,
        Err(err) => {
            warn!(error = %err, "cannot list stored tax years, using built-in tables");
            return tables;
        }
    };

    for year in years {
        match TaxTables::load(repo, year).await {
            Ok(table) => {
                debug!(year, "using stored tax table");
                tables.insert(table);
            }
            Err(err) => warn!(year, error = %err, "ignoring stored tax table"),
        }
    }
    tables
}

/// Share link for `input`, or `None` when the input has no link form.
fn share_link(input: &CalculatorInput) -> Result<Option<String>> {
    match share::encode(input) {
        Ok(link) => Ok(Some(link)),
        Err(ShareError::Unsupported(what)) => {
            debug!(what, "no share link");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn with_extras(
    mut doc: Value,
    link: Option<&str>,
    scenario_id: Option<i64>,
) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("share_link".to_string(), json!(link));
        obj.insert("scenario_id".to_string(), json!(scenario_id));
    }
    doc
}

fn write_json(
    out: &mut dyn Write,
    doc: &Value,
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, doc)?;
    writeln!(out)?;
    Ok(())
}

fn write_share_line(
    out: &mut dyn Write,
    link: Option<&str>,
) -> Result<()> {
    match link {
        Some(link) => writeln!(out, "Share link: {link}")?,
        None => writeln!(out, "Share link: not available for this input")?,
    }
    Ok(())
}

/// One calculator run as requested on the command line.
struct Calculation<'a> {
    input: CalculatorInput,
    save: Option<String>,
    csv: Option<&'a Path>,
}

pub struct App {
    repo: Box<dyn CalculatorRepository>,
    tables: TaxTables,
    config: AppConfig,
}

impl App {
    /// Opens the configured backend and loads its tax tables.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        debug!(backend = %config.database.backend, "connecting");
        let repo = build_registry()
            .create(&config.database)
            .await
            .with_context(|| format!("cannot open '{}' storage", config.database.backend))?;
        Ok(Self::with_repository(repo, config).await)
    }

    pub async fn with_repository(
        repo: Box<dyn CalculatorRepository>,
        config: AppConfig,
    ) -> Self {
        let tables = load_tax_tables(&*repo).await;
        Self {
            repo,
            tables,
            config,
        }
    }

    pub fn tables(&self) -> &TaxTables {
        &self.tables
    }

    fn input_defaults(&self) -> InputDefaults {
        let today = Local::now().date_naive();
        InputDefaults {
            today,
            tax_year: self
                .config
                .default_tax_year
                .or_else(|| self.tables.latest_year())
                .unwrap_or_else(|| today.year()),
            schedule_mode: self.config.schedule_mode,
        }
    }

    /// Runs `command`, writing its report (or JSON when `json`) to `out`.
    pub async fn execute(
        &self,
        command: Command,
        json: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let defaults = self.input_defaults();

        match command {
            Command::Mortgage(args) => Calculation {
                input: args.to_input(&defaults),
                save: args.save.save.clone(),
                csv: args.csv.as_deref(),
            }
            .run(self, json, out)
            .await,
            Command::Extra(args) => Calculation {
                input: args.to_input(&defaults),
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Biweekly(args) => Calculation {
                input: args.to_input(&defaults),
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Tax(args) => Calculation {
                input: args.to_input(&defaults),
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Bmi(args) => Calculation {
                input: args.to_input(),
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Credit(args) => Calculation {
                input: args.to_input(),
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Typing(args) => Calculation {
                input: args.to_input()?,
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Invest(args) => Calculation {
                input: args.to_input(&defaults)?,
                save: args.save.save,
                csv: None,
            }
            .run(self, json, out)
            .await,
            Command::Open { link, save } => {
                let input = share::decode(&link).with_context(|| format!("cannot open link '{link}'"))?;
                info!(mode = input.kind().as_str(), "opened share link");
                Calculation {
                    input,
                    save: save.save,
                    csv: None,
                }
                .run(self, json, out)
                .await
            }
            Command::Scenario(command) => self.scenario(command, json, out).await,
        }
    }

    async fn save(
        &self,
        name: String,
        input: &CalculatorInput,
        result: &CalculatorResult,
    ) -> Result<SavedScenario> {
        let scenario = self
            .repo
            .create_scenario(NewSavedScenario {
                name,
                input: input.clone(),
                result: result.clone(),
            })
            .await
            .context("cannot save scenario")?;
        Ok(scenario)
    }

    async fn get_scenario(
        &self,
        id: i64,
    ) -> Result<SavedScenario> {
        self.repo.get_scenario(id).await.map_err(|err| match err {
            RepositoryError::NotFound => anyhow!("scenario {id} not found"),
            other => anyhow!(other).context(format!("cannot read scenario {id}")),
        })
    }

    async fn scenario(
        &self,
        command: ScenarioCommand,
        json: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        match command {
            ScenarioCommand::List { mode } => {
                let kind = mode
                    .as_deref()
                    .map(|m| {
                        CalculatorKind::parse(m).ok_or_else(|| {
                            let known: Vec<&str> = CalculatorKind::ALL.iter().map(|k| k.as_str()).collect();
                            anyhow!("unknown mode '{m}'; expected one of: {}", known.join(", "))
                        })
                    })
                    .transpose()?;

                let scenarios = self
                    .repo
                    .list_scenarios(kind)
                    .await
                    .context("cannot list scenarios")?;
                if json {
                    write_json(out, &serde_json::to_value(&scenarios)?)?;
                } else {
                    render_scenario_list(out, &scenarios)?;
                }
            }
            ScenarioCommand::Show { id } => {
                let scenario = self.get_scenario(id).await?;
                let link = share_link(&scenario.input)?;
                if json {
                    write_json(out, &with_extras(serde_json::to_value(&scenario)?, link.as_deref(), Some(id)))?;
                } else {
                    writeln!(
                        out,
                        "Scenario #{} \"{}\" ({}, saved {})",
                        scenario.id,
                        scenario.name,
                        scenario.kind.as_str(),
                        scenario.saved_at.format("%Y-%m-%d %H:%M UTC")
                    )?;
                    writeln!(out)?;
                    render_result(out, &scenario.result)?;
                    writeln!(out)?;
                    write_share_line(out, link.as_deref())?;
                }
            }
            ScenarioCommand::Delete { id } => {
                self.repo.delete_scenario(id).await.map_err(|err| match err {
                    RepositoryError::NotFound => anyhow!("scenario {id} not found"),
                    other => anyhow!(other).context(format!("cannot delete scenario {id}")),
                })?;
                if json {
                    write_json(out, &json!({ "deleted": id }))?;
                } else {
                    writeln!(out, "Deleted scenario #{id}.")?;
                }
            }
        }
        Ok(())
    }
}

impl Calculation<'_> {
    async fn run(
        self,
        app: &App,
        json: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let kind = self.input.kind();
        let result = calculate_logged(&self.input, &app.tables)
            .with_context(|| format!("{} calculation failed", kind.as_str()))?;
        let link = share_link(&self.input)?;

        if let Some(path) = self.csv {
            let CalculatorResult::Mortgage(mortgage) = &result else {
                bail!("CSV export is only available for mortgage schedules");
            };
            let file = File::create(path).with_context(|| format!("cannot create '{}'", path.display()))?;
            write_schedule_csv(BufWriter::new(file), &mortgage.schedule)
                .with_context(|| format!("cannot write schedule to '{}'", path.display()))?;
            info!(path = %path.display(), rows = mortgage.schedule.len(), "schedule exported");
        }

        let saved = match self.save {
            Some(name) => Some(app.save(name, &self.input, &result).await?),
            None => None,
        };

        if json {
            let doc = with_extras(serde_json::to_value(&result)?, link.as_deref(), saved.as_ref().map(|s| s.id));
            return write_json(out, &doc);
        }

        render_result(out, &result)?;
        writeln!(out)?;
        write_share_line(out, link.as_deref())?;
        if let Some(path) = self.csv {
            writeln!(out, "Schedule written to {}", path.display())?;
        }
        if let Some(scenario) = saved {
            writeln!(out, "Saved as scenario #{} \"{}\"", scenario.id, scenario.name)?;
        }
        Ok(())
    }
}
