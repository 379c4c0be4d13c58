use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retail_revenue_pipeline::{
    read_transactions, write_transactions, PipelineConfig, RevenuePipeline, SalesSummary,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retail-forecast", version, about = "Retail return reconciliation and revenue forecasting")]
struct Cli {
    /// JSON pipeline configuration; flags below override it
    #[arg(long, short, global = true, env = "RETAIL_FORECAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter outliers, reconcile returns and write the cleaned table
    Clean {
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Build the daily series and report next-month revenue
    Forecast {
        input: PathBuf,
        /// Input has already been through `clean`
        #[arg(long, conflicts_with = "cleaned_output")]
        cleaned: bool,
        /// Also write the cleaned table here
        #[arg(long)]
        cleaned_output: Option<PathBuf>,
        #[arg(long)]
        horizon: Option<usize>,
        #[arg(long)]
        confidence: Option<f64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Descriptive statistics for a transaction file
    Summary {
        input: PathBuf,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Clean { input, output } => {
            let table = read_transactions(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let result = RevenuePipeline::clean(&table.transactions, &config);
            write_transactions(&output, &result.cleaned)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{}", serde_json::to_string_pretty(&result.report)?);
        }

        Command::Forecast {
            input,
            cleaned,
            cleaned_output,
            horizon,
            confidence,
            json,
        } => {
            if horizon.is_some() {
                config.horizon_days = horizon;
            }
            if let Some(level) = confidence {
                config.confidence_level = level;
            }
            config.validate()?;

            let report = if cleaned {
                let table = read_transactions(&input)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                let uncleaned = RevenuePipeline::uncleaned_count(&table.transactions, &config);
                if uncleaned > 0 {
                    warn!(
                        "{} rows in {} would be removed by `clean`; forecasting them as given",
                        uncleaned,
                        input.display()
                    );
                }
                let (_, _, report) = RevenuePipeline::forecast(&table.transactions, &config)?;
                report
            } else {
                config.input_path = Some(input);
                if cleaned_output.is_some() {
                    config.cleaned_output = cleaned_output;
                }
                let outcome = RevenuePipeline::run(&config)?;
                info!(
                    "Kept {} of {} returns",
                    outcome.reconciliation.returns_kept, outcome.reconciliation.returns_seen
                );
                outcome.report
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }

        Command::Summary { input, top } => {
            let table = read_transactions(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let summary = SalesSummary::from_transactions(&table.transactions, top);
            info!(
                "{} records, {} returns, {} customers",
                summary.records, summary.returns, summary.customers
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Schema => {
            println!("{}", PipelineConfig::schema_as_json()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaned_input_rejects_cleaned_output() {
        let result = Cli::try_parse_from([
            "retail-forecast",
            "forecast",
            "cleaned.csv",
            "--cleaned",
            "--cleaned-output",
            "again.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_forecast_flags_parse() {
        let cli = Cli::try_parse_from([
            "retail-forecast",
            "forecast",
            "raw.csv",
            "--cleaned-output",
            "cleaned.csv",
            "--horizon",
            "31",
        ])
        .unwrap();
        match cli.command {
            Command::Forecast {
                cleaned,
                cleaned_output,
                horizon,
                ..
            } => {
                assert!(!cleaned);
                assert_eq!(cleaned_output, Some(PathBuf::from("cleaned.csv")));
                assert_eq!(horizon, Some(31));
            }
            _ => panic!("expected the forecast subcommand"),
        }
    }
}
