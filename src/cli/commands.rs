use crate::cli::args::{Cli, Commands};
use crate::error::{ProcessingError, Result};
use crate::processors::{Coordinator, GeneratorConfig, MeasurementVerifier};
use crate::readers::StationReader;
use crate::sampling::SamplingStrategy;
use crate::utils::filename::{
    discover_dataset_tags, format_row_count, measurements_path, results_path,
};
use crate::utils::progress::ProgressReporter;
use crate::utils::settings::Settings;
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;

const DEFAULT_ROWS: u64 = 1_000_000_000;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Generate {
            rows,
            workers,
            catalog,
            output,
            results,
            no_results,
            seed,
            batch_size,
            pool_size,
            sampling,
        } => {
            let rows = rows.unwrap_or(DEFAULT_ROWS);
            let tag = format_row_count(rows);
            let strategy: SamplingStrategy = sampling.parse()?;

            let output = output.unwrap_or_else(|| measurements_path(&settings.data_dir, &tag));
            let results = if no_results {
                None
            } else {
                Some(results.unwrap_or_else(|| results_path(&settings.results_dir, &tag)))
            };
            let catalog_path = catalog.unwrap_or_else(|| settings.catalog.clone());

            let catalog = StationReader::new().read_catalog(&catalog_path)?;

            if !quiet {
                println!("Generating {} rows ({})...", rows, tag);
                println!("Stations: {} from {}", catalog.len(), catalog_path.display());
                println!("Output file: {}", output.display());
                println!("Workers: {}, Sampling: {}", workers, strategy);
            }

            let config = GeneratorConfig::new(rows, workers, output)
                .with_results_path(results)
                .with_batch_size(batch_size.unwrap_or(settings.batch_size))
                .with_pool_size(pool_size.unwrap_or(settings.pool_size))
                .with_strategy(strategy)
                .with_seed(seed)
                .with_monitor_threshold(settings.monitor_threshold)
                .with_poll_interval(Duration::from_millis(settings.poll_interval_ms))
                .with_copy_buffer_size(settings.copy_buffer_bytes);

            let coordinator = Coordinator::new(config, &catalog)?;

            let progress = ProgressReporter::new(rows, "Generating rows...", quiet);
            let generated = coordinator.run(Some(&progress)).await?;
            progress.finish_with_message(&format!("Generated {} rows", generated.rows));

            if !quiet {
                println!("\n{}", generated.summary());
            }

            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify {
            size,
            all,
            tolerance,
            workers,
        } => {
            let tags = if all {
                discover_dataset_tags(&settings.data_dir)?
            } else {
                size.map(format_row_count).into_iter().collect()
            };

            if tags.is_empty() {
                return Err(ProcessingError::MissingData(format!(
                    "No datasets to verify in {}",
                    settings.data_dir.display()
                )));
            }

            let verifier = MeasurementVerifier::new(workers)
                .with_tolerance(tolerance.unwrap_or(settings.tolerance))
                .with_min_chunk_bytes(settings.min_chunk_bytes)
                .with_data_dir(&settings.data_dir)
                .with_results_dir(&settings.results_dir)
                .with_verify_dir(&settings.verify_dir);

            let mut passed: Vec<String> = Vec::new();
            let mut failed: Vec<String> = Vec::new();

            for tag in &tags {
                let progress =
                    ProgressReporter::new_spinner(&format!("Verifying dataset {}...", tag), quiet);
                let outcome = verifier.verify_dataset(tag);
                progress.finish_with_message(&format!("Dataset {} checked", tag));

                match outcome {
                    Ok(verification) => {
                        if !quiet {
                            println!("\n{}", verification.summary());
                        }
                        if verification.is_success() {
                            passed.push(tag.clone());
                        } else {
                            failed.push(tag.clone());
                        }
                    }
                    Err(ProcessingError::MissingData(message)) => {
                        warn!(tag = %tag, "{}", message);
                        if !quiet {
                            println!("\n[SKIP] Dataset {}: {}", tag, message);
                        }
                        failed.push(tag.clone());
                    }
                    Err(e) => return Err(e),
                }
            }

            if tags.len() > 1 && !quiet {
                println!("{}", overall_summary(&passed, &failed));
            }

            Ok(if failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn overall_summary(passed: &[String], failed: &[String]) -> String {
    let mut summary = String::new();

    summary.push_str("=== Overall Summary ===\n");
    summary.push_str(&format!(
        "Datasets passed: {}/{}\n",
        passed.len(),
        passed.len() + failed.len()
    ));
    if !failed.is_empty() {
        summary.push_str(&format!("Failed datasets: {}\n", failed.join(", ")));
    }

    summary
}

