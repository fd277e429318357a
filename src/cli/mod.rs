//! Command-line interface for courscape.
//!
//! Provides commands for processing courses and specializations, showing
//! stored progress, and inspecting the resolved configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{ContentService, CourseraClient};
use crate::config::{self, split_list, ResolvedConfig};
use crate::core::{CourseProcessor, ProgressStore};
use crate::domain::summarize;

/// courscape - Resumable course walker
#[derive(Parser, Debug)]
#[command(name = "courscape")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of searching for .courscape/config.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Complete skippable items of courses and specializations
    Run {
        /// Course slugs (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "from_config")]
        course: Vec<String>,

        /// Specialization slugs (comma-separated)
        #[arg(long = "spec", value_delimiter = ',', conflicts_with = "from_config")]
        spec: Vec<String>,

        /// Take targets from the config file
        #[arg(long)]
        from_config: bool,

        /// Discard stored progress and rebuild maps from the service
        #[arg(long)]
        reset_progress: bool,

        /// Re-apply the classification policy to stored maps
        #[arg(long)]
        update_types: bool,

        /// Session cookie file (overrides config)
        #[arg(long, env = "COURSCAPE_COOKIES")]
        cookies: Option<PathBuf>,
    },

    /// Show stored progress
    Status {
        /// Only show documents of this user
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = load_config(self.config.as_deref())?;

        match self.command {
            Commands::Run {
                course,
                spec,
                from_config,
                reset_progress,
                update_types,
                cookies,
            } => {
                let (courses, specs) = if from_config {
                    (cfg.targets.courses.clone(), cfg.targets.specializations.clone())
                } else {
                    (course, spec)
                };
                let cookies = cookies.unwrap_or_else(|| cfg.cookies_file.clone());
                run(&cfg, &courses, &specs, reset_progress, update_types, &cookies).await
            }
            Commands::Status { user } => show_status(&cfg, user.as_deref()).await,
            Commands::Config => show_config(&cfg),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    match path {
        Some(path) => config::load_config_from(path),
        None => config::config().cloned(),
    }
}

/// Flatten list arguments that may themselves carry commas or blanks
fn normalize_targets(values: &[String]) -> Vec<String> {
    values.iter().flat_map(|v| split_list(v)).collect()
}

/// Process the requested targets
async fn run(
    cfg: &ResolvedConfig,
    courses: &[String],
    specs: &[String],
    reset_progress: bool,
    update_types: bool,
    cookies: &Path,
) -> Result<()> {
    let courses = normalize_targets(courses);
    let specs = normalize_targets(specs);
    if courses.is_empty() && specs.is_empty() {
        anyhow::bail!("No targets provided. Use --course, --spec or --from-config");
    }

    let client = CourseraClient::from_cookie_file(cookies)
        .with_context(|| format!("Failed to create client from {}", cookies.display()))?;

    let mut settings = cfg.processor_settings();
    settings.reset_progress = reset_progress;
    settings.update_types = update_types;

    let store = ProgressStore::new(&cfg.progress_dir);
    let mut processor = CourseProcessor::new(client, store, settings);

    let client_name = processor.service().name().to_string();
    eprintln!("🎓 Connecting to {}...", client_name);
    let identity = processor.service().clone();
    if !processor
        .setup(&identity, &cfg.skip.courses, &cfg.skip.specializations)
        .await
    {
        eprintln!("\n❌ Setup failed: could not resolve the signed-in user");
        std::process::exit(1);
    }

    eprintln!("   User: {}", processor.user_id().unwrap_or("-"));
    eprintln!("   Progress: {}", processor.store().root().display());
    let skip = processor.skip_list();
    let skipped_courses = skip.courses().count();
    let skipped_specs = skip.specializations().count();
    if skipped_courses + skipped_specs > 0 {
        eprintln!(
            "   Skip list: {} courses, {} specializations",
            skipped_courses, skipped_specs
        );
    }

    let batch = processor.process_targets(&courses, &specs).await;

    eprintln!(
        "\n[Run {}: {} succeeded, {} failed, {} skipped]",
        batch.run_id, batch.processed, batch.failed, batch.skipped
    );
    if batch.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Show stored progress documents
async fn show_status(cfg: &ResolvedConfig, user: Option<&str>) -> Result<()> {
    let store = ProgressStore::new(&cfg.progress_dir);
    let maps = store.list(user).await?;

    if maps.is_empty() {
        println!("No progress found in {}", cfg.progress_dir.display());
        return Ok(());
    }

    println!(
        "{:<12} {:<30} {:<24} {:>9} {:>7} {:>7} {:>8}",
        "USER", "COURSE", "SPECIALIZATION", "COMPLETED", "QUEUED", "FAILED", "PROGRESS"
    );
    println!("{}", "-".repeat(103));

    for map in &maps {
        let summary = summarize(map);
        println!(
            "{:<12} {:<30} {:<24} {:>9} {:>7} {:>7} {:>7.1}%",
            map.user_id,
            map.course_slug,
            map.specialization_slug.as_deref().unwrap_or("-"),
            format!("{}/{}", summary.completed, summary.total_skippable),
            summary.queued,
            summary.failed,
            summary.progress_percent
        );
    }

    println!("\nTotal: {} documents", maps.len());
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("courscape configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Progress: {}", cfg.progress_dir.display());
    println!("  Cookies:  {}", cfg.cookies_file.display());
    println!();
    println!("Classification:");
    println!("  Skippable: {}", display_list(&cfg.classification.skippable_types));
    println!("  Deferred:  {}", display_list(&cfg.classification.deferred_types));
    println!();
    println!("Skip lists:");
    println!("  Courses:         {}", display_list(&cfg.skip.courses));
    println!("  Specializations: {}", display_list(&cfg.skip.specializations));
    println!();
    println!("Targets (--from-config):");
    println!("  Courses:         {}", display_list(&cfg.targets.courses));
    println!("  Specializations: {}", display_list(&cfg.targets.specializations));
    println!();
    println!("Processing:");
    println!("  Success policy: {:?}", cfg.processing.success_policy);
    println!("  Requeue stale:  {}", cfg.processing.requeue_stale);

    Ok(())
}

fn display_list<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    let list: Vec<&str> = values.into_iter().map(String::as_str).collect();
    if list.is_empty() {
        "(none)".to_string()
    } else {
        list.join(", ")
    }
}
