use clap::Parser;
use project_extra::config::cli::{CheckArgs, Command, GenerateArgs, InspectArgs};
use project_extra::config::toml_config::TomlConfig;
use project_extra::core::pipeline::{check_persisted, list_extra_files};
use project_extra::core::Pipeline;
use project_extra::utils::{logger, validation::Validate};
use project_extra::{
    summarize, CliConfig, ExtraEngine, ExtraError, ExtraPipeline, LocalStorage, ProjectDefinition,
    ProjectExtraService, RunConfig,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let result = match &cli.command {
        Command::Generate(args) => generate(args).await,
        Command::Check(args) => check(args).await,
        Command::Inspect(args) => inspect(args).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_run_config(args: &GenerateArgs) -> Result<RunConfig, ExtraError> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let toml = TomlConfig::from_file(path)?;
            toml.validate()?;
            RunConfig::from_toml(&toml)
        }
        None => RunConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn generate(args: &GenerateArgs) -> Result<(), ExtraError> {
    let config = load_run_config(args)?;
    display_config_summary(&config, args);

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let input = LocalStorage::new(config.input_path.clone());
    let output = LocalStorage::new(config.output_path.clone());
    let pipeline = ExtraPipeline::new(input, output, config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        let definitions = pipeline.extract().await?;
        let generated = pipeline.transform(definitions).await?;
        for item in &generated {
            println!("{} -> {}", item.source, item.output_filename());
            for form in &item.summary {
                println!("  {}", form);
            }
        }
        return Ok(());
    }

    let engine = ExtraEngine::new_with_monitoring(pipeline, monitor_enabled);
    let written = engine.run().await?;

    println!("✅ Generated {} file(s)", written.len());
    for path in written {
        println!("📁 {}", path);
    }
    Ok(())
}

async fn check(args: &CheckArgs) -> Result<(), ExtraError> {
    let path = Path::new(&args.path);
    let (storage, files) = if path.is_file() {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (LocalStorage::new(parent), vec![name])
    } else {
        let storage = LocalStorage::new(path);
        let files = list_extra_files(&storage, "").await?;
        (storage, files)
    };

    let reports = check_persisted(&storage, &files).await?;
    let mut first_form: Option<String> = None;
    let mut violations = 0;
    for (file, report) in &reports {
        if report.is_ok() {
            println!("✅ {}", file);
            continue;
        }
        println!("❌ {} ({} violation(s))", file, report.len());
        for violation in &report.violations {
            println!("   {}", violation);
        }
        violations += report.len();
        if first_form.is_none() {
            first_form = report.first_form().map(str::to_string);
        }
    }

    if violations > 0 {
        return Err(ExtraError::IntegrityError {
            form_ref: first_form.unwrap_or_default(),
            violations,
        });
    }
    println!("✅ {} file(s) consistent", reports.len());
    Ok(())
}

async fn inspect(args: &InspectArgs) -> Result<(), ExtraError> {
    let mut config = RunConfig::default();
    args.structure.apply(&mut config);
    config.validate()?;

    let content = tokio::fs::read_to_string(&args.definition).await?;
    let definition = ProjectDefinition::from_json_str_with(&content, &config.options.input_types)?;
    let extra = ProjectExtraService::new(config.options).generate(&definition);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&extra)?);
        return Ok(());
    }

    let details = extra.details();
    println!(
        "📋 {} ({}) - {} form(s), {} input(s)",
        details.name,
        details.project_ref,
        extra.forms.len(),
        extra.inputs.len()
    );
    for form in summarize(&extra) {
        println!("  {}", form);
    }
    Ok(())
}

fn display_config_summary(config: &RunConfig, args: &GenerateArgs) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  Input: {}", config.input_path);
    if !config.input_files.is_empty() {
        tracing::info!("  Files: {}", config.input_files.join(", "));
    }
    tracing::info!("  Output: {}", config.output_path);
    tracing::info!(
        "  Multiple choice types: {}",
        config.options.input_types.multiple_choice.join(", ")
    );
    tracing::info!(
        "  Branch group members: {:?}",
        config.options.branch_group_members
    );
    if let Some(bundle) = &config.bundle_filename {
        tracing::info!("  Bundle: {} (ZIP)", bundle);
    }
    tracing::info!("  Strict: {}", config.strict);
    if args.dry_run {
        tracing::info!("  🔍 DRY RUN MODE ENABLED");
    }
}
