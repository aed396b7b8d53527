use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use formstore::{
    EmptyPayloadPolicy, FieldSnapshot, FieldStore, MissingRefreshPolicy, StoreConfig, StoreEvent,
};
use futures::executor::LocalPool;
use serde::Serialize;

use crate::error::{DemoError, Result};
use crate::logging::{self, LogFormat};
use crate::seeds::SeedFile;

#[derive(Debug, Parser)]
#[command(
    name = "formstore-demo",
    about = "Drive a reactive form-field store from the command line",
    version
)]
pub struct Cli {
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Seed a store, apply selections, and print the fields as JSON.
    Run(RunArgs),

    /// Print the built-in seed file.
    #[command(name = "print-seeds")]
    PrintSeeds,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// JSON seed file. The built-in form is used when omitted.
    #[arg(long)]
    pub seeds: Option<PathBuf>,

    /// `FIELD=VALUE` selection, applied in order. An empty value clears.
    #[arg(long = "select", value_name = "FIELD=VALUE")]
    pub select: Vec<Selection>,

    /// Overrides FORMSTORE_EMPTY_PAYLOAD.
    #[arg(long = "empty-payload")]
    pub empty_payload: Option<EmptyPayloadPolicy>,

    /// Overrides FORMSTORE_MISSING_REFRESH.
    #[arg(long = "missing-refresh")]
    pub missing_refresh: Option<MissingRefreshPolicy>,

    /// Log free-text edits as store events.
    #[arg(long = "notify-free-text")]
    pub notify_free_text: bool,

    /// Mark empty required fields and fail when any remain.
    #[arg(long)]
    pub validate: bool,
}

/// One `--select` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub field_id: String,
    pub value: Option<String>,
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (field_id, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got {s:?}"))?;
        let field_id = field_id.trim();
        if field_id.is_empty() {
            return Err(format!("missing field id in {s:?}"));
        }
        Ok(Self {
            field_id: field_id.to_string(),
            value: Some(value.trim()).filter(|v| !v.is_empty()).map(str::to_string),
        })
    }
}

/// What `run` prints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub fields: Vec<FieldSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
}

impl RunArgs {
    /// Environment config with command-line overrides on top.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::from_env();
        if let Some(policy) = self.empty_payload {
            config = config.with_empty_payload(policy);
        }
        if let Some(policy) = self.missing_refresh {
            config = config.with_missing_refresh(policy);
        }
        if self.notify_free_text {
            config = config.with_free_text_notifications(true);
        }
        config
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_format)?;
    match cli.command {
        Commands::Run(args) => {
            let report = build_report(&args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if args.validate && !report.missing_required.is_empty() {
                return Err(DemoError::MissingRequired {
                    fields: report.missing_required,
                });
            }
            Ok(())
        }
        Commands::PrintSeeds => {
            println!("{}", serde_json::to_string_pretty(&SeedFile::builtin())?);
            Ok(())
        }
    }
}

/// Seed a store, replay the selections, and collect the final state.
pub fn build_report(args: &RunArgs) -> Result<Report> {
    let seeds = match &args.seeds {
        Some(path) => SeedFile::load(path)?,
        None => SeedFile::builtin(),
    };

    let mut pool = LocalPool::new();
    let store = FieldStore::with_config(pool.spawner(), args.store_config());
    store.initialize(seeds.into_seeds())?;

    let _events = store.subscribe(|event| match event {
        StoreEvent::RefreshFailed { field_id, error } => {
            tracing::warn!(message = "demo.refresh_failed", field = %field_id, %error);
        }
        other => tracing::info!(message = "demo.event", field = %other.field_id(), event = ?other),
    });

    for selection in &args.select {
        if store.field(&selection.field_id).is_none() {
            return Err(DemoError::invalid(format!(
                "unknown field in --select: {}",
                selection.field_id
            )));
        }
        store.set_selection(&selection.field_id, selection.value.as_deref())?;
        pool.run_until_stalled();
    }
    pool.run_until_stalled();

    let missing_required = if args.validate {
        store.validate_required()
    } else {
        Vec::new()
    };

    Ok(Report {
        fields: store.snapshot(),
        missing_required,
    })
}
