//! Coupon extraction CLI
//!
//! Usage:
//!   couponbox parse --subject "Nike: $20 off" --content "Use code SAVE20"
//!   couponbox parse --file email.txt
//!   couponbox inbound --payload webhook.json --save
//!   couponbox batch --input emails/ --output data/coupons.jsonl

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use couponbox::batch::{load_batch, run_batch, write_results_jsonl};
use couponbox::config::Config;
use couponbox::inbound::InboundEmail;
use couponbox::store::CouponLedger;
use couponbox::{EmailCouponPipeline, ExtractionError};

#[derive(Parser)]
#[command(name = "couponbox")]
#[command(about = "Turn promotional emails into structured coupons")]
struct Cli {
    /// TOML config; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one coupon from a subject and/or body
    Parse {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Read the body from a file instead of --content
        #[arg(long)]
        file: Option<String>,
    },
    /// Handle an inbound-mail webhook payload
    Inbound {
        #[arg(long)]
        payload: String,
        /// Owner of the coupon; defaults to the sender address
        #[arg(long)]
        user_id: Option<String>,
        /// Persist to the coupon ledger
        #[arg(long)]
        save: bool,
        #[arg(long)]
        data_dir: Option<String>,
    },
    /// Extract coupons from a directory of emails or a JSONL request file
    Batch {
        #[arg(long)]
        input: String,
        #[arg(long)]
        output: String,
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

async fn run_parse_command(
    pipeline: &EmailCouponPipeline,
    subject: Option<String>,
    content: Option<String>,
    file: Option<String>,
) -> Result<()> {
    let content = match file {
        Some(path) => Some(
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read email file: {}", path))?,
        ),
        None => content,
    };

    let outcome = match pipeline
        .process_detailed(content.as_deref(), subject.as_deref())
        .await
    {
        Ok(outcome) => outcome,
        Err(ExtractionError::NoInput) => anyhow::bail!("Email content or subject is required"),
        Err(e) => return Err(e.into()),
    };

    // {"strategy": .., "record": {..}}
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_inbound_command(
    config: &Config,
    pipeline: &EmailCouponPipeline,
    payload: &str,
    user_id: Option<String>,
    save: bool,
    data_dir: Option<String>,
) -> Result<()> {
    let json = std::fs::read_to_string(payload)
        .with_context(|| format!("Failed to read webhook payload: {}", payload))?;
    let email = InboundEmail::from_json(&json)?;
    let sender = email.sender_address();
    tracing::info!("Received email from {:?}", sender);

    let input = match email.to_input() {
        Ok(input) => input,
        Err(ExtractionError::NoInput) => anyhow::bail!("No email content found"),
        Err(e) => return Err(e.into()),
    };
    let outcome = pipeline.run(&input).await;

    if save {
        let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
        let ledger = CouponLedger::new(&data_dir);
        let owner = user_id.or(sender);
        let saved = ledger.save_coupon(&outcome.record, owner.as_deref())?;

        if saved.is_duplicate() {
            println!("Duplicate coupon {}", saved.coupon().id);
        } else {
            println!("Saved coupon {}", saved.coupon().id);
        }
    }

    println!("{}", serde_json::to_string_pretty(&outcome.record)?);
    Ok(())
}

async fn run_batch_command(
    config: &Config,
    pipeline: &EmailCouponPipeline,
    input: &str,
    output: &str,
    concurrency: Option<usize>,
) -> Result<()> {
    let items = load_batch(input)?;
    let concurrency = concurrency.unwrap_or(config.batch.concurrency);
    tracing::info!("Processing {} emails with concurrency {}", items.len(), concurrency);

    let results = run_batch(pipeline, items, concurrency).await;
    let ai_count = results.iter().filter(|r| r.strategy != "heuristic").count();
    write_results_jsonl(output, &results)?;

    println!("\n=== Batch Summary ===");
    println!("Emails:        {}", results.len());
    println!("AI extracted:  {}", ai_count);
    println!("Fallback:      {}", results.len() - ai_count);
    println!("Output:        {}", output);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?.with_env_overrides();
    let pipeline = EmailCouponPipeline::from_config(&config)?;
    tracing::debug!("Strategies: {:?}", pipeline.strategy_names());

    match cli.command {
        Commands::Parse { subject, content, file } => {
            run_parse_command(&pipeline, subject, content, file).await?;
        }
        Commands::Inbound { payload, user_id, save, data_dir } => {
            run_inbound_command(&config, &pipeline, &payload, user_id, save, data_dir).await?;
        }
        Commands::Batch { input, output, concurrency } => {
            run_batch_command(&config, &pipeline, &input, &output, concurrency).await?;
        }
    }

    Ok(())
}
