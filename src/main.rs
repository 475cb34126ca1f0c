use anyhow::{Context, Result};
use clap::Parser;
use perfdigest::cli::{Cli, OutputFormat};
use perfdigest::config::DigestConfig;
use perfdigest::digest::{report_filename, Digester, TestDigest};
use perfdigest::html_output::HtmlReport;
use perfdigest::json_output::JsonDigestOutput;
use perfdigest::notification::{DateRange, Mailbox, MessageClassifier};
use perfdigest::resolver::{CachedResolver, OfflineResolver, PushlogResolver, RevisionResolver};
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings only unless --debug is set
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn summary_line(digest: &TestDigest) -> String {
    format!(
        "{}: {} ranges, {} emails",
        digest.test,
        digest.ranges_produced(),
        digest.records_consumed
    )
}

fn write_html_reports(args: &Cli, config: &DigestConfig, digests: &[TestDigest]) -> Result<()> {
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    for digest in digests {
        if digest.ranges_produced() > 0 {
            let path = args.output_dir.join(report_filename(&digest.test));
            let report = HtmlReport::from_digest(digest, &args.date_range, config);
            fs::write(&path, report.to_html())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        println!("{}", summary_line(digest));
    }
    Ok(())
}

fn print_text(digests: &[TestDigest]) {
    for digest in digests {
        println!("{}", summary_line(digest));
        for interval in &digest.intervals {
            println!("  {}", interval);
        }
        for record in &digest.skipped {
            println!("  skipped {}: {}", record.platform, record.reason);
        }
    }
}

fn print_json(date_range: &str, digests: &[TestDigest]) -> Result<()> {
    let mut output = JsonDigestOutput::new(date_range);
    for digest in digests {
        output.add_test(digest);
    }
    println!("{}", output.to_json()?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => DigestConfig::from_file(path)?,
        None => DigestConfig::default(),
    };
    if let Some(policy) = args.conflict_policy {
        config.conflict_policy = policy.into();
    }

    let range = DateRange::parse(&args.date_range)?;
    let mailbox = Mailbox::from_file(&args.mbox)?;
    tracing::info!("{} messages in {}", mailbox.len(), args.mbox.display());

    let tests = if args.tests.is_empty() {
        config.tests.clone()
    } else {
        args.tests.clone()
    };

    let lookup: Box<dyn RevisionResolver> = if args.offline {
        Box::new(OfflineResolver)
    } else {
        Box::new(PushlogResolver::new(&config)?)
    };
    let resolver = CachedResolver::with_file(lookup, &args.cache)
        .with_context(|| format!("Failed to load cache {}", args.cache.display()))?;
    let mut digester = Digester::new(resolver, config.conflict_policy);

    let mut digests = Vec::with_capacity(tests.len());
    for test in &tests {
        let classifier = MessageClassifier::new(&config, test)?;
        digests.push(digester.digest_test(test, &mailbox, &range, &classifier));
    }

    digester
        .resolver_mut()
        .save()
        .with_context(|| format!("Failed to save cache {}", args.cache.display()))?;

    match args.format {
        OutputFormat::Html => write_html_reports(&args, &config, &digests)?,
        OutputFormat::Text => print_text(&digests),
        OutputFormat::Json => print_json(&args.date_range, &digests)?,
    }

    Ok(())
}
