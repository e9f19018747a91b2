use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use footdr::export;
use footdr::scraper::WebScraper;
use footdr::utils::{LinkFilter, ScrapeStats};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "footdr")]
#[command(about = "A My FootDr clinic directory scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
enum ExportFormat {
    Csv,
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover clinic detail-page links from the archived listing
    Links {
        #[arg(long, help = "Maximum number of links to return")]
        limit: Option<usize>,

        #[arg(long, help = "Number of links to skip from the beginning")]
        offset: Option<usize>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Fetch and extract a single clinic page
    Page {
        #[arg(help = "URL of the clinic page to fetch")]
        url: String,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Scrape every discovered clinic page and export the results
    Scrape {
        #[arg(
            long,
            default_value_t = 600,
            help = "Delay between page requests, in milliseconds"
        )]
        delay_ms: u64,

        #[arg(long, help = "Scrape at most this many clinic pages")]
        limit: Option<usize>,

        #[arg(long, help = "Number of clinic pages to skip from the beginning")]
        offset: Option<usize>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "csv",
            help = "Output format"
        )]
        format: ExportFormat,

        #[arg(long, help = "Write CSV to this file instead of stdout")]
        out: Option<PathBuf>,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn validated_filter(limit: Option<usize>, offset: Option<usize>) -> LinkFilter {
    LinkFilter { limit, offset }.validate().unwrap_or_else(|e| {
        log::error!("Invalid args: {e}");
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Links {
            limit,
            offset,
            format,
        } => {
            let filter = validated_filter(limit, offset);

            let links = scraper.fetch_clinic_links().await.unwrap_or_else(|e| {
                log::error!("Error fetching clinic links: {}", e);
                process::exit(1);
            });
            let links = filter.apply(links);

            match format {
                OutputFormat::Json => serialize_json(&links),
                OutputFormat::Text => {
                    if links.is_empty() {
                        println!("No clinic links found.");
                    } else {
                        for (i, link) in links.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, link);
                        }
                    }
                }
            }
        }

        Commands::Page { url, format } => {
            log::info!("Fetching clinic page {}...", url);

            let record = scraper.fetch_clinic(&url).await.unwrap_or_else(|e| {
                log::error!("Error fetching clinic page: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&record),
                OutputFormat::Text => print!("{}", record),
            }
        }

        Commands::Scrape {
            delay_ms,
            limit,
            offset,
            format,
            out,
        } => {
            let filter = validated_filter(limit, offset);
            let delay = Duration::from_millis(delay_ms);

            let records = scraper
                .scrape_clinic_subset(filter, delay)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error scraping clinics: {}", e);
                    process::exit(1);
                });

            match format {
                ExportFormat::Json => serialize_json(&records),
                ExportFormat::Text => {
                    for (i, record) in records.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, record);
                    }
                    print!("{}", ScrapeStats::from_records(&records));
                }
                ExportFormat::Csv => match out {
                    Some(path) => {
                        let file = File::create(&path).unwrap_or_else(|e| {
                            log::error!("Error creating {}: {}", path.display(), e);
                            process::exit(1);
                        });
                        if let Err(e) = export::write_csv(&records, file) {
                            log::error!("Error writing CSV: {}", e);
                            process::exit(1);
                        }
                        log::info!("Wrote {} rows to {}", records.len(), path.display());
                    }
                    None => match export::to_csv_string(&records) {
                        Ok(csv) => print!("{}", csv),
                        Err(e) => {
                            log::error!("Error writing CSV: {}", e);
                            process::exit(1);
                        }
                    },
                },
            }
        }
    }
}
