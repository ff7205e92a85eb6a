use anyhow::{Context as _, Result};
use clap::Parser;
use futures::StreamExt as _;
use log::{info, LevelFilter};
use prettytable::{cell, row, Table};
use seq_pipeline::{PipelineConfig, PipelineGenerator};
use std::{env, path::PathBuf};

#[derive(Debug, Clone, Parser)]
/// Inspect image sequence pipelines
enum Opts {
    /// Print the dataset size and the output format
    Info {
        /// configuration file
        config_file: PathBuf,
    },
    /// Print the first elements of the stream
    Peek {
        /// configuration file
        config_file: PathBuf,
        /// number of elements to print
        #[clap(long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // setup logger
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    builder.init();

    match Opts::parse() {
        Opts::Info { config_file } => {
            show_info(config_file).await?;
        }
        Opts::Peek { config_file, count } => {
            peek(config_file, count).await?;
        }
    }

    Ok(())
}

fn load_config(config_file: &PathBuf) -> Result<PipelineConfig> {
    PipelineConfig::open(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))
}

async fn show_info(config_file: PathBuf) -> Result<()> {
    let config = PipelineConfig {
        is_training: false,
        ..load_config(&config_file)?
    };
    let generator = PipelineGenerator::new(config)?;
    let pipeline = generator.assemble().await?;
    let config = generator.config();

    let mut table = Table::new();
    table.add_row(row!["manifest", config.dataset_file.display()]);
    table.add_row(row!["images dir", config.images_dir.display()]);
    table.add_row(row!["mode", generator.mode()]);
    table.add_row(row!["images per sequence", config.sequence_image_count]);
    table.add_row(row!["image size", generator.image_size()]);
    table.add_row(row!["label", config.label_name]);
    table.add_row(row!["size", pipeline.size()]);
    table.printstd();

    Ok(())
}

async fn peek(config_file: PathBuf, count: usize) -> Result<()> {
    let config = load_config(&config_file)?;
    let generator = PipelineGenerator::new(config)?;
    let pipeline = generator.assemble().await?;
    info!("the pipeline has {} elements per pass", pipeline.size());

    let mut stream = pipeline.into_stream().take(count).enumerate();
    let mut table = Table::new();
    table.add_row(row!["index", "label", "shape"]);

    while let Some((index, result)) = stream.next().await {
        let sample = result.with_context(|| format!("failed to load element {}", index))?;
        table.add_row(row![index, sample.label, sample.data.describe()]);
    }
    table.printstd();

    Ok(())
}
