use anyhow::Result;

use clipdedup::adapters::ffmpeg::FfmpegDecoder;
use clipdedup::adapters::fs::JsonCheckpointStore;
use clipdedup::adapters::model::HistogramModel;
use clipdedup::adapters::s3::S3ObjectStore;
use clipdedup::adapters::window::SlidingWindowComparator;
use clipdedup::{Config, PipelineService};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let storage = S3ObjectStore::connect(&config).await?;
    let checkpoint = JsonCheckpointStore::new(&config.state_path);
    let oracle = SlidingWindowComparator::new(HistogramModel);

    let pipeline = PipelineService::new(
        storage,
        FfmpegDecoder,
        oracle,
        checkpoint,
        config.data_dir.clone(),
    );
    let report = pipeline.run().await?;
    print!("{report}");
    Ok(())
}
