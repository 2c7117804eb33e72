use crate::dataset::{ContainerReader, ElementType, SharedContainer};
use crate::errors::Result;
use crate::sources::SegmentSource;
use crate::sources::fill::DeterministicFill;
use crate::tasks::run_group;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FillTaskConfig {
    pub workers: usize,
    pub base_segment_len: u64,
    pub output_path: String,
    pub dataset_name: String,
}

impl Default for FillTaskConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            base_segment_len: 10,
            output_path: "SDS_row.sed".to_string(),
            dataset_name: "IntVector".to_string(),
        }
    }
}

/// Demo task: every worker fills a deterministic segment and the group
/// writes them as one ordered dataset. With the default config, 4 workers
/// contribute segments of 10..=13 elements filled with `rank + 1`, leaving
/// a 46-element dataset behind.
pub struct TaskFill2Dataset {
    config: FillTaskConfig,
}

impl TaskFill2Dataset {
    pub fn new(config: FillTaskConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<Vec<i32>> {
        let cfg = self.config.clone();
        println!(
            "[TaskFill2Dataset] Starting: {} workers -> '{}' dataset '{}'.",
            cfg.workers, cfg.output_path, cfg.dataset_name
        );

        let written = run_group(cfg.workers, {
            let cfg = cfg.clone();
            move |ctx| {
                let cfg = cfg.clone();
                async move {
                    let source = DeterministicFill::new(cfg.base_segment_len);
                    let buffer = source.produce(&ctx).await?;
                    let table = ctx.exchange_sizes(buffer.len() as u64).await?;
                    let placement = table.placement(ctx.rank())?;
                    let mut container = SharedContainer::create(&ctx, &cfg.output_path).await?;
                    let dataset = container
                        .define_dataset(&ctx, &cfg.dataset_name, ElementType::I32, placement.total)
                        .await?;
                    dataset
                        .write_region(&ctx, placement.region(), &buffer)
                        .await?;
                    container.seal(&ctx).await?;
                    Ok(placement.len)
                }
            }
        })
        .await?;
        let total: u64 = written.iter().sum();
        println!(
            "[TaskFill2Dataset] All {} workers finished. {} elements written.",
            cfg.workers, total
        );

        let reader = ContainerReader::open(&cfg.output_path)?;
        let data = reader.read_dataset::<i32>(&cfg.dataset_name)?;
        println!(
            "[TaskFill2Dataset] Read-back verified: {} elements in '{}'.",
            data.len(),
            cfg.output_path
        );
        Ok(data)
    }
}
