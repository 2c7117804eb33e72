use sediment::tasks::fill2dataset::{FillTaskConfig, TaskFill2Dataset};
use sediment::utils::load_toml::load_toml;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Tasks start!");
    let config = match std::env::args().nth(1) {
        Some(path) => match load_toml::<FillTaskConfig>(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load task config '{}': {:?}", path, e);
                return;
            }
        },
        None => FillTaskConfig::default(),
    };
    let task = TaskFill2Dataset::new(config);
    if let Err(e) = task.run().await {
        eprintln!("Task execution failed: {:?}", e);
    }
    println!("Task invocation completed.");
}
