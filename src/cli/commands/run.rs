//! Run command - execute the build pipeline

use super::{create_progress_bar, prepare_engine, BuildPaths};
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::engine::PipelineOptions;
use crate::error::ContainmeResult;
use crate::orchestration::short_id;
use crate::ui::{self, UiContext};
use console::style;
use tracing::{debug, info};

/// Execute the run command
pub async fn execute(args: RunArgs, paths: &BuildPaths, config: &Config) -> ContainmeResult<()> {
    let pb = create_progress_bar("Preparing build...");
    let mut engine = match prepare_engine(paths, config, &pb).await {
        Ok(engine) => engine,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    let store = paths.state_store(config);
    let mut state = store.load().await;
    debug!("Loaded build state from {}", store.path().display());

    let options = PipelineOptions {
        use_environment_cache: !args.no_env_cache,
        use_dependencies_cache: !args.no_deps_cache,
    };

    info!("Starting build {}", engine.build_id());
    let result = engine.run_pipeline(&mut state, &store, options).await;

    if args.clean_volumes {
        if let Err(e) = engine.destroy_volumes().await {
            eprintln!("{} Failed to remove cache volumes: {}", style("!").yellow(), e);
        }
    }

    result?;

    let ctx = UiContext::detect();
    ui::outro_success(
        &ctx,
        &format!(
            "Build {} succeeded ({})",
            engine.build_id(),
            short_id(engine.head_image())
        ),
    );
    Ok(())
}
