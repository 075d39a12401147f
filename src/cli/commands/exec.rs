//! Exec command - run a one-off command in the build environment

use super::{create_progress_bar, prepare_engine, BuildPaths};
use crate::cli::args::ExecArgs;
use crate::config::Config;
use crate::error::ContainmeResult;
use crate::orchestration::short_id;
use crate::spec::Stage;
use crate::ui::{self, UiContext};
use tracing::warn;

/// Execute the exec command
pub async fn execute(args: ExecArgs, paths: &BuildPaths, config: &Config) -> ContainmeResult<()> {
    let pb = create_progress_bar("Preparing environment...");
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

    let cached = state.checkpoint(Stage::Environment).map(str::to_string);
    let env_image = engine
        .run_environment_stage(!args.no_env_cache, cached.as_deref())
        .await?;
    if cached.as_deref() != Some(env_image.as_str()) {
        state.set_checkpoint(Stage::Environment, env_image.as_str());
        if let Err(e) = store.save(&state).await {
            warn!("Failed to save build state: {}", e);
        }
    }

    let command = shell_join(&args.command);
    let image = engine.exec_in_environment(&command).await?;

    ui::step_ok_detail(
        &UiContext::detect(),
        &format!("Ran ({}) on environment {}", command, short_id(&env_image)),
        &short_id(&image),
    );
    Ok(())
}

/// Join arguments into one shell command line, quoting words the shell would split
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn plain_words_are_joined_as_is() {
        assert_eq!(shell_join(&args(&["make", "test", "-j4"])), "make test -j4");
    }

    #[test]
    fn words_with_spaces_stay_one_argument() {
        assert_eq!(
            shell_join(&args(&["sh", "-c", "echo a b"])),
            "sh -c 'echo a b'"
        );
    }

    #[test]
    fn quotes_and_empty_words_are_escaped() {
        assert_eq!(
            shell_join(&args(&["echo", "it's", ""])),
            "echo 'it'\\''s' ''"
        );
    }
}
