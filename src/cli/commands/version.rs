//! Version command

use crate::config::Config;
use crate::error::ContainmeResult;
use crate::orchestration::configured_kind;

/// Print the version and the configured runtime
pub async fn execute(config: &Config) -> ContainmeResult<()> {
    println!("containme {}", env!("CARGO_PKG_VERSION"));

    let runtime = match configured_kind(&config.runtime)? {
        Some(kind) => kind.name(),
        None => "auto",
    };
    println!("runtime: {}", runtime);
    Ok(())
}
