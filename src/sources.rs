use anyhow::Result;

use crate::config::Config;
use crate::models::RemoteSource;

/// Print the configured sources and their basic health.
pub fn list_sources(config: &Config, sources: &[RemoteSource]) -> Result<()> {
    let local_status = if config.local.root.exists() {
        "OK"
    } else {
        "MISSING (root does not exist)"
    };

    println!("{:<16} {:<10} {:<44} STATUS", "SOURCE", "KIND", "LOCATION");
    println!(
        "{:<16} {:<10} {:<44} {}",
        "manual",
        "local",
        config.local.root.display(),
        local_status
    );

    for source in sources {
        println!(
            "{:<16} {:<10} {:<44} CONFIGURED",
            source.id,
            "github",
            format!(
                "{}/{}/{} @ {}",
                source.owner, source.repo, source.path, source.branch
            )
        );
    }

    if sources.is_empty() {
        println!("(no remote sources configured)");
    }

    Ok(())
}
