//! `spirvcross-natives sweep` — Remove stale staging directories.

use spirvcross_natives::{staging, LoaderConfig};
use std::time::Duration;

pub fn execute(config: &LoaderConfig, max_age_secs: Option<u64>) {
    let root = config.staging_root();
    let stale_after = max_age_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.stale_after());

    let removed = staging::sweep_stale(&root, &config.dir_prefix, stale_after);
    if removed.is_empty() {
        println!("No stale staging directories in {}", root.display());
    } else {
        for path in &removed {
            println!("Removed {}", path.display());
        }
        println!("Done.");
    }
}
