//! `spirvcross-natives load` — Run one bootstrap attempt and report it.

use spirvcross_natives::{bundle_for, LoadOutcome, LoaderConfig, NativeLoader, SystemLoader};
use termcolor::{Color, ColorChoice};

use crate::output::StyledOutput;

/// Returns whether every library loaded.
pub fn execute(config: LoaderConfig, json: bool, color: ColorChoice) -> anyhow::Result<bool> {
    let bundle = bundle_for(&config);
    let natives = NativeLoader::new(config, bundle, SystemLoader);
    let ready = natives.ensure_loaded();

    let Some(report) = natives.last_report() else {
        return Ok(ready);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ready);
    }

    let mut out = StyledOutput::new(color);
    out.plain(&format!("Platform: {}", report.platform));
    if let Some(dir) = &report.staging_dir {
        out.plain(&format!("Staging:  {}", dir.display()));
    }
    if let Some(err) = &report.error {
        out.line(err, Some(Color::Red), true);
    }

    for library in &report.libraries {
        match library.outcome {
            LoadOutcome::Loaded => out.ok_badge(),
            LoadOutcome::LoadFailed => out.fail_badge(),
            LoadOutcome::NotStaged => out.skip_badge(),
        }
        out.plain(&library.name);
        if let Some(err) = &library.error {
            out.line(&format!("       {}", err), Some(Color::Red), false);
        }
    }

    for warning in &report.warnings {
        out.line(&format!("warning: {}", warning), Some(Color::Yellow), false);
    }

    out.line(
        &format!(
            "{}/{} libraries loaded",
            report.loaded_count(),
            report.libraries.len()
        ),
        Some(if ready { Color::Green } else { Color::Red }),
        true,
    );
    out.flush();

    Ok(ready)
}
