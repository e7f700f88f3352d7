//! Embeds the prebuilt native libraries into the crate.
//!
//! Every regular file in `$SPIRVCROSSJ_NATIVES_DIR` (default: `natives/` next
//! to this script) is included with `include_bytes!` under the package-relative
//! resource path `spirvcrossj/natives/<file name>`. A missing directory produces
//! an empty table; the loader then reports the libraries as not found.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

const RESOURCE_ROOT: &str = "spirvcrossj/natives";

fn main() {
    println!("cargo:rerun-if-env-changed=SPIRVCROSSJ_NATIVES_DIR");

    let natives_dir = match env::var_os("SPIRVCROSSJ_NATIVES_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("natives"),
    };
    println!("cargo:rerun-if-changed={}", natives_dir.display());

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    if let Ok(entries) = fs::read_dir(&natives_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            println!("cargo:rerun-if-changed={}", path.display());
            let absolute = fs::canonicalize(&path).unwrap_or(path.clone());
            files.push((format!("{}/{}", RESOURCE_ROOT, name), absolute));
        }
    }
    // deterministic order
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    out.push_str("pub(crate) static EMBEDDED_NATIVES: &[(&str, &[u8])] = &[\n");
    for (resource, path) in &files {
        let _ = writeln!(
            out,
            "    ({:?}, include_bytes!({:?})),",
            resource,
            path.to_string_lossy()
        );
    }
    out.push_str("];\n");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap()).join("embedded_natives.rs");
    fs::write(&out_path, out).unwrap();
}
