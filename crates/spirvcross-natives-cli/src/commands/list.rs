//! `spirvcross-natives list` — List bundled library resources.

use spirvcross_natives::{bundle_for, LoaderConfig};

pub fn execute(config: &LoaderConfig) {
    let bundle = bundle_for(config);
    if bundle.is_empty() {
        println!("No native libraries bundled.");
        return;
    }

    for path in bundle.paths() {
        match bundle.size(path) {
            Some(size) => println!("{:>12}  {}", size, path),
            None => println!("{:>12}  {}", "?", path),
        }
    }
}
