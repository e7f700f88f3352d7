//! `spirvcross-natives platform` — Show platform detection results.

use spirvcross_natives::{Platform, REQUIRED_LIBRARIES};

pub fn execute(os: Option<&str>) {
    let os = os.unwrap_or(std::env::consts::OS);
    let platform = Platform::detect(os);

    println!("OS:        {}", os);
    println!("Platform:  {}", platform);
    match platform.suffix() {
        Some(suffix) => println!("Suffix:    {}", suffix),
        None => {
            println!("Suffix:    (unsupported)");
            return;
        }
    }

    println!("Libraries:");
    for name in REQUIRED_LIBRARIES {
        if let Some(file_name) = platform.library_file_name(name) {
            println!("  {}", file_name);
        }
    }
}
