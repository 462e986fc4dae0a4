// Build script for the room secrets overlay
// Copies the sample config file to the output directory after build

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Tell Cargo to rerun this script if the config file or catalog changes
    println!("cargo:rerun-if-changed=room_secrets.toml");
    println!("cargo:rerun-if-changed=data/rooms.json");

    let out_dir = env::var("OUT_DIR").unwrap();

    // OUT_DIR = target/<profile>/build/<crate>-<hash>/out
    let out_path = Path::new(&out_dir);
    let target_dir = out_path
        .ancestors()
        .nth(3)
        .expect("Could not find target directory");

    let config_src = Path::new("room_secrets.toml");
    let config_dst = target_dir.join("room_secrets.toml");

    if config_src.exists() {
        fs::copy(config_src, &config_dst).expect("Failed to copy config file");
    }
}
