use std::env;
use std::fs;
use std::path::Path;

/// Embeds `config.toml` as the compiled-in default configuration.
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let defaults = fs::read_to_string(Path::new("config.toml"))
        .expect("config.toml must exist next to Cargo.toml");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("default_config.rs");

    fs::write(
        dest_path,
        format!("pub const DEFAULT_CONFIG: &str = r#\"{defaults}\"#;"),
    )
    .expect("Failed to write embedded default config");
}
