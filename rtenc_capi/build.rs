use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("RTENC_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };
    let bindings = cbindgen::generate_with_config(&crate_dir, config).unwrap();

    let mut new_content = Vec::new();
    bindings.write(&mut new_content);

    let include_dir = Path::new(&crate_dir).join("include");
    fs::create_dir_all(&include_dir).unwrap();
    let header_path = include_dir.join("rtenc.h");
    let needs_update = match fs::read(&header_path) {
        Ok(existing) => existing != new_content,
        Err(_) => true,
    };
    if needs_update {
        fs::write(header_path, new_content).unwrap();
    }
}
