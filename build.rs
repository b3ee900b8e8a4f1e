use std::env;
use std::path::PathBuf;

fn main() {
    // Only regenerate the header when the FFI source changes.
    println!("cargo:rerun-if-changed=src/ffi.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let crate_dir = PathBuf::from(crate_dir);

    let output_file = crate_dir.join("include").join("cookbook_forge.h");

    let config = match cbindgen::Config::from_file(crate_dir.join("cbindgen.toml")) {
        Ok(config) => config,
        Err(e) => {
            println!("cargo:warning=skipping C header generation: {e}");
            return;
        }
    };

    if let Some(parent) = output_file.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            println!("cargo:warning=skipping C header generation: {e}");
            return;
        }
    }

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&output_file);
        }
        Err(e) => println!("cargo:warning=cbindgen failed to generate bindings: {e}"),
    }
}
