//! Generates `u_compare.h` for the C FFI surface.
//!
//! The header always lands in `OUT_DIR`. A copy is also written to
//! `include/` inside the crate, or to `U_COMPARE_HEADER_DIR` when set.

use std::env;
use std::path::PathBuf;

const HEADER: &str = "u_compare.h";

fn main() {
    println!("cargo:rerun-if-changed=src/ffi.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");
    println!("cargo:rerun-if-env-changed=U_COMPARE_HEADER_DIR");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=cargo build variables missing, skipping C header");
        return;
    };
    let config = cbindgen::Config::from_file(PathBuf::from(&crate_dir).join("cbindgen.toml"))
        .unwrap_or_default();

    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(b) => b,
        Err(e) => {
            println!("cargo:warning=C header not generated: {e}");
            return;
        }
    };

    bindings.write_to_file(PathBuf::from(out_dir).join(HEADER));

    let copy_dir = env::var_os("U_COMPARE_HEADER_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&crate_dir).join("include"));
    if std::fs::create_dir_all(&copy_dir).is_ok() {
        bindings.write_to_file(copy_dir.join(HEADER));
    }
}
