use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GNUCASH_BUILD");
    println!("cargo:rerun-if-env-changed=GLIB_LIB_DIR");

    if env::var_os("CARGO_FEATURE_LINKED").is_none() {
        return;
    }

    let gnucash_build = env::var("GNUCASH_BUILD")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("../gnucash/build"));
    println!(
        "cargo:rustc-link-search=native={}",
        gnucash_build.join("lib").display()
    );
    if let Ok(glib_dir) = env::var("GLIB_LIB_DIR") {
        println!("cargo:rustc-link-search=native={glib_dir}");
    }

    println!("cargo:rustc-link-lib=gnc-engine");
    println!("cargo:rustc-link-lib=glib-2.0");
}
