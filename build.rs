//! Build script - puts the linker script where the linker can find it and
//! adds the cortex-m-rt / defmt link arguments for the firmware binary.
//! Host builds (unit and integration tests) skip all of it.

fn main() {
    #[cfg(feature = "embedded")]
    {
        use std::env;
        use std::fs;
        use std::path::PathBuf;

        let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

        // Copy memory.x to OUT_DIR
        fs::copy("memory.x", out_dir.join("memory.x")).unwrap();

        // Tell cargo to look for linker scripts in OUT_DIR
        println!("cargo:rustc-link-search={}", out_dir.display());
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

        // Rebuild if the linker script changes
        println!("cargo:rerun-if-changed=memory.x");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
