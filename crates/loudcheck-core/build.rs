fn main() {
    let now = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=BUILD_DATE={}", now);

    // Resolved by the platform's dynamic linker; no search paths are injected
    #[cfg(feature = "libebur128")]
    println!("cargo:rustc-link-lib=dylib=ebur128");
}
