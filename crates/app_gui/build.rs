use std::env;

fn main() {
    let version = env::var("AUTOVISION_VERSION")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rerun-if-env-changed=AUTOVISION_VERSION");
    println!("cargo:rustc-env=AUTOVISION_VERSION={version}");
}
