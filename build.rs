//! Stamps the binary with its build time. `LODM_BUILD_STAMP` overrides it
//! for reproducible builds.

use time::format_description::well_known::Rfc3339;

fn main() {
    println!("cargo:rerun-if-env-changed=LODM_BUILD_STAMP");
    let stamp = std::env::var("LODM_BUILD_STAMP").unwrap_or_else(|_| {
        let now = time::OffsetDateTime::now_utc().replace_nanosecond(0);
        match now {
            Ok(now) => now.format(&Rfc3339).unwrap_or_else(|_| "unknown".into()),
            Err(_) => "unknown".into(),
        }
    });
    println!("cargo:rustc-env=LODM_BUILD_STAMP={stamp}");
}
