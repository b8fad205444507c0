use std::{env, str::FromStr};

// Mirror the gdal crate's version cfgs so version-gated items like
// `GdalDataType::Int8` (GDAL >= 3.7) can be matched conditionally.
fn main() {
    let gdal_version_string = env::var("DEP_GDAL_VERSION_NUMBER")
        .expect("The gdal-sys crate must emit the version of libgdal via cargo:version_number");

    // GDAL_COMPUTE_VERSION(maj,min,rev) = maj*1000000 + min*10000 + rev*100
    let gdal_version = i64::from_str(&gdal_version_string)
        .expect("Could not convert gdal version string into number.");
    let major = gdal_version / 1000000;
    let minor = (gdal_version - major * 1000000) / 10000;

    println!("cargo::rustc-check-cfg=cfg(major_ge_3)");
    println!("cargo::rustc-check-cfg=cfg(major_ge_4)");
    println!("cargo::rustc-check-cfg=cfg(minor_ge_7)");

    for major in 3..=major {
        println!("cargo:rustc-cfg=major_ge_{major}");
    }
    for minor in 0..=minor {
        println!("cargo:rustc-cfg=minor_ge_{minor}");
    }
}
