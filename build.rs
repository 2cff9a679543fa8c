//! Build script for dupescan
//!
//! - Windows: Embeds the application manifest for long path support (>260 chars)
//!
//! Deep trees routinely exceed `MAX_PATH`, and the walker builds absolute
//! paths for every entry. The manifest (`dupescan.manifest`) sets
//! `longPathAware=true`, which together with the Windows 10 v1607+ registry
//! setting allows paths up to 32,767 characters.

fn main() {
    #[cfg(windows)]
    {
        embed_resource::compile("dupescan.rc", embed_resource::NONE);

        println!("cargo:rerun-if-changed=dupescan.rc");
        println!("cargo:rerun-if-changed=dupescan.manifest");
    }
}
