//! Version command handler

/// Display version information
pub fn display_version() {
    println!("kubediscovery {}", env!("CARGO_PKG_VERSION"));
    println!("  {}", env!("CARGO_PKG_DESCRIPTION"));
    println!("  License: {}", env!("CARGO_PKG_LICENSE"));
    if let Some(context) = crate::kube::current_context() {
        println!("  Current context: {}", context);
    }
}
