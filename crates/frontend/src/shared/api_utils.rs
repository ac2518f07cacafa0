//! API utilities for the admin sale form
//!
//! The lookup endpoints live next to the admin change/add pages, so their
//! base path is derived from the current page path.

/// Derive the lookup base path from an admin page path
///
/// Example: "/admin/sales/sale/7/change/" and "/admin/sales/sale/add/"
/// both give "/admin/sales/sale/".
pub fn lookup_base_from_path(pathname: &str) -> String {
    if let Some(idx) = pathname.find("/change/") {
        let object_path = &pathname[..idx];
        return match object_path.rfind('/') {
            Some(slash) => object_path[..=slash].to_string(),
            None => "/".to_string(),
        };
    }
    let base = if pathname.contains("/add/") {
        pathname.replacen("add/", "", 1)
    } else {
        pathname.to_string()
    };
    if base.ends_with('/') {
        base
    } else {
        format!("{}/", base)
    }
}

/// Get the lookup base path for the current page
///
/// # Returns
/// - Base path like "/admin/sales/sale/"
/// - "/" if window is not available
pub fn lookup_base() -> String {
    let pathname = web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string());
    lookup_base_from_path(&pathname)
}
