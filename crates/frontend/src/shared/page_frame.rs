//! PageFrame — root wrapper for a mounted form.
//!
//! Sets `id` (`"{entity}--{category}"`, e.g. `"a025_sale--detail"`) and
//! `data-page-category` on the root element so the page can be located from
//! the server template and styled with the `page--{category}` modifier.

use leptos::prelude::*;

#[component]
pub fn PageFrame(
    /// HTML id in format `{entity}--{category}`
    page_id: &'static str,
    /// Page category, e.g. "detail"
    category: &'static str,
    children: Children,
) -> impl IntoView {
    view! {
        <div
            id=page_id
            class=format!("page page--{}", category)
            data-page-category=category
        >
            {children()}
        </div>
    }
}
