pub mod app;
pub mod domain;
pub mod shared;

use app::App;
use domain::a025_sale::ui::details::enhancer;
use domain::a025_sale::ui::details::SaleFormConfig;
use leptos::prelude::*;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsCast;

/// Mount the Leptos form into `#sale-form-root` if the page has one,
/// otherwise bind to the server-rendered admin form if present.
pub fn hydrate() {
    // initializes logging using the `log` crate
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };

    if let Some(root) = document
        .get_element_by_id(app::ROOT_ID)
        .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
    {
        let bootstrap = app::read_bootstrap(&document);
        leptos::mount::mount_to(root, move || view! { <App bootstrap=bootstrap /> }).forget();
        return;
    }

    let config = SaleFormConfig::default();
    if enhancer::page_has_sale_form(&document, &config) {
        enhancer::attach(config);
    } else {
        log::debug!("no sale form on this page");
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    hydrate();
}
