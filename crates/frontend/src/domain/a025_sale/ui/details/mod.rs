//! Sale Details UI Module
//!
//! MVVM pattern with a sans-IO controller:
//! - controller.rs: form state, line/total arithmetic, lookup tickets
//! - model.rs: lookup API functions (items by location, unit price)
//! - view_model.rs: ViewModel running the controller's lookups
//! - view.rs: Leptos component (pure UI)
//! - enhancer.rs: the same controller bound to the server-rendered admin form
//! - config.rs: selectors and lookup base for the enhancer

pub mod config;
pub mod controller;
pub mod enhancer;
mod model;
mod view;
mod view_model;

pub use config::SaleFormConfig;
pub use model::LookupError;
pub use view::SaleLinesForm;
pub use view_model::SaleLinesViewModel;
