use crate::shared::api_utils::lookup_base;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

/// Настройки привязки контроллера к форме продажи
///
/// Все поля необязательны при передаче из JS: отсутствующие берутся из
/// `Default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleFormConfig {
    /// Base path of the lookup endpoints; derived from the page path if unset
    pub lookup_base: Option<String>,
    /// Name of the inline formset reported by `formset:added`
    pub formset_name: String,
    /// Selector matching every line row (including the template row)
    pub row_selector: String,
    /// Class marking the template row
    pub template_class: String,
    pub location_selector: String,
    pub sale_type_selector: String,
    pub status_selector: String,
    /// Delay before the first pass, lets the admin inline widget finish
    pub init_delay_ms: u32,
}

impl Default for SaleFormConfig {
    fn default() -> Self {
        Self {
            lookup_base: None,
            formset_name: "details".to_string(),
            row_selector: ".dynamic-details".to_string(),
            template_class: "empty-form".to_string(),
            location_selector: "#id_branch".to_string(),
            sale_type_selector: "#id_sale_type".to_string(),
            status_selector: "#id_status".to_string(),
            init_delay_ms: 500,
        }
    }
}

impl SaleFormConfig {
    /// Config from an optional JS object; invalid input falls back to defaults
    pub fn from_js(value: JsValue) -> Self {
        if value.is_undefined() || value.is_null() {
            return Self::default();
        }
        serde_wasm_bindgen::from_value(value).unwrap_or_else(|e| {
            log::warn!("invalid sale form config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn resolved_lookup_base(&self) -> String {
        self.lookup_base
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(lookup_base)
    }
}
