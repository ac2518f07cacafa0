use crate::domain::a025_sale::ui::details::SaleLinesForm;
use crate::shared::api_utils::lookup_base;
use contracts::domain::a025_sale::aggregate::SaleFormBootstrap;
use leptos::prelude::*;

/// Element the sale form is mounted into
pub const ROOT_ID: &str = "sale-form-root";

/// `<script type="application/json">` with the initial document
pub const BOOTSTRAP_SCRIPT_ID: &str = "sale-form-bootstrap";

/// Parse the bootstrap JSON rendered by the server; a missing or broken
/// script gives an empty draft.
pub fn parse_bootstrap(raw: Option<&str>) -> SaleFormBootstrap {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("invalid sale form bootstrap: {}", e);
            SaleFormBootstrap::default()
        }),
        None => SaleFormBootstrap::default(),
    }
}

pub fn read_bootstrap(document: &web_sys::Document) -> SaleFormBootstrap {
    let raw = document
        .get_element_by_id(BOOTSTRAP_SCRIPT_ID)
        .and_then(|el| el.text_content());
    parse_bootstrap(raw.as_deref())
}

#[component]
pub fn App(bootstrap: SaleFormBootstrap) -> impl IntoView {
    view! {
        <SaleLinesForm bootstrap=bootstrap lookup_base=lookup_base() />
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::enums::sale_type::SaleType;

    #[test]
    fn test_parse_bootstrap() {
        let b = parse_bootstrap(Some(
            r#"{"sale": {"location_id": "1", "sale_type": "CCF",
                "lines": [{"item_id": "4", "item_name": "Cemento", "quantity": "3",
                           "unit_price": "10.00", "discount_percent": "10"}]},
                "locations": [{"id": 1, "name": "Central"}]}"#,
        ));
        assert_eq!(b.sale.sale_type, SaleType::Ccf);
        assert_eq!(b.sale.lines.len(), 1);
        assert_eq!(b.locations[0].id, "1");
        assert_eq!(b.sale.lines[0].item_name.as_deref(), Some("Cemento"));
    }

    #[test]
    fn test_parse_bootstrap_fallbacks() {
        assert!(parse_bootstrap(None).sale.lines.is_empty());
        assert!(parse_bootstrap(Some("  ")).locations.is_empty());
        assert!(parse_bootstrap(Some("{not json")).sale.location_id.is_none());
    }
}
