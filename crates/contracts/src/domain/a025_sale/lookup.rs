use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Item options
// ============================================================================

/// Товар, доступный в выбранном филиале (элемент выпадающего списка)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOption {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

impl ItemOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Query для `get-products-by-branch/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsByLocationQuery {
    pub branch_id: String,
}

/// Ответ `get-products-by-branch/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemsByLocationResponse {
    #[serde(default)]
    pub products: Vec<ItemOption>,
}

// ============================================================================
// Unit price
// ============================================================================

/// Query для `get-product-price/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPriceQuery {
    pub branch_id: String,
    pub product_id: String,
}

/// Ответ `get-product-price/`; цена приходит строкой ("12.50") или числом
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPriceResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
}

impl UnitPriceResponse {
    /// Цена как число; `None`, если значение не распознано
    pub fn price_value(&self) -> Option<f64> {
        self.price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
