use super::lookup::ItemOption;
use crate::enums::sale_type::{SaleStatus, SaleType};
use serde::{Deserialize, Serialize};

/// Строка табличной части документа продажи
///
/// Числовые поля хранятся как введённый текст, разбор выполняется при
/// пересчёте (`totals::parse_amount`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaleLineDto {
    /// ID товара; `None`, пока товар не выбран
    #[serde(default)]
    pub item_id: Option<String>,

    /// Наименование выбранного товара (для отображения до загрузки списка)
    #[serde(default)]
    pub item_name: Option<String>,

    /// Количество
    #[serde(default)]
    pub quantity: String,

    /// Цена за единицу
    #[serde(default)]
    pub unit_price: String,

    /// Скидка, %
    #[serde(default)]
    pub discount_percent: String,

    /// Отмечена на удаление (строка остаётся в форме до сохранения)
    #[serde(default)]
    pub deleted: bool,
}

/// Документ продажи в том виде, в котором его отдаёт серверная форма
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaleDto {
    /// Код документа (напр. "SLE-20240315-00007"); пусто для нового
    #[serde(default)]
    pub code: Option<String>,

    /// ID филиала
    #[serde(default)]
    pub location_id: Option<String>,

    #[serde(default)]
    pub sale_type: SaleType,

    #[serde(default)]
    pub status: SaleStatus,

    #[serde(default)]
    pub lines: Vec<SaleLineDto>,
}

/// Начальные данные страницы: документ и справочник филиалов
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFormBootstrap {
    #[serde(default)]
    pub sale: SaleDto,

    #[serde(default)]
    pub locations: Vec<ItemOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_fields_default_when_missing() {
        let line: SaleLineDto = serde_json::from_str(r#"{"item_id": "4", "quantity": "3"}"#).unwrap();
        assert_eq!(line.item_id.as_deref(), Some("4"));
        assert_eq!(line.quantity, "3");
        assert!(line.unit_price.is_empty());
        assert!(line.item_name.is_none());
        assert!(!line.deleted);
    }

    #[test]
    fn test_bootstrap_defaults() {
        let b: SaleFormBootstrap =
            serde_json::from_str(r#"{"sale": {"location_id": "2", "sale_type": "CCF"}}"#).unwrap();
        assert_eq!(b.sale.location_id.as_deref(), Some("2"));
        assert_eq!(b.sale.sale_type, SaleType::Ccf);
        assert_eq!(b.sale.status, SaleStatus::Draft);
        assert!(b.sale.lines.is_empty());
        assert!(b.locations.is_empty());
    }
}
