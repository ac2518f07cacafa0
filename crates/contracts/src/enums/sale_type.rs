use serde::{Deserialize, Serialize};

/// Тип документа продажи
///
/// `Ccf` (Comprobante de Crédito Fiscal) облагается налогом 13% на подытог,
/// `Fcf` (Factura Consumidor Final) отдельного налога не содержит.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SaleType {
    #[default]
    #[serde(rename = "FCF")]
    Fcf,
    #[serde(rename = "CCF")]
    Ccf,
}

impl SaleType {
    /// Получить код типа (значение поля формы)
    pub fn code(&self) -> &'static str {
        match self {
            SaleType::Fcf => "FCF",
            SaleType::Ccf => "CCF",
        }
    }

    /// Получить человекочитаемое название
    pub fn display_name(&self) -> &'static str {
        match self {
            SaleType::Fcf => "Factura Consumidor Final",
            SaleType::Ccf => "Comprobante de Crédito Fiscal",
        }
    }

    pub fn all() -> Vec<SaleType> {
        vec![SaleType::Fcf, SaleType::Ccf]
    }

    /// Парсинг из строки; неизвестный код трактуется как тип без налога
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "CCF" => SaleType::Ccf,
            _ => SaleType::Fcf,
        }
    }

    /// Облагается ли документ налогом
    pub fn is_taxed(&self) -> bool {
        matches!(self, SaleType::Ccf)
    }
}

/// Статус документа продажи
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Черновик (котировка), строки редактируются
    #[default]
    Draft,
    /// Документ проведён, форма только для чтения
    Completed,
}

impl SaleStatus {
    pub fn code(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "draft",
            SaleStatus::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "Borrador (Cotizando)",
            SaleStatus::Completed => "Finalizada (Facturada)",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "completed" => SaleStatus::Completed,
            _ => SaleStatus::Draft,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, SaleStatus::Completed)
    }
}
