//! Арифметика строк и итогов документа продажи
//!
//! Все суммы накапливаются в целых центах: итог строки округляется до цента
//! до суммирования, поэтому `total == subtotal + tax_amount` выполняется точно.

use crate::enums::sale_type::SaleType;
use serde::{Deserialize, Serialize};

/// Ставка налога для `SaleType::Ccf`
pub const TAX_RATE: f64 = 0.13;

/// Верхняя граница суммы в центах (10^13 в валюте документа).
///
/// Держит итоги в пределах `i64` и точного представления в `f64`.
pub const MAX_CENTS: i64 = 1_000_000_000_000_000;

/// Разбор числового поля формы.
///
/// Берётся самый длинный числовой префикс (как `parseFloat`), запятая
/// принимается как десятичный разделитель, экспонента (`1e3`) учитывается,
/// если за ней есть цифры. Пустое, нечисловое, отрицательное или
/// бесконечное значение даёт 0.
pub fn parse_amount(raw: &str) -> f64 {
    let s = raw.trim();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut seen_digit = false;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' | b',' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while matches!(bytes.get(exp_end), Some(b'0'..=b'9')) {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    let value = s[..end].replace(',', ".").parse::<f64>().unwrap_or(0.0);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Округление неотрицательной суммы до центов (половина вверх)
pub fn to_cents(value: f64) -> i64 {
    // 1e-7 гасит ошибку представления вида 1.005 * 100 = 100.49999...
    (value * 100.0 + 1e-7).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Сумма в центах, ограниченная диапазоном `0..=MAX_CENTS`
fn bounded_cents(value: f64) -> i64 {
    to_cents(value).clamp(0, MAX_CENTS)
}

/// Сумма строки: `quantity × unit_price × (1 − discount/100)`.
///
/// Скидка ограничивается диапазоном 0..=100, поэтому результат не бывает
/// отрицательным.
pub fn line_total(quantity: f64, unit_price: f64, discount_percent: f64) -> f64 {
    let quantity = quantity.max(0.0);
    let unit_price = unit_price.max(0.0);
    let discount = discount_percent.clamp(0.0, 100.0);
    let gross = quantity * unit_price;
    gross - gross * (discount / 100.0)
}

/// Сумма строки из сырых значений полей формы, округлённая до цента
pub fn line_total_from_input(quantity: &str, unit_price: &str, discount_percent: &str) -> f64 {
    from_cents(bounded_cents(line_total(
        parse_amount(quantity),
        parse_amount(unit_price),
        parse_amount(discount_percent),
    )))
}

/// Итоги документа
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl OrderTotals {
    /// Пересчёт итогов по суммам включённых строк (всегда с нуля)
    pub fn compute<I>(line_totals: I, sale_type: SaleType) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let subtotal_cents = line_totals
            .into_iter()
            .map(bounded_cents)
            .fold(0i64, i64::saturating_add)
            .min(MAX_CENTS);
        let tax_cents = if sale_type.is_taxed() {
            to_cents(from_cents(subtotal_cents) * TAX_RATE)
        } else {
            0
        };
        Self {
            subtotal: from_cents(subtotal_cents),
            tax_amount: from_cents(tax_cents),
            total: from_cents(subtotal_cents + tax_cents),
        }
    }
}

/// Формат суммы с двумя знаками после точки
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Формат суммы строки для отображения: `$27.00`
pub fn format_currency(value: f64) -> String {
    format!("${:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("3"), 3.0);
        assert_eq!(parse_amount(" 10.50 "), 10.5);
        assert_eq!(parse_amount("2,5"), 2.5);
        assert_eq!(parse_amount("7abc"), 7.0);
        assert_eq!(parse_amount(".5"), 0.5);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("-4"), 0.0);
        assert_eq!(parse_amount("."), 0.0);
    }

    #[test]
    fn test_parse_amount_exponent() {
        assert_eq!(parse_amount("1e3"), 1000.0);
        assert_eq!(parse_amount("2.5E-1"), 0.25);
        assert_eq!(parse_amount("1e"), 1.0);
        assert_eq!(parse_amount("3e+x"), 3.0);
        assert_eq!(parse_amount("1e400"), 0.0);
    }

    #[test]
    fn test_line_total_with_discount() {
        assert_eq!(line_total_from_input("3", "10.00", "10"), 27.0);
        assert_eq!(line_total_from_input("1", "15", ""), 15.0);
        assert_eq!(line_total_from_input("", "15", "0"), 0.0);
    }

    #[test]
    fn test_line_total_never_negative() {
        assert_eq!(line_total(2.0, 5.0, 150.0), 0.0);
        assert_eq!(line_total(-2.0, 5.0, 0.0), 0.0);
        for q in [0.0, 0.5, 1.0, 3.0, 17.25] {
            for p in [0.0, 0.99, 10.0, 123.45] {
                for d in [0.0, 10.0, 33.3, 100.0] {
                    assert!(line_total(q, p, d) >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_totals_with_tax() {
        let totals = OrderTotals::compute([27.0, 15.0], SaleType::Ccf);
        assert_eq!(format_amount(totals.subtotal), "42.00");
        assert_eq!(format_amount(totals.tax_amount), "5.46");
        assert_eq!(format_amount(totals.total), "47.46");
    }

    #[test]
    fn test_totals_without_tax() {
        let totals = OrderTotals::compute([27.0, 15.0], SaleType::Fcf);
        assert_eq!(totals.subtotal, 42.0);
        assert_eq!(totals.tax_amount, 0.0);
        assert_eq!(totals.total, 42.0);
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let totals = OrderTotals::compute([0.1, 0.2, 19.99, 3.33], SaleType::Ccf);
        assert_eq!(
            to_cents(totals.total),
            to_cents(totals.subtotal) + to_cents(totals.tax_amount)
        );
        assert_eq!(format_amount(totals.subtotal), "23.62");
        assert_eq!(format_amount(totals.tax_amount), "3.07");
    }

    #[test]
    fn test_huge_quantity_is_capped() {
        let huge = line_total_from_input("99999999999999999999", "1000", "0");
        assert_eq!(to_cents(huge), MAX_CENTS);

        let totals = OrderTotals::compute([huge, huge, 5.0], SaleType::Ccf);
        assert_eq!(to_cents(totals.subtotal), MAX_CENTS);
        assert!(totals.total > totals.subtotal);
        assert_eq!(
            to_cents(totals.total),
            to_cents(totals.subtotal) + to_cents(totals.tax_amount)
        );
    }

    #[test]
    fn test_half_cent_rounds_up() {
        assert_eq!(to_cents(1.005), 101);
        assert_eq!(to_cents(2.675), 268);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_currency(27.0), "$27.00");
        assert_eq!(format_amount(0.0), "0.00");
    }
}
