//! Order-lines controller for the sale form
//!
//! Holds the whole form (header + lines) as one owned aggregate. Operations
//! never perform I/O: lookups are returned as request descriptors tagged
//! with a [`Ticket`], the caller runs them and feeds the result back through
//! `apply_*`. A response is applied only when its row still exists and its
//! ticket is the latest one issued for that row; anything else is stale.

use contracts::domain::a025_sale::aggregate::{SaleDto, SaleLineDto};
use contracts::domain::a025_sale::lookup::ItemOption;
use contracts::domain::a025_sale::totals::{
    format_amount, format_currency, line_total_from_input, OrderTotals,
};
use contracts::enums::sale_type::{SaleStatus, SaleType};
use std::collections::HashMap;
use std::fmt::Display;

/// Label of the empty sentinel option in the item select
pub const EMPTY_OPTION_LABEL: &str = "---------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u32);

impl Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Состояние обращения к справочнику (для визуальной подсказки)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

/// Состояние строки; `Removed` соответствует отсутствию строки в форме
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Empty,
    Priced,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    pub id: RowId,
    pub item_id: Option<String>,
    pub quantity: String,
    pub unit_price: String,
    pub discount_percent: String,
    pub deleted: bool,
    /// Inert prototype row, never counted
    pub template: bool,
    pub options: Vec<ItemOption>,
    /// Options came from a lookup (not only the seeded selection)
    pub options_loaded: bool,
    pub options_status: LookupStatus,
    pub price_status: LookupStatus,
    /// Formatted line total, e.g. `$27.00`
    pub line_total: String,
}

impl LineRow {
    fn new(id: RowId, line: SaleLineDto, template: bool) -> Self {
        let item_id = line.item_id.filter(|id| !id.is_empty());
        // Seed the selected item so it is visible before options arrive
        let options = match (&item_id, line.item_name) {
            (Some(id), Some(name)) => vec![ItemOption::new(id.clone(), name)],
            _ => Vec::new(),
        };
        let mut row = Self {
            id,
            item_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_percent: line.discount_percent,
            deleted: line.deleted,
            template,
            options,
            options_loaded: false,
            options_status: LookupStatus::Idle,
            price_status: LookupStatus::Idle,
            line_total: String::new(),
        };
        row.recompute();
        row
    }

    pub fn has_item(&self) -> bool {
        self.item_id.is_some()
    }

    pub fn state(&self) -> LineState {
        if self.deleted {
            LineState::Deleted
        } else if self.has_item() {
            LineState::Priced
        } else {
            LineState::Empty
        }
    }

    /// Участвует ли строка в итогах документа
    pub fn is_counted(&self) -> bool {
        !self.template && !self.deleted && self.has_item()
    }

    /// Options for the item select: empty sentinel first
    pub fn select_options(&self) -> Vec<(String, String)> {
        std::iter::once((String::new(), EMPTY_OPTION_LABEL.to_string()))
            .chain(self.options.iter().map(|o| (o.id.clone(), o.name.clone())))
            .collect()
    }

    fn recompute(&mut self) -> f64 {
        let value =
            line_total_from_input(&self.quantity, &self.unit_price, &self.discount_percent);
        self.line_total = format_currency(value);
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleForm {
    pub code: Option<String>,
    pub location_id: Option<String>,
    pub sale_type: SaleType,
    pub status: SaleStatus,
    pub lines: Vec<LineRow>,
    pub totals: OrderTotals,
}

impl SaleForm {
    pub fn subtotal_display(&self) -> String {
        format_amount(self.totals.subtotal)
    }

    pub fn tax_amount_display(&self) -> String {
        format_amount(self.totals.tax_amount)
    }

    pub fn total_display(&self) -> String {
        format_amount(self.totals.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsRequest {
    pub row: RowId,
    pub ticket: Ticket,
    pub location_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub row: RowId,
    pub ticket: Ticket,
    pub location_id: String,
    pub item_id: String,
}

/// Result of a price refresh trigger
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PriceAction {
    /// Nothing to do (no location, unknown row or locked form)
    #[default]
    Skipped,
    /// Item cleared: price zeroed and totals recomputed synchronously
    Cleared,
    Request(PriceRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Failed,
    /// Row removed or a newer request was issued for it
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    Row(RowId),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LookupKind {
    Options,
    Price,
}

#[derive(Debug, Clone)]
pub struct OrderLinesController {
    form: SaleForm,
    next_row: u32,
    next_ticket: u64,
    latest: HashMap<(RowId, LookupKind), Ticket>,
}

impl OrderLinesController {
    pub fn new(sale: SaleDto) -> Self {
        let mut this = Self {
            form: SaleForm {
                code: sale.code,
                location_id: sale.location_id.filter(|id| !id.is_empty()),
                sale_type: sale.sale_type,
                status: sale.status,
                lines: Vec::new(),
                totals: OrderTotals::default(),
            },
            next_row: 0,
            next_ticket: 0,
            latest: HashMap::new(),
        };
        for line in sale.lines {
            this.push_row(line, false);
        }
        this.recompute_order_totals();
        this
    }

    pub fn form(&self) -> &SaleForm {
        &self.form
    }

    pub fn row(&self, id: RowId) -> Option<&LineRow> {
        self.form.lines.iter().find(|r| r.id == id)
    }

    fn row_mut(&mut self, id: RowId) -> Option<&mut LineRow> {
        self.form.lines.iter_mut().find(|r| r.id == id)
    }

    /// Ids of the editable (non-template) rows, in form order
    pub fn row_ids(&self) -> Vec<RowId> {
        self.form
            .lines
            .iter()
            .filter(|r| !r.template)
            .map(|r| r.id)
            .collect()
    }

    pub fn is_locked(&self) -> bool {
        self.form.status.is_locked()
    }

    // ========================================================================
    // Row lifecycle
    // ========================================================================

    fn push_row(&mut self, line: SaleLineDto, template: bool) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.form.lines.push(LineRow::new(id, line, template));
        id
    }

    /// Registers an existing line (e.g. a row already present in the page)
    pub fn add_line(&mut self, line: SaleLineDto) -> RowId {
        let id = self.push_row(line, false);
        self.recompute_order_totals();
        id
    }

    /// Registers the inert prototype row used to clone new lines
    pub fn add_template_row(&mut self) -> RowId {
        self.push_row(SaleLineDto::default(), true)
    }

    /// User action: new blank line. `None` when the sale is locked.
    pub fn add_row(&mut self) -> Option<RowId> {
        if self.is_locked() {
            return None;
        }
        Some(self.add_line(SaleLineDto {
            unit_price: format_amount(0.0),
            discount_percent: format_amount(0.0),
            ..Default::default()
        }))
    }

    /// Destroys the row; in-flight lookups for it become stale
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let before = self.form.lines.len();
        self.form.lines.retain(|r| r.id != id);
        let removed = self.form.lines.len() != before;
        if removed {
            self.latest.retain(|(row, _), _| *row != id);
            self.recompute_order_totals();
        }
        removed
    }

    pub fn set_deleted(&mut self, id: RowId, deleted: bool) {
        if self.is_locked() {
            return;
        }
        if let Some(row) = self.row_mut(id) {
            row.deleted = deleted;
        }
        self.recompute_order_totals();
    }

    // ========================================================================
    // Field edits
    // ========================================================================

    pub fn set_quantity(&mut self, id: RowId, value: String) {
        self.edit_row(id, |row| row.quantity = value);
    }

    pub fn set_unit_price(&mut self, id: RowId, value: String) {
        self.edit_row(id, |row| row.unit_price = value);
    }

    pub fn set_discount(&mut self, id: RowId, value: String) {
        self.edit_row(id, |row| row.discount_percent = value);
    }

    fn edit_row(&mut self, id: RowId, edit: impl FnOnce(&mut LineRow)) {
        if self.is_locked() {
            return;
        }
        let Some(row) = self.row_mut(id) else {
            return;
        };
        edit(row);
        row.recompute();
        self.recompute_order_totals();
    }

    pub fn set_sale_type(&mut self, sale_type: SaleType) {
        if self.is_locked() {
            return;
        }
        self.form.sale_type = sale_type;
        self.recompute_order_totals();
    }

    /// Changes the location and reloads the item options of every row
    pub fn set_location(&mut self, location_id: Option<String>) -> Vec<OptionsRequest> {
        if self.is_locked() {
            return Vec::new();
        }
        self.form.location_id = location_id.filter(|id| !id.is_empty());
        // lookups issued for the previous location no longer apply
        self.latest.clear();
        for row in self.form.lines.iter_mut() {
            row.options_status = LookupStatus::Idle;
            row.price_status = LookupStatus::Idle;
        }
        let requests = self.refresh_item_options(RefreshScope::All);
        self.recompute_order_totals();
        requests
    }

    /// Selects (or clears) the item of a row and triggers the price lookup
    pub fn select_item(&mut self, id: RowId, item_id: Option<String>) -> PriceAction {
        if self.is_locked() {
            return PriceAction::Skipped;
        }
        match self.row_mut(id) {
            Some(row) => row.item_id = item_id.filter(|v| !v.is_empty()),
            None => return PriceAction::Skipped,
        }
        self.refresh_unit_price(id)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    fn issue_ticket(&mut self, row: RowId, kind: LookupKind) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.latest.insert((row, kind), ticket);
        ticket
    }

    /// Consumes the ticket if it is still the latest one for the row
    fn accept(&mut self, row: RowId, kind: LookupKind, ticket: Ticket) -> bool {
        if self.row(row).is_none() || self.latest.get(&(row, kind)) != Some(&ticket) {
            log::debug!("discarding stale {:?} response for {}", kind, row);
            return false;
        }
        self.latest.remove(&(row, kind));
        true
    }

    /// Item option requests for the rows in `scope`; none without a location
    pub fn refresh_item_options(&mut self, scope: RefreshScope) -> Vec<OptionsRequest> {
        let Some(location_id) = self.form.location_id.clone() else {
            return Vec::new();
        };
        let targets: Vec<RowId> = self
            .form
            .lines
            .iter()
            .filter(|r| !r.template)
            .filter(|r| match scope {
                RefreshScope::Row(id) => r.id == id,
                RefreshScope::All => true,
            })
            .map(|r| r.id)
            .collect();

        targets
            .into_iter()
            .map(|row| {
                let ticket = self.issue_ticket(row, LookupKind::Options);
                if let Some(r) = self.row_mut(row) {
                    r.options_status = LookupStatus::Loading;
                }
                OptionsRequest {
                    row,
                    ticket,
                    location_id: location_id.clone(),
                }
            })
            .collect()
    }

    pub fn apply_item_options<E: Display>(
        &mut self,
        request: &OptionsRequest,
        result: Result<Vec<ItemOption>, E>,
    ) -> ApplyOutcome {
        if !self.accept(request.row, LookupKind::Options, request.ticket) {
            return ApplyOutcome::Stale;
        }
        let Some(row) = self.row_mut(request.row) else {
            return ApplyOutcome::Stale;
        };
        match result {
            Ok(items) => {
                // Keep the selection only if the item is still offered
                let dropped = row
                    .item_id
                    .as_ref()
                    .is_some_and(|current| !items.iter().any(|o| &o.id == current));
                if dropped {
                    row.item_id = None;
                    row.price_status = LookupStatus::Idle;
                }
                row.options = items;
                row.options_loaded = true;
                row.options_status = LookupStatus::Idle;
                if dropped {
                    self.latest.remove(&(request.row, LookupKind::Price));
                }
                self.recompute_order_totals();
                ApplyOutcome::Applied
            }
            Err(e) => {
                log::warn!("item options lookup failed for {}: {}", request.row, e);
                row.options_status = LookupStatus::Failed;
                ApplyOutcome::Failed
            }
        }
    }

    /// Price lookup for the row's item. A row without an item gets price
    /// `0.00` immediately, with no request.
    pub fn refresh_unit_price(&mut self, id: RowId) -> PriceAction {
        let location_id = self.form.location_id.clone();
        let Some(row) = self.row_mut(id) else {
            return PriceAction::Skipped;
        };
        if row.template {
            return PriceAction::Skipped;
        }
        let Some(item_id) = row.item_id.clone() else {
            row.unit_price = format_amount(0.0);
            row.price_status = LookupStatus::Idle;
            row.recompute();
            self.latest.remove(&(id, LookupKind::Price));
            self.recompute_order_totals();
            return PriceAction::Cleared;
        };
        let Some(location_id) = location_id else {
            return PriceAction::Skipped;
        };
        row.price_status = LookupStatus::Loading;
        let ticket = self.issue_ticket(id, LookupKind::Price);
        PriceAction::Request(PriceRequest {
            row: id,
            ticket,
            location_id,
            item_id,
        })
    }

    pub fn apply_unit_price<E: Display>(
        &mut self,
        request: &PriceRequest,
        result: Result<f64, E>,
    ) -> ApplyOutcome {
        if !self.accept(request.row, LookupKind::Price, request.ticket) {
            return ApplyOutcome::Stale;
        }
        let Some(row) = self.row_mut(request.row) else {
            return ApplyOutcome::Stale;
        };
        match result {
            Ok(price) => {
                row.unit_price = format_amount(price);
                row.price_status = LookupStatus::Idle;
                row.recompute();
                self.recompute_order_totals();
                ApplyOutcome::Applied
            }
            Err(e) => {
                log::warn!("price lookup failed for {}: {}", request.row, e);
                row.price_status = LookupStatus::Failed;
                ApplyOutcome::Failed
            }
        }
    }

    /// First pass after the page is ready: load options for rows that only
    /// have the seeded selection (or nothing), then recompute everything.
    pub fn initialize(&mut self) -> Vec<OptionsRequest> {
        let mut requests = Vec::new();
        if !self.is_locked() {
            let pending: Vec<RowId> = self
                .form
                .lines
                .iter()
                .filter(|r| !r.template && r.options.len() <= 1)
                .map(|r| r.id)
                .collect();
            for id in pending {
                requests.extend(self.refresh_item_options(RefreshScope::Row(id)));
            }
        }
        for row in self.form.lines.iter_mut() {
            row.recompute();
        }
        self.recompute_order_totals();
        requests
    }

    // ========================================================================
    // Totals
    // ========================================================================

    /// Recomputes and stores the formatted total of one row
    pub fn recompute_row(&mut self, id: RowId) -> f64 {
        self.row_mut(id).map(LineRow::recompute).unwrap_or(0.0)
    }

    /// Recomputes the order totals from scratch over the counted rows
    pub fn recompute_order_totals(&mut self) -> OrderTotals {
        let line_totals: Vec<f64> = self
            .form
            .lines
            .iter_mut()
            .filter(|r| r.is_counted())
            .map(LineRow::recompute)
            .collect();
        self.form.totals = OrderTotals::compute(line_totals, self.form.sale_type);
        self.form.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item: Option<&str>, q: &str, p: &str, d: &str) -> SaleLineDto {
        SaleLineDto {
            item_id: item.map(str::to_string),
            quantity: q.into(),
            unit_price: p.into(),
            discount_percent: d.into(),
            ..Default::default()
        }
    }

    fn sale(location: Option<&str>, sale_type: SaleType, lines: Vec<SaleLineDto>) -> SaleDto {
        SaleDto {
            location_id: location.map(str::to_string),
            sale_type,
            lines,
            ..Default::default()
        }
    }

    fn items() -> Vec<ItemOption> {
        vec![ItemOption::new("1", "Cemento"), ItemOption::new("2", "Arena")]
    }

    fn expect_request(action: PriceAction) -> PriceRequest {
        match action {
            PriceAction::Request(req) => req,
            other => panic!("expected price request, got {:?}", other),
        }
    }

    #[test]
    fn test_line_total_scenario() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "3", "10.00", "10")],
        ));
        let id = c.row_ids()[0];
        assert_eq!(c.recompute_row(id), 27.0);
        assert_eq!(c.row(id).unwrap().line_total, "$27.00");
    }

    #[test]
    fn test_order_totals_with_tax() {
        let c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Ccf,
            vec![
                line(Some("1"), "3", "10.00", "10"),
                line(Some("2"), "1", "15.00", "0"),
            ],
        ));
        let form = c.form();
        assert_eq!(form.subtotal_display(), "42.00");
        assert_eq!(form.tax_amount_display(), "5.46");
        assert_eq!(form.total_display(), "47.46");
    }

    #[test]
    fn test_sale_type_switch_recomputes_tax() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Ccf,
            vec![line(Some("1"), "1", "100", "0")],
        ));
        assert_eq!(c.form().totals.tax_amount, 13.0);
        c.set_sale_type(SaleType::Fcf);
        assert_eq!(c.form().totals.tax_amount, 0.0);
        assert_eq!(c.form().totals.total, 100.0);
    }

    #[test]
    fn test_excluded_rows() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![
                line(Some("1"), "2", "10", "0"),
                line(None, "5", "10", "0"),
            ],
        ));
        let template = c.add_template_row();
        c.row_mut(template).unwrap().item_id = Some("1".into());
        c.row_mut(template).unwrap().quantity = "100".into();
        c.row_mut(template).unwrap().unit_price = "100".into();
        assert_eq!(c.recompute_order_totals().subtotal, 20.0);
        assert!(!c.row_ids().contains(&template));
    }

    #[test]
    fn test_deleted_row_excluded_but_kept() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![
                line(Some("1"), "3", "10.00", "10"),
                line(Some("2"), "1", "15.00", "0"),
            ],
        ));
        let second = c.row_ids()[1];
        c.set_deleted(second, true);
        assert_eq!(c.form().totals.subtotal, 27.0);
        assert_eq!(c.row(second).unwrap().state(), LineState::Deleted);
        assert_eq!(c.form().lines.len(), 2);

        c.set_deleted(second, false);
        assert_eq!(c.form().totals.subtotal, 42.0);
    }

    #[test]
    fn test_field_edits_recompute() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "1", "10", "0")],
        ));
        let id = c.row_ids()[0];
        c.set_quantity(id, "4".into());
        assert_eq!(c.form().totals.subtotal, 40.0);
        c.set_discount(id, "25".into());
        assert_eq!(c.form().totals.subtotal, 30.0);
        c.set_unit_price(id, "abc".into());
        assert_eq!(c.form().totals.subtotal, 0.0);
        assert_eq!(c.row(id).unwrap().line_total, "$0.00");
    }

    #[test]
    fn test_no_location_no_option_requests() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "1", "10", "0")],
        ));
        let id = c.row_ids()[0];
        let req = c.refresh_item_options(RefreshScope::All).remove(0);
        assert_eq!(c.apply_item_options::<String>(&req, Ok(items())), ApplyOutcome::Applied);

        let requests = c.set_location(None);
        assert!(requests.is_empty());
        assert_eq!(c.row(id).unwrap().options, items());
        assert!(c.refresh_item_options(RefreshScope::Row(id)).is_empty());
    }

    #[test]
    fn test_location_change_refreshes_all_rows() {
        let mut c = OrderLinesController::new(sale(
            None,
            SaleType::Fcf,
            vec![line(None, "", "", ""), line(None, "", "", "")],
        ));
        c.add_template_row();
        let requests = c.set_location(Some("7".into()));
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.location_id == "7"));
        for req in &requests {
            assert_eq!(c.row(req.row).unwrap().options_status, LookupStatus::Loading);
        }
    }

    #[test]
    fn test_options_keep_selection_when_present() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("2"), "1", "10", "0")],
        ));
        let req = c.refresh_item_options(RefreshScope::All).remove(0);
        c.apply_item_options::<String>(&req, Ok(items()));
        let row = c.row(req.row).unwrap();
        assert_eq!(row.item_id.as_deref(), Some("2"));
        assert_eq!(row.select_options()[0], (String::new(), EMPTY_OPTION_LABEL.to_string()));
        assert_eq!(row.select_options().len(), 3);
    }

    #[test]
    fn test_options_drop_missing_selection() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("9"), "1", "10", "0")],
        ));
        assert_eq!(c.form().totals.subtotal, 10.0);
        let req = c.refresh_item_options(RefreshScope::All).remove(0);
        c.apply_item_options::<String>(&req, Ok(items()));
        assert_eq!(c.row(req.row).unwrap().item_id, None);
        assert_eq!(c.form().totals.subtotal, 0.0);
    }

    #[test]
    fn test_options_failure_keeps_previous() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "1", "10", "0")],
        ));
        let req = c.refresh_item_options(RefreshScope::All).remove(0);
        c.apply_item_options::<String>(&req, Ok(items()));

        let req = c.refresh_item_options(RefreshScope::All).remove(0);
        let outcome = c.apply_item_options(&req, Err("HTTP 500"));
        assert_eq!(outcome, ApplyOutcome::Failed);
        let row = c.row(req.row).unwrap();
        assert_eq!(row.options, items());
        assert_eq!(row.options_status, LookupStatus::Failed);
    }

    #[test]
    fn test_stale_options_response_discarded() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(None, "", "", "")],
        ));
        let first = c.refresh_item_options(RefreshScope::All).remove(0);
        let second = c.refresh_item_options(RefreshScope::All).remove(0);

        let newer = vec![ItemOption::new("5", "Hierro")];
        assert_eq!(c.apply_item_options::<String>(&second, Ok(newer.clone())), ApplyOutcome::Applied);
        assert_eq!(c.apply_item_options::<String>(&first, Ok(items())), ApplyOutcome::Stale);
        assert_eq!(c.row(first.row).unwrap().options, newer);
    }

    #[test]
    fn test_response_for_removed_row_discarded() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "1", "10", "0")],
        ));
        let id = c.row_ids()[0];
        let options = c.refresh_item_options(RefreshScope::Row(id)).remove(0);
        let price = expect_request(c.refresh_unit_price(id));
        assert!(c.remove_row(id));
        assert_eq!(c.apply_item_options::<String>(&options, Ok(items())), ApplyOutcome::Stale);
        assert_eq!(c.apply_unit_price::<String>(&price, Ok(5.0)), ApplyOutcome::Stale);
        assert!(c.form().lines.is_empty());
        assert_eq!(c.form().totals.subtotal, 0.0);
    }

    #[test]
    fn test_select_item_fetches_price() {
        let mut c = OrderLinesController::new(sale(Some("3"), SaleType::Ccf, vec![]));
        let id = c.add_row().unwrap();
        c.set_quantity(id, "2".into());
        let req = expect_request(c.select_item(id, Some("1".into())));
        assert_eq!(req.location_id, "3");
        assert_eq!(req.item_id, "1");
        assert_eq!(c.row(id).unwrap().price_status, LookupStatus::Loading);

        assert_eq!(c.apply_unit_price::<String>(&req, Ok(12.5)), ApplyOutcome::Applied);
        let row = c.row(id).unwrap();
        assert_eq!(row.unit_price, "12.50");
        assert_eq!(row.line_total, "$25.00");
        assert_eq!(row.state(), LineState::Priced);
        assert_eq!(c.form().totals.total, 28.25);
    }

    #[test]
    fn test_clearing_item_zeroes_price_synchronously() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "2", "10", "0")],
        ));
        let id = c.row_ids()[0];
        let pending = expect_request(c.refresh_unit_price(id));

        assert_eq!(c.select_item(id, None), PriceAction::Cleared);
        let row = c.row(id).unwrap();
        assert_eq!(row.unit_price, "0.00");
        assert_eq!(row.line_total, "$0.00");
        assert_eq!(row.state(), LineState::Empty);
        assert_eq!(c.form().totals.subtotal, 0.0);

        // late response for the cleared item must not resurrect the price
        assert_eq!(c.apply_unit_price::<String>(&pending, Ok(10.0)), ApplyOutcome::Stale);
        assert_eq!(c.row(id).unwrap().unit_price, "0.00");
    }

    #[test]
    fn test_price_without_location_is_noop() {
        let mut c = OrderLinesController::new(sale(None, SaleType::Fcf, vec![]));
        let id = c.add_row().unwrap();
        assert_eq!(c.select_item(id, Some("1".into())), PriceAction::Skipped);
        assert_eq!(c.row(id).unwrap().price_status, LookupStatus::Idle);
    }

    #[test]
    fn test_price_failure_keeps_previous_price() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("1"), "1", "8.00", "0")],
        ));
        let id = c.row_ids()[0];
        let req = expect_request(c.select_item(id, Some("2".into())));
        assert_eq!(c.apply_unit_price(&req, Err("network")), ApplyOutcome::Failed);
        let row = c.row(id).unwrap();
        assert_eq!(row.unit_price, "8.00");
        assert_eq!(row.price_status, LookupStatus::Failed);
    }

    #[test]
    fn test_latest_price_request_wins() {
        let mut c = OrderLinesController::new(sale(Some("1"), SaleType::Fcf, vec![]));
        let id = c.add_row().unwrap();
        c.set_quantity(id, "1".into());
        let first = expect_request(c.select_item(id, Some("1".into())));
        let second = expect_request(c.select_item(id, Some("2".into())));
        assert_eq!(c.apply_unit_price::<String>(&second, Ok(20.0)), ApplyOutcome::Applied);
        assert_eq!(c.apply_unit_price::<String>(&first, Ok(10.0)), ApplyOutcome::Stale);
        assert_eq!(c.form().totals.subtotal, 20.0);
    }

    #[test]
    fn test_initialize_loads_rows_without_options() {
        let mut seeded = line(Some("1"), "1", "10", "0");
        seeded.item_name = Some("Cemento".into());
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![seeded, line(None, "", "", "")],
        ));
        c.add_template_row();
        let first = c.row_ids()[0];
        assert_eq!(c.row(first).unwrap().options.len(), 1);

        let requests = c.initialize();
        assert_eq!(requests.len(), 2);
        assert_eq!(c.form().totals.subtotal, 10.0);
    }

    #[test]
    fn test_locked_sale_ignores_edits() {
        let mut dto = sale(Some("1"), SaleType::Fcf, vec![line(Some("1"), "1", "10", "0")]);
        dto.status = SaleStatus::Completed;
        let mut c = OrderLinesController::new(dto);
        let id = c.row_ids()[0];

        assert!(c.add_row().is_none());
        c.set_quantity(id, "5".into());
        c.set_deleted(id, true);
        assert_eq!(c.select_item(id, None), PriceAction::Skipped);
        assert!(c.set_location(Some("2".into())).is_empty());
        assert!(c.initialize().is_empty());
        assert_eq!(c.form().totals.subtotal, 10.0);
        assert_eq!(c.form().location_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_location_change_discards_pending_price() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("9"), "1", "5.00", "0")],
        ));
        let id = c.row_ids()[0];
        let price = expect_request(c.refresh_unit_price(id));
        assert_eq!(price.location_id, "1");

        let options = c.set_location(Some("2".into())).remove(0);
        assert_eq!(c.row(id).unwrap().price_status, LookupStatus::Idle);
        assert_eq!(c.apply_unit_price::<String>(&price, Ok(99.0)), ApplyOutcome::Stale);
        assert_eq!(c.row(id).unwrap().unit_price, "5.00");

        assert_eq!(c.apply_item_options::<String>(&options, Ok(items())), ApplyOutcome::Applied);
        assert_eq!(c.row(id).unwrap().item_id, None);
    }

    #[test]
    fn test_dropped_item_discards_pending_price() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(Some("9"), "1", "5.00", "0")],
        ));
        let id = c.row_ids()[0];
        let options = c.refresh_item_options(RefreshScope::Row(id)).remove(0);
        let price = expect_request(c.refresh_unit_price(id));

        assert_eq!(c.apply_item_options::<String>(&options, Ok(items())), ApplyOutcome::Applied);
        let row = c.row(id).unwrap();
        assert_eq!(row.item_id, None);
        assert_eq!(row.price_status, LookupStatus::Idle);

        assert_eq!(c.apply_unit_price::<String>(&price, Ok(99.0)), ApplyOutcome::Stale);
        assert_eq!(c.row(id).unwrap().unit_price, "5.00");
    }

    #[test]
    fn test_cleared_location_keeps_existing_options() {
        let mut c = OrderLinesController::new(sale(
            Some("1"),
            SaleType::Fcf,
            vec![line(None, "", "", "")],
        ));
        let id = c.row_ids()[0];
        let first = c.refresh_item_options(RefreshScope::Row(id)).remove(0);
        assert_eq!(c.apply_item_options::<String>(&first, Ok(items())), ApplyOutcome::Applied);

        let pending = c.refresh_item_options(RefreshScope::Row(id)).remove(0);
        assert!(c.set_location(None).is_empty());
        let other = vec![ItemOption::new("5", "Hierro")];
        assert_eq!(c.apply_item_options::<String>(&pending, Ok(other)), ApplyOutcome::Stale);

        let row = c.row(id).unwrap();
        assert_eq!(row.options, items());
        assert_eq!(row.options_status, LookupStatus::Idle);
    }

    #[test]
    fn test_options_loaded_only_after_lookup() {
        let mut seeded = line(Some("1"), "1", "10", "0");
        seeded.item_name = Some("Cemento".into());
        let mut c = OrderLinesController::new(sale(None, SaleType::Fcf, vec![seeded]));
        let id = c.row_ids()[0];
        assert!(c.initialize().is_empty());
        assert!(!c.row(id).unwrap().options_loaded);

        let req = c.set_location(Some("1".into())).remove(0);
        c.apply_item_options::<&str>(&req, Err("HTTP 502"));
        assert!(!c.row(id).unwrap().options_loaded);

        let req = c.refresh_item_options(RefreshScope::Row(id)).remove(0);
        c.apply_item_options::<String>(&req, Ok(items()));
        assert!(c.row(id).unwrap().options_loaded);
    }
}
