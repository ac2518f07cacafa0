use super::controller::{
    LineRow, OptionsRequest, OrderLinesController, PriceAction, RefreshScope, RowId,
    EMPTY_OPTION_LABEL,
};
use super::model;
use contracts::domain::a025_sale::aggregate::SaleFormBootstrap;
use contracts::domain::a025_sale::lookup::ItemOption;
use contracts::enums::sale_type::SaleType;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// ViewModel for the sale lines form
///
/// Owns the controller in a signal and runs the lookups it asks for.
#[derive(Clone, Copy)]
pub struct SaleLinesViewModel {
    pub controller: RwSignal<OrderLinesController>,
    pub locations: StoredValue<Vec<ItemOption>>,
    lookup_base: StoredValue<String>,
}

impl SaleLinesViewModel {
    pub fn new(bootstrap: SaleFormBootstrap, lookup_base: String) -> Self {
        Self {
            controller: RwSignal::new(OrderLinesController::new(bootstrap.sale)),
            locations: StoredValue::new(bootstrap.locations),
            lookup_base: StoredValue::new(lookup_base),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.controller.with_untracked(|c| c.is_locked())
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.controller.with(|c| c.row_ids())
    }

    /// Read a value of one row (tracked); default if the row is gone
    pub fn with_row<T: Default>(&self, id: RowId, f: impl FnOnce(&LineRow) -> T) -> T {
        self.controller.with(|c| c.row(id).map(f).unwrap_or_default())
    }

    /// Location options for the header select, empty sentinel first
    pub fn location_options(&self) -> Vec<(String, String)> {
        let mut options = vec![(String::new(), EMPTY_OPTION_LABEL.to_string())];
        self.locations.with_value(|locations| {
            options.extend(locations.iter().map(|l| (l.id.clone(), l.name.clone())));
        });
        options
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// First pass after mount
    pub fn initialize(&self) {
        let requests = self
            .controller
            .try_update(|c| c.initialize())
            .unwrap_or_default();
        self.run_options(requests);
    }

    pub fn set_location(&self, value: String) {
        let requests = self
            .controller
            .try_update(|c| c.set_location(Some(value)))
            .unwrap_or_default();
        self.run_options(requests);
    }

    pub fn set_sale_type(&self, code: String) {
        self.controller
            .update(|c| c.set_sale_type(SaleType::from_code(&code)));
    }

    pub fn select_item(&self, id: RowId, value: String) {
        let action = self
            .controller
            .try_update(|c| c.select_item(id, Some(value)))
            .unwrap_or_default();
        self.run_price(action);
    }

    pub fn set_quantity(&self, id: RowId, value: String) {
        self.controller.update(|c| c.set_quantity(id, value));
    }

    pub fn set_unit_price(&self, id: RowId, value: String) {
        self.controller.update(|c| c.set_unit_price(id, value));
    }

    pub fn set_discount(&self, id: RowId, value: String) {
        self.controller.update(|c| c.set_discount(id, value));
    }

    pub fn set_deleted(&self, id: RowId, deleted: bool) {
        self.controller.update(|c| c.set_deleted(id, deleted));
    }

    pub fn add_row(&self) {
        let requests = self
            .controller
            .try_update(|c| {
                c.add_row()
                    .map(|id| c.refresh_item_options(RefreshScope::Row(id)))
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        self.run_options(requests);
    }

    pub fn remove_row(&self, id: RowId) {
        self.controller.update(|c| {
            c.remove_row(id);
        });
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    fn run_options(&self, requests: Vec<OptionsRequest>) {
        for request in requests {
            let controller = self.controller;
            let base = self.lookup_base.get_value();
            spawn_local(async move {
                let result = model::fetch_items_by_location(&base, &request.location_id).await;
                // the form may have been closed while the request was in flight
                let _ = controller.try_update(|c| c.apply_item_options(&request, result));
            });
        }
    }

    fn run_price(&self, action: PriceAction) {
        let PriceAction::Request(request) = action else {
            return;
        };
        let controller = self.controller;
        let base = self.lookup_base.get_value();
        spawn_local(async move {
            let result =
                model::fetch_unit_price(&base, &request.location_id, &request.item_id).await;
            let _ = controller.try_update(|c| c.apply_unit_price(&request, result));
        });
    }
}
