//! Binds the order-lines controller to the server-rendered admin sale form
//!
//! Listeners are delegated: one per event type on `document`, dispatched by
//! matching the event target against the row/field selectors. Rows created
//! later by the admin inline widget are picked up through `formset:added`
//! (or lazily on their first event), so nothing is bound per row.

use super::config::SaleFormConfig;
use super::controller::{
    LineRow, LookupStatus, OptionsRequest, OrderLinesController, PriceAction, RefreshScope, RowId,
};
use super::model;
use contracts::domain::a025_sale::aggregate::{SaleDto, SaleLineDto};
use contracts::enums::sale_type::{SaleStatus, SaleType};
use gloo_timers::future::TimeoutFuture;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    CustomEvent, Document, Element, Event, HtmlElement, HtmlInputElement, HtmlOptionElement,
    HtmlSelectElement,
};

const ROW_ID_ATTR: &str = "data-sale-row";

const PRODUCT_SELECT: &str = ".field-product select";
const QUANTITY_INPUT: &str = ".field-quantity input";
const PRICE_INPUT: &str = ".field-price input";
const PRICE_READONLY: &str = ".field-price .readonly";
const DISCOUNT_INPUT: &str = ".field-discount input";
const DELETE_CHECKBOX: &str = ".delete input[type=\"checkbox\"]";
const ROW_TOTAL: &str = ".field-row_total_display .readonly";
const SUBTOTAL: &str = ".field-subtotal .readonly";
const TAX_AMOUNT: &str = ".field-tax_amount .readonly";
const TOTAL: &str = ".field-total .readonly";

thread_local! {
    static ATTACHED: Cell<bool> = const { Cell::new(false) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowField {
    Quantity,
    Price,
    Discount,
}

struct Enhancer {
    config: SaleFormConfig,
    lookup_base: String,
    document: Document,
    controller: RefCell<OrderLinesController>,
}

/// Attach the controller to the admin sale form on the current page.
///
/// `config` is an optional JS object with [`SaleFormConfig`] fields. Calling
/// it more than once is a no-op.
#[wasm_bindgen]
pub fn attach_sale_form(config: JsValue) {
    attach(SaleFormConfig::from_js(config));
}

pub fn attach(config: SaleFormConfig) {
    if ATTACHED.with(|a| a.replace(true)) {
        log::debug!("sale form already attached");
        return;
    }
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        log::warn!("sale form: no document available");
        return;
    };

    let lookup_base = config.resolved_lookup_base();
    let header = read_header(&document, &config);
    let enhancer = Rc::new(Enhancer {
        config,
        lookup_base,
        document,
        controller: RefCell::new(OrderLinesController::new(header)),
    });

    enhancer.register_existing_rows();
    enhancer.bind();
    log::info!(
        "sale form attached: {} rows, lookup base {}",
        enhancer.controller.borrow().row_ids().len(),
        enhancer.lookup_base
    );

    let delay = enhancer.config.init_delay_ms;
    spawn_local(async move {
        TimeoutFuture::new(delay).await;
        let requests = enhancer.controller.borrow_mut().initialize();
        enhancer.render_all();
        enhancer.run_options(requests);
    });
}

/// Whether the current page looks like the admin sale form
pub fn page_has_sale_form(document: &Document, config: &SaleFormConfig) -> bool {
    query(document, &config.location_selector).is_some()
        && query(document, &config.row_selector).is_some()
}

fn read_header(document: &Document, config: &SaleFormConfig) -> SaleDto {
    let location_id = query(document, &config.location_selector)
        .map(|el| control_value(&el))
        .filter(|v| !v.is_empty());
    let sale_type = query(document, &config.sale_type_selector)
        .map(|el| SaleType::from_code(&control_value(&el)))
        .unwrap_or_default();
    // a completed sale renders its status as read-only text, not a select
    let status = query(document, &config.status_selector)
        .map(|el| SaleStatus::from_code(&control_value(&el)))
        .unwrap_or_else(|| {
            if query(document, PRODUCT_SELECT).is_some() {
                SaleStatus::Draft
            } else {
                SaleStatus::Completed
            }
        });
    SaleDto {
        location_id,
        sale_type,
        status,
        ..Default::default()
    }
}

impl Enhancer {
    // ------------------------------------------------------------------------
    // Row registry
    // ------------------------------------------------------------------------

    fn register_existing_rows(&self) {
        let Ok(rows) = self.document.query_selector_all(&self.config.row_selector) else {
            return;
        };
        for i in 0..rows.length() {
            if let Some(el) = rows.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                self.register_row(&el);
            }
        }
    }

    fn is_template(&self, row_el: &Element) -> bool {
        row_el.class_list().contains(&self.config.template_class)
    }

    /// Registers a DOM row with the controller, replacing any id copied from
    /// the template when the row was cloned.
    fn register_row(&self, row_el: &Element) -> RowId {
        let mut controller = self.controller.borrow_mut();
        let id = if self.is_template(row_el) {
            controller.add_template_row()
        } else {
            controller.add_line(read_line(row_el))
        };
        let _ = row_el.set_attribute(ROW_ID_ATTR, &id.0.to_string());
        id
    }

    /// Controller id of the row containing `target`, registering it if needed
    fn row_for(&self, target: &Element) -> Option<RowId> {
        let row_el = target.closest(&self.config.row_selector).ok().flatten()?;
        if self.is_template(&row_el) {
            return None;
        }
        let known = row_el
            .get_attribute(ROW_ID_ATTR)
            .and_then(|v| v.parse::<u32>().ok())
            .map(RowId)
            .filter(|id| {
                self.controller
                    .borrow()
                    .row(*id)
                    .is_some_and(|r| !r.template)
            });
        Some(known.unwrap_or_else(|| self.register_row(&row_el)))
    }

    fn row_element(&self, id: RowId) -> Option<Element> {
        query(&self.document, &format!("[{}=\"{}\"]", ROW_ID_ATTR, id.0))
    }

    /// Drops controller rows whose element left the DOM
    fn prune_detached_rows(&self) {
        let ids = self.controller.borrow().row_ids();
        let mut changed = false;
        for id in ids {
            if self.row_element(id).is_none() {
                changed |= self.controller.borrow_mut().remove_row(id);
            }
        }
        if changed {
            self.render_totals();
        }
    }

    // ------------------------------------------------------------------------
    // Event wiring
    // ------------------------------------------------------------------------

    fn bind(self: &Rc<Self>) {
        self.listen("change", |this, event| this.on_change(event));
        self.listen("input", |this, event| this.on_input(event));
        self.listen("formset:added", |this, event| this.on_row_added(event));
        self.listen("formset:removed", |this, _| this.prune_detached_rows());
    }

    fn listen(self: &Rc<Self>, event_type: &str, handler: fn(&Rc<Self>, &Event)) {
        let this = Rc::clone(self);
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| handler(&this, &event));
        if let Err(e) = self
            .document
            .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())
        {
            log::warn!("sale form: cannot listen to {}: {:?}", event_type, e);
        }
        // listeners live as long as the page
        closure.forget();
    }

    fn on_change(self: &Rc<Self>, event: &Event) {
        let Some(target) = event_target(event) else {
            return;
        };
        if target.matches(&self.config.location_selector).unwrap_or(false) {
            let value = Some(control_value(&target)).filter(|v| !v.is_empty());
            let requests = self.controller.borrow_mut().set_location(value);
            self.render_all();
            self.run_options(requests);
        } else if target.matches(&self.config.sale_type_selector).unwrap_or(false) {
            let sale_type = SaleType::from_code(&control_value(&target));
            self.controller.borrow_mut().set_sale_type(sale_type);
            self.render_totals();
        } else if target.closest(PRODUCT_SELECT).ok().flatten().is_some() {
            let Some(id) = self.row_for(&target) else {
                return;
            };
            let value = Some(control_value(&target)).filter(|v| !v.is_empty());
            let action = self.controller.borrow_mut().select_item(id, value);
            self.render_row(id);
            self.render_totals();
            self.run_price(action);
        } else if target.matches(DELETE_CHECKBOX).unwrap_or(false) {
            let Some(id) = self.row_for(&target) else {
                return;
            };
            let checked = target
                .dyn_ref::<HtmlInputElement>()
                .map(|i| i.checked())
                .unwrap_or(false);
            self.controller.borrow_mut().set_deleted(id, checked);
            self.render_totals();
        }
    }

    fn on_input(self: &Rc<Self>, event: &Event) {
        let Some(target) = event_target(event) else {
            return;
        };
        let field = if target.matches(QUANTITY_INPUT).unwrap_or(false) {
            RowField::Quantity
        } else if target.matches(PRICE_INPUT).unwrap_or(false) {
            RowField::Price
        } else if target.matches(DISCOUNT_INPUT).unwrap_or(false) {
            RowField::Discount
        } else {
            return;
        };
        let Some(id) = self.row_for(&target) else {
            return;
        };
        let value = control_value(&target);
        {
            let mut controller = self.controller.borrow_mut();
            match field {
                RowField::Quantity => controller.set_quantity(id, value),
                RowField::Price => controller.set_unit_price(id, value),
                RowField::Discount => controller.set_discount(id, value),
            }
        }
        // the input being typed in is not rewritten, only the totals
        self.render_row_total(id);
        self.render_totals();
    }

    fn on_row_added(self: &Rc<Self>, event: &Event) {
        let formset = event
            .dyn_ref::<CustomEvent>()
            .map(|e| e.detail())
            .and_then(|detail| js_sys::Reflect::get(&detail, &JsValue::from_str("formsetName")).ok())
            .and_then(|v| v.as_string());
        if formset.as_deref() != Some(self.config.formset_name.as_str()) {
            return;
        }
        let Some(row_el) = event_target(event) else {
            return;
        };
        let Some(id) = self.row_for(&row_el) else {
            return;
        };
        log::debug!("sale form: {} added", id);
        let requests = self
            .controller
            .borrow_mut()
            .refresh_item_options(RefreshScope::Row(id));
        self.render_row(id);
        self.run_options(requests);
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    fn run_options(self: &Rc<Self>, requests: Vec<OptionsRequest>) {
        for request in requests {
            self.render_row(request.row);
            let this = Rc::clone(self);
            spawn_local(async move {
                let result =
                    model::fetch_items_by_location(&this.lookup_base, &request.location_id).await;
                this.controller
                    .borrow_mut()
                    .apply_item_options(&request, result);
                this.render_row(request.row);
                this.render_totals();
            });
        }
    }

    fn run_price(self: &Rc<Self>, action: PriceAction) {
        let PriceAction::Request(request) = action else {
            return;
        };
        let this = Rc::clone(self);
        spawn_local(async move {
            let result =
                model::fetch_unit_price(&this.lookup_base, &request.location_id, &request.item_id)
                    .await;
            this.controller
                .borrow_mut()
                .apply_unit_price(&request, result);
            this.render_row(request.row);
            this.render_totals();
        });
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    fn render_all(&self) {
        for id in self.controller.borrow().row_ids() {
            self.render_row(id);
        }
        self.render_totals();
    }

    fn render_row(&self, id: RowId) {
        let Some(row_el) = self.row_element(id) else {
            return;
        };
        let controller = self.controller.borrow();
        let Some(row) = controller.row(id) else {
            return;
        };
        if let Some(select) = query_in::<HtmlSelectElement>(&row_el, PRODUCT_SELECT) {
            render_options(&select, row);
        }
        if let Some(input) = query_in::<HtmlInputElement>(&row_el, PRICE_INPUT) {
            input.set_value(&row.unit_price);
            let opacity = if row.price_status == LookupStatus::Loading {
                "0.5"
            } else {
                "1"
            };
            let _ = input.style().set_property("opacity", opacity);
        } else if let Some(el) = query_in::<Element>(&row_el, PRICE_READONLY) {
            el.set_text_content(Some(&row.unit_price));
        }
        if let Some(el) = query_in::<Element>(&row_el, ROW_TOTAL) {
            el.set_text_content(Some(&row.line_total));
        }
    }

    fn render_row_total(&self, id: RowId) {
        let Some(row_el) = self.row_element(id) else {
            return;
        };
        let controller = self.controller.borrow();
        if let (Some(row), Some(el)) = (controller.row(id), query_in::<Element>(&row_el, ROW_TOTAL))
        {
            el.set_text_content(Some(&row.line_total));
        }
    }

    fn render_totals(&self) {
        let controller = self.controller.borrow();
        let form = controller.form();
        for (selector, text) in [
            (SUBTOTAL, form.subtotal_display()),
            (TAX_AMOUNT, form.tax_amount_display()),
            (TOTAL, form.total_display()),
        ] {
            if let Some(el) = query(&self.document, selector) {
                el.set_text_content(Some(&text));
            }
        }
    }
}

fn render_options(select: &HtmlSelectElement, row: &LineRow) {
    let background = match row.options_status {
        LookupStatus::Idle => "white",
        LookupStatus::Loading => "#f0f0f0",
        LookupStatus::Failed => "#ffcccc",
    };
    let _ = select.style().set_property("background-color", background);
    // server-rendered options stay until a lookup has replaced them
    if row.options_status != LookupStatus::Idle || !row.options_loaded {
        return;
    }
    select.set_inner_html("");
    for (value, label) in row.select_options() {
        if let Ok(option) = HtmlOptionElement::new_with_text_and_value(&label, &value) {
            let _ = select.add_with_html_option_element(&option);
        }
    }
    select.set_value(row.item_id.as_deref().unwrap_or(""));
}

fn read_line(row_el: &Element) -> SaleLineDto {
    let select = query_in::<HtmlSelectElement>(row_el, PRODUCT_SELECT);
    let item_id = select
        .as_ref()
        .map(|s| s.value())
        .filter(|v| !v.is_empty());
    let item_name = select
        .as_ref()
        .and_then(|s| s.query_selector("option:checked").ok().flatten())
        .and_then(|o| o.text_content());
    let input_value = |selector: &str| {
        query_in::<HtmlInputElement>(row_el, selector)
            .map(|i| i.value())
            .unwrap_or_default()
    };
    let unit_price = match query_in::<HtmlInputElement>(row_el, PRICE_INPUT) {
        Some(input) => input.value(),
        None => query_in::<Element>(row_el, PRICE_READONLY)
            .and_then(|el| el.text_content())
            .map(|t| t.trim().trim_start_matches('$').to_string())
            .unwrap_or_default(),
    };
    let deleted = query_in::<HtmlInputElement>(row_el, DELETE_CHECKBOX)
        .map(|i| i.checked())
        .unwrap_or(false);
    SaleLineDto {
        item_id,
        item_name,
        quantity: input_value(QUANTITY_INPUT),
        unit_price,
        discount_percent: input_value(DISCOUNT_INPUT),
        deleted,
    }
}

fn event_target(event: &Event) -> Option<Element> {
    event.target().and_then(|t| t.dyn_into::<Element>().ok())
}

fn query(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

fn query_in<T: JsCast>(parent: &Element, selector: &str) -> Option<T> {
    parent
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<T>().ok())
}

/// Value of an input/select element, or its text for read-only markup
fn control_value(el: &Element) -> String {
    if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
        return select.value();
    }
    if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        return input.value();
    }
    el.dyn_ref::<HtmlElement>()
        .map(|h| h.inner_text())
        .unwrap_or_default()
        .trim()
        .to_string()
}
