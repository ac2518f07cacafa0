use super::controller::{LineState, LookupStatus, RowId};
use super::view_model::SaleLinesViewModel;
use crate::shared::components::ui::{Checkbox, Input, Select};
use crate::shared::page_frame::PageFrame;
use contracts::domain::a025_sale::aggregate::SaleFormBootstrap;
use contracts::enums::sale_type::SaleType;
use leptos::prelude::*;
use thaw::{
    Button, ButtonAppearance, Card, Table, TableBody, TableCell, TableCellLayout,
    TableHeader, TableHeaderCell, TableRow,
};

fn options_class(status: LookupStatus) -> String {
    match status {
        LookupStatus::Idle => String::new(),
        LookupStatus::Loading => "form__select--loading".to_string(),
        LookupStatus::Failed => "form__select--failed".to_string(),
    }
}

fn price_class(status: LookupStatus) -> String {
    match status {
        LookupStatus::Idle => String::new(),
        LookupStatus::Loading => "form__input--pending".to_string(),
        LookupStatus::Failed => "form__input--failed".to_string(),
    }
}

#[component]
pub fn SaleLinesForm(
    bootstrap: SaleFormBootstrap,
    #[prop(into)] lookup_base: String,
) -> impl IntoView {
    let vm = SaleLinesViewModel::new(bootstrap, lookup_base);
    let locked = vm.is_locked();

    Effect::new(move || {
        vm.initialize();
    });

    let title = move || {
        vm.controller
            .with(|c| c.form().code.clone())
            .map(|code| format!("Venta {}", code))
            .unwrap_or_else(|| "Nueva venta".to_string())
    };
    let status_label = move || vm.controller.with(|c| c.form().status.display_name());

    let location_value =
        Signal::derive(move || vm.controller.with(|c| c.form().location_id.clone().unwrap_or_default()));
    let location_options = Signal::derive(move || vm.location_options());
    let sale_type_value =
        Signal::derive(move || vm.controller.with(|c| c.form().sale_type.code().to_string()));
    let sale_type_options = Signal::derive(|| {
        SaleType::all()
            .into_iter()
            .map(|t| (t.code().to_string(), t.display_name().to_string()))
            .collect::<Vec<_>>()
    });

    view! {
        <PageFrame page_id="a025_sale--detail" category="detail">
            <div class="page__header">
                <div class="page__header-left">
                    <h1 class="page__title">{title}</h1>
                </div>
                <div class="page__header-right">
                    <span class="badge">{status_label}</span>
                </div>
            </div>

            <div class="page__content">
                <div style="padding:var(--spacing-lg);display:flex;flex-direction:column;gap:var(--spacing-lg);">
                    <Card>
                        <div style="padding:var(--spacing-md);display:grid;grid-template-columns:repeat(2, minmax(0, 1fr));gap:var(--spacing-md);">
                            <Select
                                label="Sucursal"
                                id="id_branch"
                                value=location_value
                                options=location_options
                                disabled=locked
                                on_change=Callback::new(move |v: String| vm.set_location(v))
                            />
                            <Select
                                label="Tipo de documento"
                                id="id_sale_type"
                                value=sale_type_value
                                options=sale_type_options
                                disabled=locked
                                on_change=Callback::new(move |v: String| vm.set_sale_type(v))
                            />
                        </div>
                    </Card>

                    <Card>
                        <div style="padding:var(--spacing-md);">
                            <h3 style="margin:0 0 var(--spacing-md) 0;font-size:var(--font-size-md);">"Detalle"</h3>
                            <div class="table-wrapper">
                                <Table attr:style="width:100%;">
                                    <TableHeader>
                                        <TableRow>
                                            <TableHeaderCell>"Producto"</TableHeaderCell>
                                            <TableHeaderCell>"Cantidad"</TableHeaderCell>
                                            <TableHeaderCell>"Precio unitario"</TableHeaderCell>
                                            <TableHeaderCell>"Descuento (%)"</TableHeaderCell>
                                            <TableHeaderCell>"Subtotal línea"</TableHeaderCell>
                                            <TableHeaderCell>"Eliminar"</TableHeaderCell>
                                            <TableHeaderCell>""</TableHeaderCell>
                                        </TableRow>
                                    </TableHeader>
                                    <TableBody>
                                        <For
                                            each=move || vm.row_ids()
                                            key=|id| *id
                                            children=move |id| view! { <SaleLineRow vm=vm id=id locked=locked /> }
                                        />
                                    </TableBody>
                                </Table>
                            </div>
                            <Show when=move || !locked>
                                <div style="margin-top:var(--spacing-md);">
                                    <Button
                                        appearance=ButtonAppearance::Secondary
                                        on_click=move |_| vm.add_row()
                                    >
                                        "+ Agregar línea"
                                    </Button>
                                </div>
                            </Show>
                        </div>
                    </Card>

                    <Card>
                        <div style="padding:var(--spacing-md);display:grid;grid-template-columns:max-content 1fr;gap:var(--spacing-sm) var(--spacing-xl);align-items:baseline;">
                            <span class="form__label">"Subtotal:"</span>
                            <span class="field-subtotal" style="font-variant-numeric:tabular-nums;">
                                {move || vm.controller.with(|c| c.form().subtotal_display())}
                            </span>

                            <span class="form__label">"IVA (13%):"</span>
                            <span class="field-tax_amount" style="font-variant-numeric:tabular-nums;">
                                {move || vm.controller.with(|c| c.form().tax_amount_display())}
                            </span>

                            <span class="form__label">"Total a pagar:"</span>
                            <strong class="field-total" style="font-size:var(--font-size-lg);font-variant-numeric:tabular-nums;">
                                {move || vm.controller.with(|c| c.form().total_display())}
                            </strong>
                        </div>
                    </Card>
                </div>
            </div>
        </PageFrame>
    }
}

/// Одна строка табличной части; обработчики создаются для каждой строки,
/// поэтому добавленные строки подключаются автоматически
#[component]
fn SaleLineRow(vm: SaleLinesViewModel, id: RowId, locked: bool) -> impl IntoView {
    let item_value = Signal::derive(move || vm.with_row(id, |r| r.item_id.clone().unwrap_or_default()));
    let item_options = Signal::derive(move || vm.with_row(id, |r| r.select_options()));
    let item_state = Signal::derive(move || vm.with_row(id, |r| options_class(r.options_status)));
    let quantity = Signal::derive(move || vm.with_row(id, |r| r.quantity.clone()));
    let unit_price = Signal::derive(move || vm.with_row(id, |r| r.unit_price.clone()));
    let price_state = Signal::derive(move || vm.with_row(id, |r| price_class(r.price_status)));
    let discount = Signal::derive(move || vm.with_row(id, |r| r.discount_percent.clone()));
    let deleted = Signal::derive(move || vm.with_row(id, |r| r.deleted));
    let row_class = move || {
        vm.with_row(id, |r| match r.state() {
            LineState::Empty => "sale-line sale-line--empty",
            LineState::Priced => "sale-line",
            LineState::Deleted => "sale-line sale-line--deleted",
        })
    };

    view! {
        <TableRow attr:class=row_class>
            <TableCell>
                <Select
                    value=item_value
                    options=item_options
                    state_class=item_state
                    disabled=locked
                    on_change=Callback::new(move |v: String| vm.select_item(id, v))
                />
            </TableCell>
            <TableCell>
                <Input
                    input_type="number"
                    step="0.01"
                    value=quantity
                    disabled=locked
                    on_input=Callback::new(move |v: String| vm.set_quantity(id, v))
                />
            </TableCell>
            <TableCell>
                <Input
                    input_type="number"
                    step="0.01"
                    value=unit_price
                    state_class=price_state
                    disabled=locked
                    on_input=Callback::new(move |v: String| vm.set_unit_price(id, v))
                />
            </TableCell>
            <TableCell>
                <Input
                    input_type="number"
                    step="0.01"
                    value=discount
                    disabled=locked
                    on_input=Callback::new(move |v: String| vm.set_discount(id, v))
                />
            </TableCell>
            <TableCell>
                <TableCellLayout>
                    <strong style="font-variant-numeric:tabular-nums;">
                        {move || vm.with_row(id, |r| r.line_total.clone())}
                    </strong>
                </TableCellLayout>
            </TableCell>
            <TableCell>
                <Checkbox
                    checked=deleted
                    disabled=locked
                    on_change=Callback::new(move |v: bool| vm.set_deleted(id, v))
                />
            </TableCell>
            <TableCell>
                <Show when=move || !locked>
                    <Button
                        appearance=ButtonAppearance::Subtle
                        on_click=move |_| vm.remove_row(id)
                    >
                        "✕"
                    </Button>
                </Show>
            </TableCell>
        </TableRow>
    }
}
