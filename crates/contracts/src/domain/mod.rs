pub mod a025_sale;
