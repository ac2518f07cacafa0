pub mod sale_type;
