pub mod controls;
pub mod datatable;
pub mod entry_form;
