pub mod csv;
pub mod html;

pub use crate::csv::{receipt_csv, write_receipt_csv, ExportError, UTF8_BOM};
pub use crate::html::{escape_html, render_upload_form, render_results, ReceiptView};
