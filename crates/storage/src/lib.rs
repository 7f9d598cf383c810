pub mod db;

pub use db::{
    create_db, get_receipt, get_receipt_items, insert_receipt, list_receipts, DbPool, NewReceipt,
    ReceiptRecord,
};
