use std::io::Write;
use thiserror::Error;
use yenslip_core::ParseResult;

/// Spreadsheet tools need the BOM to pick UTF-8 for Japanese text.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const HEADER: [&str; 2] = ["商品名", "値段"];
const TOTAL_LABEL: &str = "合計";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

pub fn write_receipt_csv<W: Write>(mut out: W, receipt: &ParseResult) -> Result<(), ExportError> {
    out.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;
    for item in &receipt.items {
        writer.write_record([item.name().to_string(), item.price().to_string()])?;
    }
    let total = receipt.total.map(|t| t.to_string()).unwrap_or_default();
    writer.write_record([TOTAL_LABEL.to_string(), total])?;
    writer.flush()?;
    Ok(())
}

pub fn receipt_csv(receipt: &ParseResult) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_receipt_csv(&mut buf, receipt)?;
    Ok(buf)
}
