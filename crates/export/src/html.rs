use yenslip_core::{Item, Yen};

const MISSING_TOTAL: &str = "（未検出）";

/// One processed upload as shown on the results page.
#[derive(Debug, Clone)]
pub struct ReceiptView<'a> {
    pub receipt_id: i64,
    pub original_filename: &'a str,
    pub items: &'a [Item],
    pub total: Option<Yen>,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

pub fn render_upload_form() -> String {
    page(
        "レシート読み取り",
        concat!(
            "<h1>レシート読み取り</h1>\n",
            "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n",
            "<input type=\"file\" name=\"receipts\" accept=\"image/*\" multiple required>\n",
            "<button type=\"submit\">アップロード</button>\n",
            "</form>\n",
        ),
    )
}

pub fn render_results(receipts: &[ReceiptView<'_>]) -> String {
    let mut body = String::from("<h1>読み取り結果</h1>\n");

    for receipt in receipts {
        body.push_str(&format!(
            "<section>\n<h2>{}</h2>\n<table>\n<thead><tr><th>商品名</th><th>値段</th></tr></thead>\n<tbody>\n",
            escape_html(receipt.original_filename)
        ));
        for item in receipt.items {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape_html(item.name()),
                item.price()
            ));
        }
        let total = receipt
            .total
            .map(|t| t.to_string())
            .unwrap_or_else(|| MISSING_TOTAL.to_string());
        body.push_str(&format!(
            "</tbody>\n<tfoot><tr><th>合計</th><th>{total}</th></tr></tfoot>\n</table>\n<p><a href=\"/receipts/{id}/csv\">CSVダウンロード</a></p>\n</section>\n",
            id = receipt.receipt_id
        ));
    }

    body.push_str("<p><a href=\"/ocr.log\" target=\"_blank\">ocr.log を開く</a></p>\n");
    body.push_str("<p><a href=\"/\">戻る</a></p>\n");
    page("読み取り結果", &body)
}
