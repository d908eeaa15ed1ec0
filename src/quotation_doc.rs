use crate::models::QuotationDetail;

/// Render a quotation as a Markdown document for printing or PDF conversion
pub fn generate_markdown(detail: &QuotationDetail) -> String {
    let quotation = &detail.quotation;
    let mut content = String::new();

    // Add top divider
    content.push_str("<hr style=\"height: 5px; background-color: #343876; border: none;\">\n\n");

    content.push_str(&format!("# Quotation #{}\n", quotation.id));
    if let Some(date) = quotation.date {
        content.push_str(&format!(
            "<span style=\"color: #e83e8c;\">Issued on {}</span>\n\n",
            date.format("%m/%d/%Y")
        ));
    } else {
        content.push('\n');
    }

    // Customer block
    content.push_str("**Prepared for**<br>\n");
    content.push_str(&format!("{}<br>\n", escape_text(&quotation.name)));
    if !quotation.email.is_empty() {
        content.push_str(&format!("{}<br>\n", escape_text(&quotation.email)));
    }
    if !quotation.domain.is_empty() {
        content.push_str(&format!("Domain: {}\n", escape_text(&quotation.domain)));
    }
    content.push_str("\n<hr>\n\n");

    // Services table
    content.push_str("## Services\n\n");
    if detail.services.is_empty() {
        content.push_str("_No services listed._\n\n");
    } else {
        content.push_str("| Service | Price | Discount | Total |\n");
        content.push_str("|:--|--:|--:|--:|\n");
        for service in &detail.services {
            content.push_str(&format!(
                "| {} | {:.2} | {:.2} | {:.2} |\n",
                escape_text(&service.service_name),
                service.price,
                service.discount,
                service.grand_total
            ));
        }
        content.push('\n');
    }

    // Payment schedule
    content.push_str("## Payment schedule\n\n");
    if detail.installments.is_empty() {
        content.push_str("_Payable in full._\n\n");
    } else {
        content.push_str("| Installment | Due | Amount |\n");
        content.push_str("|:--|:--|--:|\n");
        for installment in &detail.installments {
            content.push_str(&format!(
                "| {} | {} | {:.2} |\n",
                escape_text(&installment.label),
                escape_text(&installment.due_when),
                installment.installment_amount
            ));
        }
        content.push('\n');
    }

    // Totals
    content.push_str("## Summary\n\n");
    content.push_str(&format!("- Subtotal: {:.2}\n", quotation.total));
    content.push_str(&format!("- Discount: {:.2}\n", quotation.total_discount));
    content.push_str(&format!("- **Total payable: {:.2}**\n", quotation.final_amount));

    content
}

/// Escapes user text so it renders literally in Markdown and HTML. Line
/// breaks become spaces to keep a value on its line or in its table cell.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\\' | '`' | '*' | '_' | '|' | '[' | ']' | '#' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}
