use html_escape::encode_text;

/// Assembles a minimal XBRL instance carrying statement text blocks.
#[derive(Debug, Default)]
pub struct FilingBuilder {
    security_code: Option<String>,
    blocks: Vec<String>,
}

impl FilingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn security_code(mut self, code: &str) -> Self {
        self.security_code = Some(code.to_string());
        self
    }

    pub fn block(self, element: &str, content: &str) -> Self {
        self.block_with_context(element, "CurrentYearDuration", content)
    }

    pub fn block_with_context(mut self, element: &str, context: &str, content: &str) -> Self {
        self.blocks.push(format!(
            "<{element} contextRef=\"{context}\">{content}</{element}>"
        ));
        self
    }

    /// Adds a statement table, escaped the way EDINET embeds HTML in XBRL.
    pub fn table(self, element: &str, rows: &[&[&str]]) -> Self {
        let html = table_html(rows);
        self.block(element, &encode_text(&html))
    }

    pub fn build(self) -> String {
        let mut body = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xbrli:xbrl>\n",
        );
        if let Some(code) = &self.security_code {
            body.push_str(&format!(
                "<jpdei_cor:SecurityCodeDEI contextRef=\"FilingDateInstant\">{code}</jpdei_cor:SecurityCodeDEI>\n"
            ));
        }
        for block in &self.blocks {
            body.push_str(block);
            body.push('\n');
        }
        body.push_str("</xbrli:xbrl>\n");
        body
    }
}

/// Renders rows as an EDINET-style table: fixed widths, a colgroup and one
/// paragraph per cell.
pub fn table_html(rows: &[&[&str]]) -> String {
    let mut html = String::from(
        "<table style=\"width: 600px; border-collapse: collapse;\"><colgroup><col style=\"width: 300px;\"/><col/></colgroup>",
    );
    for row in rows {
        html.push_str("<tr>");
        for cell in row.iter() {
            html.push_str(&format!("<td><p>{cell}</p></td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}
