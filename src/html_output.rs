//! HTML summary report for one test
//!
//! One row per timeline interval, one column per platform. Consecutive rows
//! reporting the same change for a platform share a single cell.

use crate::config::DigestConfig;
use crate::digest::TestDigest;
use crate::timeline::{Delta, Sign};

/// Platform cell; `rowspan` counts the rows it covers
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlCell {
    pub delta: Option<Delta>,
    pub rowspan: usize,
}

/// One interval of the report
#[derive(Debug, Clone)]
pub struct HtmlRow {
    pub link: String,
    pub label: String,
    /// Per platform column; `None` where an earlier cell spans this row
    pub cells: Vec<Option<HtmlCell>>,
}

/// HTML report builder
#[derive(Debug)]
pub struct HtmlReport {
    test: String,
    date_range: String,
    platforms: Vec<String>,
    rows: Vec<HtmlRow>,
}

impl HtmlReport {
    /// Lay out `digest` as rows, coalescing equal adjacent cells
    pub fn from_digest(digest: &TestDigest, date_range: &str, config: &DigestConfig) -> Self {
        let platforms: Vec<String> = digest.platforms().into_iter().map(String::from).collect();
        // Per platform: row index owning the current cell
        let mut owners: Vec<Option<usize>> = vec![None; platforms.len()];
        let mut rows: Vec<HtmlRow> = Vec::with_capacity(digest.intervals.len());

        for interval in &digest.intervals {
            let link = if interval.is_degenerate() {
                config.revision_url(interval.from.node())
            } else {
                config.pushlog_url(interval.from.node(), interval.to.node())
            };
            let mut row = HtmlRow {
                link,
                label: format!("{} to {}", interval.from.node(), interval.to.node()),
                cells: Vec::with_capacity(platforms.len()),
            };

            let row_index = rows.len();
            for (column, platform) in platforms.iter().enumerate() {
                let delta = interval.deltas.get(platform).copied();
                let owner_cell = match owners[column] {
                    Some(owner) => rows[owner].cells[column].as_mut(),
                    None => None,
                }
                .filter(|cell| delta.is_some() && cell.delta == delta);

                match owner_cell {
                    Some(cell) => {
                        cell.rowspan += 1;
                        row.cells.push(None);
                    }
                    None => {
                        owners[column] = Some(row_index);
                        row.cells.push(Some(HtmlCell { delta, rowspan: 1 }));
                    }
                }
            }
            rows.push(row);
        }

        Self {
            test: digest.test.clone(),
            date_range: date_range.to_string(),
            platforms,
            rows,
        }
    }

    pub fn rows(&self) -> &[HtmlRow] {
        &self.rows
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    /// Escape HTML special characters
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: center;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        .pushlog {
            font-family: monospace;
            text-align: left;
        }
        .regression {
            background-color: #f2c4c4;
            color: #cc0000;
        }
        .improvement {
            background-color: #c4d7f2;
            color: #0044cc;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn generate_header(&self) -> String {
        let mut header = String::from("<tr><th>Pushlog</th>");
        for platform in &self.platforms {
            header.push_str(&format!("<th>{}</th>", Self::escape_html(platform)));
        }
        header.push_str("</tr>");
        header
    }

    fn format_cell(cell: &HtmlCell) -> String {
        let rowspan = if cell.rowspan > 1 {
            format!(r#" rowspan="{}""#, cell.rowspan)
        } else {
            String::new()
        };

        match cell.delta {
            Some(delta) => {
                let class = match delta.sign {
                    Sign::Increase => "regression",
                    Sign::Decrease => "improvement",
                };
                format!(
                    r#"<td class="{}"{}>{}</td>"#,
                    class,
                    rowspan,
                    Self::escape_html(&delta.to_string())
                )
            }
            None => format!("<td{}></td>", rowspan),
        }
    }

    fn format_row(row: &HtmlRow) -> String {
        let mut html = format!(
            r#"<tr><td class="pushlog"><a href="{}">{}</a></td>"#,
            Self::escape_html(&row.link),
            Self::escape_html(&row.label)
        );
        for cell in row.cells.iter().flatten() {
            html.push_str(&Self::format_cell(cell));
        }
        html.push_str("</tr>");
        html
    }

    pub fn title(&self) -> String {
        format!(
            "Summary of changes for {} over {}",
            self.test, self.date_range
        )
    }

    /// Generate the complete HTML document
    pub fn to_html(&self) -> String {
        let title = Self::escape_html(&self.title());
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(&format!("    <title>{}</title>\n", title));
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str(&format!("    <h1>{}</h1>\n", title));

        html.push_str("    <table>\n");
        html.push_str("        ");
        html.push_str(&self.generate_header());
        html.push('\n');

        for row in &self.rows {
            html.push_str("        ");
            html.push_str(&Self::format_row(row));
            html.push('\n');
        }

        html.push_str("    </table>\n");

        html.push_str("    <div class=\"footer\">\n");
        html.push_str(&format!(
            "        Generated by perfdigest {}\n",
            env!("CARGO_PKG_VERSION")
        ));
        html.push_str("    </div>\n");

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }
}
