use anyhow::Result;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use tgw_fabric::{Attachment, AttachmentCatalog};
use tgw_matrix::{Cell, GridStats, PrefixVerdict, Reachability, ReachabilityGrid, Row, RowState};

pub const TITLE: &str = "Transit Gateway Routing Matrix";
pub const DEFAULT_STYLESHEET: &str = include_str!("../assets/style.css");

const NO_ROUTE_TABLE: &str = "No route table attached";

fn glyph(reachability: Reachability) -> &'static str {
    match reachability {
        Reachability::Active => "&#9989;",
        Reachability::Blackhole => "&#128310;",
        Reachability::Oneway => "&#10060;",
    }
}

const UNKNOWN_GLYPH: &str = "&#10068;";

fn prefix_lines(prefixes: &[PrefixVerdict]) -> String {
    prefixes
        .iter()
        .map(|verdict| {
            format!(
                "{} : {}",
                encode_text(&verdict.prefix),
                glyph(verdict.reachability)
            )
        })
        .collect::<Vec<_>>()
        .join("<br />")
}

fn tooltip(label: &str, detail: &str) -> String {
    format!(
        "<div data-html=\"true\" class=\"tooltip\">{label}<span class=\"tooltiptext\">{detail}</span></div>"
    )
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::SelfRoute => "<td id=\"self\"></td>".to_string(),
        Cell::Empty => "<td></td>".to_string(),
        Cell::Routed {
            reachability,
            prefixes,
        } => format!(
            "<td id=\"{}\">{}</td>",
            reachability.as_str(),
            tooltip("X", &prefix_lines(prefixes))
        ),
        Cell::Unknown { reason } => format!(
            "<td id=\"unknown\">{}</td>",
            tooltip("?", &encode_text(reason))
        ),
    }
}

fn render_route_table(attachment: &Attachment, row: &Row) -> String {
    let type_id = encode_double_quoted_attribute(&attachment.resource_type);
    match &row.state {
        RowState::RouteTable { id } if row.dangling.is_empty() => {
            format!("<td id=\"{}\">{}</td>", type_id, encode_text(id))
        }
        RowState::RouteTable { id } => format!(
            "<td id=\"{}\">{}</td>",
            type_id,
            tooltip(
                &encode_text(id),
                &format!("No target:<br />{}", prefix_lines(&row.dangling))
            )
        ),
        RowState::NoRouteTable => format!("<td id=\"no-route-table\">{NO_ROUTE_TABLE}</td>"),
        RowState::Unknown {
            route_table_id,
            reason,
        } => format!(
            "<td id=\"unknown\">{}</td>",
            tooltip(&encode_text(route_table_id), &encode_text(reason))
        ),
    }
}

fn legend() -> String {
    let entries = [
        ("active", "X", "Route found with matching return route"),
        ("blackhole", "X", "Blackhole"),
        ("oneway", "X", "Route found but no return route"),
        ("unknown", "?", "Route query failed"),
        ("no-route-table", "", "No route table attached"),
        ("self", "", "N/A - Own route"),
    ];

    let mut html = String::new();
    html.push_str("<table id=\"legend\">\n<tr><th colspan=\"2\">Key</th></tr>\n");
    for (id, label, meaning) in entries {
        html.push_str(&format!(
            "<tr><td id=\"{id}\">{label}</td><td class=\"meaning\">{meaning}</td></tr>\n"
        ));
    }
    html.push_str("</table>\n");
    html
}

/// HTML matrix: one row and one column per attachment, a route table column and a legend
pub fn render_html(
    catalog: &AttachmentCatalog,
    grid: &ReachabilityGrid,
    generated_at: Option<&str>,
) -> String {
    let mut html = String::with_capacity(8192);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\" dir=\"ltr\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<link rel=\"stylesheet\" href=\"style.css\">\n");
    html.push_str(&format!("<title>{TITLE}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{TITLE}</h1>\n"));
    if let Some(generated_at) = generated_at {
        html.push_str(&format!(
            "<p class=\"it\">(Generated: {})</p>\n",
            encode_text(generated_at)
        ));
    }

    html.push_str("<table id=\"matrix\">\n<tr><th>Attachment Id</th><th>Attachment (Friendly)</th>");
    for attachment in catalog.iter() {
        html.push_str(&format!(
            "<th id=\"{}\" title=\"{}\"><span>{}</span></th>",
            encode_double_quoted_attribute(&attachment.resource_type),
            encode_double_quoted_attribute(&attachment.id),
            encode_text(&attachment.friendly_name)
        ));
    }
    html.push_str("<th>Route Table</th></tr>\n");

    for (attachment, row) in catalog.iter().zip(grid.rows()) {
        let type_id = encode_double_quoted_attribute(&attachment.resource_type);
        html.push_str(&format!(
            "<tr><td id=\"{}\">{}</td><td id=\"{}\" title=\"{}\">{}</td>",
            type_id,
            encode_text(&attachment.id),
            type_id,
            encode_double_quoted_attribute(&attachment.name),
            encode_text(&attachment.friendly_name)
        ));
        for cell in &row.cells {
            html.push_str(&render_cell(cell));
        }
        html.push_str(&render_route_table(attachment, row));
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n<br><br>\n");

    html.push_str(&legend());
    html.push_str("</body>\n</html>\n");
    html
}

#[derive(Serialize)]
struct MatrixDocument<'a> {
    title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<&'a str>,
    attachments: &'a [Attachment],
    stats: GridStats,
    grid: &'a ReachabilityGrid,
}

/// JSON export of the same matrix
pub fn render_json(
    catalog: &AttachmentCatalog,
    grid: &ReachabilityGrid,
    generated_at: Option<&str>,
) -> Result<String> {
    let doc = MatrixDocument {
        title: TITLE,
        generated_at,
        attachments: catalog.attachments(),
        stats: grid.stats(),
        grid,
    };
    let mut json = serde_json::to_string_pretty(&doc)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgw_fabric::{AliasMap, NamePolicy, RawAttachment, Tag};

    fn catalog(names: &[(&str, &str)]) -> AttachmentCatalog {
        let raw: Vec<RawAttachment> = names
            .iter()
            .map(|(id, name)| RawAttachment {
                transit_gateway_attachment_id: id.to_string(),
                resource_type: "vpc".to_string(),
                resource_id: None,
                state: None,
                tags: vec![Tag {
                    key: "Name".to_string(),
                    value: name.to_string(),
                }],
                association: None,
            })
            .collect();
        AttachmentCatalog::build(&raw, &AliasMap::new(), NamePolicy::Strict).unwrap()
    }

    fn no_route_table_grid(catalog: &AttachmentCatalog) -> ReachabilityGrid {
        let ids: Vec<String> = catalog.iter().map(|att| att.id.clone()).collect();
        let rows = ids
            .iter()
            .enumerate()
            .map(|(src, id)| Row {
                attachment_id: id.clone(),
                state: RowState::NoRouteTable,
                cells: (0..ids.len())
                    .map(|dst| if dst == src { Cell::SelfRoute } else { Cell::Empty })
                    .collect(),
                dangling: Vec::new(),
            })
            .collect();
        ReachabilityGrid::new(ids, rows)
    }

    #[test]
    fn escapes_names() {
        let catalog = catalog(&[("att-1", "<script>alert(1)</script>"), ("att-2", "a & b")]);
        let grid = no_route_table_grid(&catalog);
        let html = render_html(&catalog, &grid, None);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("Generated"));
    }

    #[test]
    fn renders_row_state_and_legend() {
        let catalog = catalog(&[("att-1", "one")]);
        let grid = no_route_table_grid(&catalog);
        let html = render_html(&catalog, &grid, Some("01-02-2026 10:00:00"));

        assert!(html.contains("(Generated: 01-02-2026 10:00:00)"));
        assert!(html.contains("<td id=\"no-route-table\">No route table attached</td>"));
        assert!(html.contains("<td id=\"self\"></td>"));
        for id in ["active", "blackhole", "oneway", "unknown", "no-route-table", "self"] {
            assert!(html.contains(&format!("<td id=\"{id}\">")), "legend entry {id}");
        }
    }

    #[test]
    fn routed_cells_list_prefixes_in_order() {
        let cell = Cell::Routed {
            reachability: Reachability::Oneway,
            prefixes: vec![
                PrefixVerdict {
                    prefix: "10.1.0.0/16".to_string(),
                    reachability: Reachability::Active,
                },
                PrefixVerdict {
                    prefix: "10.2.0.0/16".to_string(),
                    reachability: Reachability::Oneway,
                },
            ],
        };
        let html = render_cell(&cell);
        assert!(html.starts_with("<td id=\"oneway\">"));
        assert!(html.contains("10.1.0.0/16 : &#9989;<br />10.2.0.0/16 : &#10060;"));
    }

    #[test]
    fn json_export_keeps_matrix_order() {
        let catalog = catalog(&[("att-2", "zulu"), ("att-1", "alpha")]);
        let grid = no_route_table_grid(&catalog);
        let json = render_json(&catalog, &grid, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["attachments"][0]["id"], "att-1");
        assert_eq!(value["grid"]["rows"][0]["state"]["kind"], "no-route-table");
        assert_eq!(value["grid"]["rows"][0]["cells"][0]["kind"], "self");
        assert!(value.get("generated_at").is_none());
    }
}
