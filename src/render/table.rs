//! Sortable HTML table of all communities.

use std::fmt::Write;

use serde_json::Value;

use crate::models::{CommunityRecord, RenderConfig, Summary};

const HEADER: &str = "<table class=\"sortable community-table\"><tr><th>Name</th>\
<th class=\"sorttable_sorted\">Stadt/Region<span id=\"sorttable_sortfwdind\">&nbsp;▾</span></th>\
<th>Firmware</th><th>Routing</th><th>Knoten</th><th>Kontakt</th></tr>";

/// Render the summary as a table sorted by city.
pub fn html_table(summary: &Summary, render: &RenderConfig) -> String {
    let mut rows: Vec<(&String, &CommunityRecord)> = summary.iter().collect();
    rows.sort_by(|(a_id, a), (b_id, b)| {
        a.city()
            .unwrap_or_default()
            .cmp(b.city().unwrap_or_default())
            .then_with(|| a_id.cmp(b_id))
    });

    let mut html = String::new();
    let _ = write!(
        html,
        "<link rel=\"stylesheet\" href=\"{}\" /><script src=\"{}\"></script>{}",
        escape(&render.stylesheet_url),
        escape(&render.script_url),
        HEADER
    );
    for (id, record) in rows {
        row(&mut html, id, record);
    }
    html.push_str("</table>");
    html
}

fn row(html: &mut String, id: &str, record: &CommunityRecord) {
    let name = escape(record.name.as_deref().unwrap_or(id));
    html.push_str("<tr>");
    match &record.url {
        Some(url) => {
            let _ = write!(
                html,
                "<td><a href=\"{}\">{}</a></td>",
                escape(&with_prefix(url, &["http://", "https://"], "http://")),
                name
            );
        }
        None => {
            let _ = write!(html, "<td>{}</td>", name);
        }
    }
    let _ = write!(html, "<td>{}</td>", escape(record.city().unwrap_or_default()));

    let tech = record.tech_details.as_ref();
    let firmware = tech.and_then(|t| t.firmware_name()).unwrap_or_default();
    let routing = tech
        .and_then(|t| t.routing.as_ref())
        .map(|r| r.display())
        .unwrap_or_default();
    let nodes = record.nodes().map(|n| n.to_string()).unwrap_or_default();
    let _ = write!(
        html,
        "<td>{}</td><td>{}</td><td>{}</td>",
        escape(firmware),
        escape(&routing),
        nodes
    );

    match &record.contact {
        Some(contact) => {
            html.push_str("<td class=\"community-popup\"><ul class=\"contacts\">");
            for (channel, value) in contact.iter().filter(|(channel, _)| *channel != "ml") {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let _ = write!(
                    html,
                    "<li class=\"contact\"><a href=\"{}\" class=\"button {}\" target=\"_window\"></a></li>",
                    escape(&contact_link(channel, &raw)),
                    escape(channel)
                );
            }
            html.push_str("</ul></td>");
        }
        None => html.push_str("<td></td>"),
    }
    html.push_str("</tr>");
}

/// Turn a raw contact value into a link for its channel.
pub fn contact_link(channel: &str, value: &str) -> String {
    match channel {
        "url" => with_prefix(value, &["http://", "https://"], "http://"),
        "email" => with_prefix(value, &["mailto:"], "mailto:"),
        "twitter" => with_prefix(value, &["http://", "https://"], "https://twitter.com/"),
        "irc" => with_prefix(value, &["irc:"], "irc:"),
        "jabber" => with_prefix(value, &["jabber:"], "jabber:"),
        "identica" => with_prefix(value, &["identica:"], "identica:"),
        "phone" => with_prefix(value, &["tel:"], "tel:"),
        _ => value.to_string(),
    }
}

fn with_prefix(value: &str, accepted: &[&str], prefix: &str) -> String {
    if accepted.iter().any(|p| value.starts_with(p)) {
        value.to_string()
    } else {
        format!("{prefix}{value}")
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contact_links() {
        assert_eq!(contact_link("email", "a@b.example"), "mailto:a@b.example");
        assert_eq!(contact_link("email", "mailto:a@b.example"), "mailto:a@b.example");
        assert_eq!(contact_link("twitter", "alpha"), "https://twitter.com/alpha");
        assert_eq!(contact_link("url", "alpha.example"), "http://alpha.example");
        assert_eq!(contact_link("url", "https://alpha.example"), "https://alpha.example");
        assert_eq!(contact_link("phone", "+49 30 1234"), "tel:+49 30 1234");
        assert_eq!(contact_link("facebook", "alpha"), "alpha");
    }

    #[test]
    fn test_rows_sorted_by_city() {
        let summary: Summary = serde_json::from_value(json!({
            "zeta": {"name": "Zeta", "location": {"city": "Aachen"}},
            "alpha": {"name": "Alpha", "location": {"city": "Zwickau"}}
        }))
        .unwrap();

        let html = html_table(&summary, &RenderConfig::default());

        let zeta = html.find("Zeta").unwrap();
        let alpha = html.find("Alpha").unwrap();
        assert!(zeta < alpha);
        assert!(html.starts_with("<link rel=\"stylesheet\" href=\"//www.freifunk.net/map/community_map.css\" />"));
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn test_row_contents() {
        let summary: Summary = serde_json::from_value(json!({
            "alpha": {
                "name": "Alpha & Friends",
                "url": "alpha.example",
                "location": {"city": "Alphaville"},
                "techDetails": {"firmware": {"name": "gluon"}, "routing": ["batman-adv", "babel"]},
                "state": {"nodes": 12},
                "contact": {"email": "info@alpha.example", "ml": "list@alpha.example"}
            }
        }))
        .unwrap();

        let html = html_table(&summary, &RenderConfig::default());

        assert!(html.contains("<td><a href=\"http://alpha.example\">Alpha &amp; Friends</a></td>"));
        assert!(html.contains("<td>Alphaville</td><td>gluon</td><td>batman-adv, babel</td><td>12</td>"));
        assert!(html.contains("href=\"mailto:info@alpha.example\" class=\"button email\""));
        assert!(!html.contains("list@alpha.example"));
    }

    #[test]
    fn test_stub_row_renders() {
        let mut summary = Summary::new();
        summary.insert("beta".into(), CommunityRecord::stub("beta"));

        let html = html_table(&summary, &RenderConfig::default());

        assert!(html.contains("<tr><td>beta</td><td>beta</td><td></td><td></td><td></td><td></td></tr>"));
    }
}
