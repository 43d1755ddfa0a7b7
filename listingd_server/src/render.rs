//! HTML rendering for the browser-facing listings view.

use listingd_store::Listing;

/// Renders the stored listings as a standalone HTML page with one table row per record.
pub(crate) fn listings_table(listings: &[Listing]) -> String {
    let mut page = String::with_capacity(1024 + listings.len() * 256);

    page.push_str(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <title>Listings</title>\n\
         <style>\n\
         body { font-family: sans-serif; margin: 2em; }\n\
         table { border-collapse: collapse; width: 100%; }\n\
         th, td { border: 1px solid #ccc; padding: 8px; text-align: left; }\n\
         th { background-color: #f4f4f4; }\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <h1>Listings</h1>\n",
    );
    page.push_str(&format!("<p>Total Listings: {}</p>\n", listings.len()));
    page.push_str(
        "<table>\n\
         <tr><th>No.</th><th>Title</th><th>Description</th><th>URL</th>\
         <th>Host Name</th><th>Host Details</th></tr>\n",
    );

    for (index, listing) in listings.iter().enumerate() {
        page.push_str("<tr>");
        page.push_str(&format!("<td>{}</td>", index + 1));
        push_cell(&mut page, listing.title.as_deref(), "No title");
        push_cell(&mut page, listing.description.as_deref(), "No description");
        match listing.url.as_deref() {
            Some(url) => {
                let escaped = escape(url);
                page.push_str(&format!(
                    "<td><a href=\"{escaped}\" target=\"_blank\">{escaped}</a></td>"
                ));
            }
            None => page.push_str("<td>Unknown</td>"),
        }
        let host = listing.host.as_ref();
        push_cell(&mut page, host.and_then(|h| h.name.as_deref()), "Unknown");
        match host.and_then(|h| h.host_details.as_ref()).filter(|d| !d.is_empty()) {
            Some(details) => {
                let joined = details
                    .iter()
                    .map(|d| escape(d))
                    .collect::<Vec<_>>()
                    .join("<br>");
                page.push_str(&format!("<td>{joined}</td>"));
            }
            None => page.push_str("<td>No details available</td>"),
        }
        page.push_str("</tr>\n");
    }

    page.push_str("</table>\n</body>\n</html>\n");
    page
}

fn push_cell(page: &mut String, value: Option<&str>, placeholder: &str) {
    match value {
        Some(value) => page.push_str(&format!("<td>{}</td>", escape(value))),
        None => page.push_str(&format!("<td>{placeholder}</td>")),
    }
}

/// Minimal HTML escaping for text and attribute values.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
