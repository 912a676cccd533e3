//! HTML status panel.

use std::fmt::Write as _;

use crate::process::ServiceState;
use crate::state::{format_pid, format_time, StatusSnapshot};

/// Seconds between automatic panel reloads.
pub const REFRESH_SECS: u32 = 2;

/// Escape text for safe inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
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

fn state_color(state: ServiceState) -> &'static str {
    match state {
        ServiceState::Running => "#2e7d32",
        ServiceState::Starting => "#f9a825",
        ServiceState::Exited => "#c62828",
        ServiceState::Stopped => "#757575",
    }
}

/// Render the snapshot as a self-refreshing HTML page.
#[must_use]
pub fn render_panel(status: &StatusSnapshot) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"{REFRESH_SECS}\">\n\
         <title>devorch status</title>\n\
         <style>body{{font-family:monospace;margin:2em}}\
         table{{border-collapse:collapse}}\
         td,th{{padding:4px 12px;text-align:left;border-bottom:1px solid #ddd}}</style>\n\
         </head>\n<body>\n<h1>Services</h1>\n"
    );

    if status.shutting_down {
        html.push_str("<p><strong>Shutting down</strong></p>\n");
    }

    html.push_str(
        "<table>\n<tr><th>Service</th><th>State</th><th>PID</th><th>Starts</th><th>Last exit</th></tr>\n",
    );
    for svc in &status.services {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td style=\"color:{}\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&svc.name),
            state_color(svc.state),
            svc.state,
            format_pid(svc.pid),
            svc.starts,
            escape_html(svc.last_exit.as_deref().unwrap_or("-")),
        );
    }
    html.push_str("</table>\n<dl>\n");

    let rows = [
        ("Last restart", format_time(status.last_restart)),
        ("Last regenerate", format_time(status.last_regenerate)),
        (
            "Last change",
            status.last_change.clone().unwrap_or_else(|| "-".to_string()),
        ),
        (
            "Regenerating",
            if status.regenerating { "yes" } else { "no" }.to_string(),
        ),
        (
            "Regeneration pending",
            if status.pending_regenerate { "yes" } else { "no" }.to_string(),
        ),
        ("Cycles", status.cycles.to_string()),
        (
            "Regenerations",
            format!("{} ({} failed)", status.regenerations, status.regenerate_failures),
        ),
    ];
    for (label, value) in rows {
        let _ = writeln!(html, "<dt>{label}</dt><dd>{}</dd>", escape_html(&value));
    }
    html.push_str(
        "</dl>\n<p>Console: <code>restart</code> | <code>status</code> | \
         <code>help</code> | <code>quit</code></p>\n</body>\n</html>\n",
    );
    html
}
