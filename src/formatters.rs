use crate::models::CityInput;
use crate::orchestrator::{ChartNode, NodeId, RouteNode, SessionSnapshot};

/// Formats the published session outputs into a human-readable string
pub fn format_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut output = String::from("Route Weather\n\n");

    output.push_str(&format_city("Start", &snapshot.start.input, &snapshot.start.output));
    for view in &snapshot.intermediates {
        let label = format!("Intermediate #{}", view.slot.index);
        output.push_str(&format_city(&label, &view.slot.input, &view.output));
    }
    output.push_str(&format_city("End", &snapshot.end.input, &snapshot.end.output));
    output.push_str(&format_route(&snapshot.route));
    output
}

fn format_city(label: &str, input: &CityInput, node: &ChartNode) -> String {
    let name = if input.has_name() {
        input.query.as_str()
    } else {
        "(none)"
    };
    let mut output = format!(
        "{}: {}\n  Parameter: {}\n  Days: {}\n",
        label,
        name,
        input.parameter.series_label(),
        input.horizon_days.get()
    );

    if let Some(at) = node.location {
        output.push_str(&format!(
            "  Location: {:.4}, {:.4}\n",
            at.latitude, at.longitude
        ));
    }

    match &node.issue {
        Some(issue) => output.push_str(&format!("  Chart: blank ({})\n", issue)),
        None if node.chart.traces.is_empty() => {
            output.push_str(&format!("  Chart: {} (no data)\n", node.chart.title))
        }
        None => {
            let values: Vec<f64> = node
                .chart
                .traces
                .iter()
                .flat_map(|t| t.y.iter().flatten().copied())
                .collect();
            output.push_str(&format!(
                "  Chart: {}, {} hourly points\n",
                node.chart.title,
                node.chart.point_count()
            ));
            if let Some((min, max)) = value_range(&values) {
                output.push_str(&format!("  Range: {:.1} - {:.1}\n", min, max));
            }
        }
    }
    output.push('\n');
    output
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

fn format_route(route: &RouteNode) -> String {
    let mut output = if route.stops.is_empty() {
        String::from("Route: no resolved cities\n")
    } else {
        let names: Vec<&str> = route.stops.iter().map(|s| s.name.as_str()).collect();
        format!(
            "Route: {} ({} stop(s))\n",
            names.join(" -> "),
            route.stops.len()
        )
    };

    for skipped in &route.skipped {
        let reason = skipped
            .issue
            .as_ref()
            .map(|issue| issue.to_string())
            .unwrap_or_default();
        output.push_str(&format!(
            "  Skipped {} ({}): {}\n",
            skipped.city, skipped.name, reason
        ));
    }
    output
}

/// Lists the nodes an event recomputed
pub fn format_recomputed(nodes: &[NodeId]) -> String {
    if nodes.is_empty() {
        return "Nothing to recompute.".to_string();
    }
    let names: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
    format!("Recomputed: {}", names.join(", "))
}
