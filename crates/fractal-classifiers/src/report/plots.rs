use plotly::common::{DashType, Line, Mode};
use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Bar, Plot, Scatter};

use crate::metrics::RocCurve;
use crate::report::Report;

/// Overlay the ROC curves of several models, with the chance diagonal.
pub fn plot_roc_curves(curves: &[(&str, &RocCurve)], title: &str) -> Plot {
    let mut plot = Plot::new();
    for (name, curve) in curves {
        let trace = Scatter::new(curve.fpr.clone(), curve.tpr.clone())
            .mode(Mode::Lines)
            .name(*name);
        plot.add_trace(trace);
    }

    let reference_line = Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("Chance")
        .line(Line::new().color("grey").dash(DashType::Dash));
    plot.add_trace(reference_line);

    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("False positive rate"))
            .y_axis(Axis::new().title("True positive rate")),
    );
    plot
}

/// Grouped bars, one group per metric and one bar per model. NaN values are
/// drawn as zero-height bars.
pub fn plot_metric_bars(report: &Report, title: &str) -> Plot {
    let metric_names: Vec<String> = super::CSV_HEADER[1..].iter().map(|s| s.to_string()).collect();
    let mut plot = Plot::new();
    for row in report.rows() {
        let values: Vec<f64> = row
            .values()
            .iter()
            .map(|v| if v.is_nan() { 0.0 } else { *v })
            .collect();
        plot.add_trace(Bar::new(metric_names.clone(), values).name(&row.model));
    }
    plot.set_layout(
        Layout::new()
            .title(title)
            .bar_mode(BarMode::Group)
            .y_axis(Axis::new().title("Score").range(vec![0.0, 1.0])),
    );
    plot
}
