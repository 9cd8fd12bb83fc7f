//! Self-contained HTML report rendered with maud; plots are plotly traces
//! inlined as `<div>` + script.

use std::fs;
use std::io;
use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::report::plots::{plot_metric_bars, plot_roc_curves};
use crate::report::{format_metric, Report};
use crate::runner::{ModelEvaluation, RowStatus};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
    plot_count: usize,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            content: Vec::new(),
            plot_count: 0,
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        let id = format!(
            "plot-{}-{}",
            self.title.to_lowercase().replace(' ', "-"),
            self.plot_count
        );
        self.plot_count += 1;
        self.content
            .push(PreEscaped(plot.to_inline_html(Some(id.as_str()))));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    div class="block" { (block) }
                }
            }
        }
    }
}

pub struct HtmlReport {
    title: String,
    subtitle: String,
    generated_at: String,
    sections: Vec<ReportSection>,
}

impl HtmlReport {
    pub fn new(title: &str, subtitle: &str, generated_at: &str) -> Self {
        HtmlReport {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            generated_at: generated_at.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em; }
                        table { border-collapse: collapse; }
                        th, td { padding: 4px 10px; border-bottom: 1px solid #ddd; text-align: right; }
                        th:first-child, td:first-child { text-align: left; }
                        .flagged { color: #a94442; }"
                    }
                }
                body {
                    h1 { (self.title) }
                    p { (self.subtitle) }
                    p { small { "Generated " (self.generated_at) } }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.render().into_string())
    }
}

fn metric_table(report: &Report) -> Markup {
    html! {
        table {
            thead {
                tr {
                    @for name in super::CSV_HEADER {
                        th { (name) }
                    }
                    th { "Status" }
                }
            }
            tbody {
                @for row in report.rows() {
                    @let class = if row.status == RowStatus::Complete { "" } else { "flagged" };
                    tr class=(class) {
                        td { (row.model) }
                        @for value in row.values() {
                            td { (format_metric_cell(value)) }
                        }
                        td { (row.status.to_string()) }
                    }
                }
            }
        }
    }
}

fn format_metric_cell(value: f64) -> String {
    if value.is_nan() {
        format_metric(value)
    } else {
        format!("{:.4}", value)
    }
}

/// Assemble the benchmark report: overview, metric table, ROC curves and,
/// when given, the effective configuration as JSON.
pub fn benchmark_report(
    report: &Report,
    evaluations: &[ModelEvaluation],
    config_json: Option<&str>,
) -> HtmlReport {
    let mut html_report = HtmlReport::new(
        &report.title,
        &format!("{} models compared on the held-out test partition", report.rows().len()),
        &report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    let mut overview = ReportSection::new("Overview");
    overview.add_content(html! {
        ul {
            @if let Some(seed) = report.seed {
                li { "Seed: " (seed) }
            }
            @if let Some([train, validation, test]) = report.partition_sizes {
                li { "Partitions: train " (train) ", validation " (validation) " (reserved), test " (test) }
            }
            @for row in report.flagged() {
                li class="flagged" { (row.model) ": " (row.status.to_string()) }
            }
        }
    });
    html_report.add_section(overview);

    let mut metrics_section = ReportSection::new("Metrics");
    metrics_section.add_content(metric_table(report));
    metrics_section.add_plot(plot_metric_bars(report, "Test-set metrics"));
    html_report.add_section(metrics_section);

    let curves: Vec<(&str, &crate::metrics::RocCurve)> = evaluations
        .iter()
        .filter_map(|e| e.roc_curve.as_ref().map(|c| (e.row.model.as_str(), c)))
        .collect();
    if !curves.is_empty() {
        let mut roc_section = ReportSection::new("ROC curves");
        roc_section.add_plot(plot_roc_curves(&curves, "ROC curves on the test partition"));
        roc_section.add_content(html! {
            table {
                thead { tr { th { "Model" } th { "Fit + predict time" } } }
                tbody {
                    @for e in evaluations {
                        tr { td { (e.row.model) } td { (format!("{:.2?}", e.fit_time)) } }
                    }
                }
            }
        });
        html_report.add_section(roc_section);
    }

    if let Some(json) = config_json {
        let mut config_section = ReportSection::new("Configuration");
        config_section.add_content(html! {
            pre { code { (json) } }
        });
        html_report.add_section(config_section);
    }

    html_report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MetricRow;

    #[test]
    fn report_html_contains_table_and_sections() {
        let report = Report::new(vec![MetricRow::failed("XGBoost", "boom")])
            .with_seed(42)
            .with_partition_sizes(140, 30, 30);
        let html = benchmark_report(&report, &[], Some("{\"seed\": 42}"))
            .render()
            .into_string();
        assert!(html.contains("<h2>Overview</h2>"));
        assert!(html.contains("Seed: 42"));
        assert!(html.contains("ROC AUC"));
        assert!(html.contains("failed (boom)"));
        assert!(html.contains("Configuration"));
        assert!(!html.contains("ROC curves on the test partition"));
    }

    #[test]
    fn save_to_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");
        HtmlReport::new("t", "s", "now").save_to_file(&path).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().starts_with("<!DOCTYPE html>"));
    }
}
