//! Server-rendered HTML for the prediction form at `/`.

use serde_json::Value;
use std::fmt::Write;

use crate::predictor::{
    is_binary_feature, FeatureSchema, Payload, PredictionResult, BINARY_YES_VALUE,
};

/// Everything the form page shows for one request.
pub struct FormPage<'a> {
    pub feature_order: &'a FeatureSchema,
    pub values: &'a Payload,
    pub result: Option<&'a PredictionResult>,
    pub error: Option<&'a str>,
    pub model_ready: bool,
    pub startup_error: Option<String>,
}

impl FormPage<'_> {
    pub fn render(&self) -> String {
        let mut html = String::with_capacity(8 * 1024);
        html.push_str(
            "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Prediccion de hepatitis</title>\n</head>\n<body>\n\
             <h1>Prediccion de supervivencia en hepatitis</h1>\n",
        );

        if !self.model_ready {
            html.push_str("<div class=\"alert alert-warning\">Los modelos no estan cargados.");
            if let Some(err) = &self.startup_error {
                let _ = write!(html, " <small>{}</small>", escape_html(err));
            }
            html.push_str("</div>\n");
        }

        if let Some(err) = self.error {
            let _ = writeln!(
                html,
                "<div class=\"alert alert-danger\">{}</div>",
                escape_html(err)
            );
        }

        html.push_str("<form method=\"post\" action=\"/\">\n");
        for feature in self.feature_order.iter() {
            self.render_field(&mut html, feature);
        }
        html.push_str("<button type=\"submit\">Predecir</button>\n</form>\n");

        if let Some(result) = self.result {
            render_result(&mut html, result);
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn render_field(&self, html: &mut String, feature: &str) {
        let name = escape_html(feature);
        let value = self.values.get(feature);

        if is_binary_feature(feature) {
            let checked = value.and_then(Value::as_f64) == Some(BINARY_YES_VALUE as f64);
            let _ = writeln!(
                html,
                "<label><input type=\"checkbox\" name=\"{name}\" value=\"{BINARY_YES_VALUE}\"{}> {name}</label><br>",
                if checked { " checked" } else { "" }
            );
        } else {
            let text = value.map(display_value).unwrap_or_default();
            let _ = writeln!(
                html,
                "<label>{name} <input type=\"text\" name=\"{name}\" value=\"{}\"></label><br>",
                escape_html(&text)
            );
        }
    }
}

fn render_result(html: &mut String, result: &PredictionResult) {
    let _ = writeln!(
        html,
        "<div class=\"result\"><h2>Resultado: {} ({})</h2>",
        escape_html(&result.prediction_label),
        escape_html(&result.prediction)
    );
    if !result.probabilities.is_empty() {
        html.push_str("<ul>\n");
        for (label, p) in &result.probabilities {
            let _ = writeln!(
                html,
                "<li>Clase {}: {:.1}%</li>",
                escape_html(label),
                p * 100.0
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
