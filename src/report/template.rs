use std::path::Path;

use minijinja::{Environment, context};

use crate::foundation::error::{QcError, QcResult};
use crate::report::embed::Reportlet;

const DEFAULT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Cortical thickness QC</title>
<style>
body { font-family: sans-serif; margin: 2em; background: #fafafa; }
.reportlet-block { margin-bottom: 2em; }
.reportlet-block .source { font-size: 0.8em; color: #666; }
object.reportlet { width: 100%; }
pre.antscmd { white-space: pre-wrap; background: #eee; padding: 1em; }
</style>
</head>
<body>
<h1>Longitudinal cortical thickness report</h1>
<h2>Figures</h2>
{% for im in images %}
<div class="reportlet-block">
<p class="source">{{ im[0]|e }}</p>
{{ im[1] }}
</div>
{% endfor %}
<h2>Pipeline command</h2>
<pre class="antscmd">{{ antscmd }}</pre>
</body>
</html>
"#;

/// Jinja-style HTML page.
///
/// It is rendered with `images`, a list of `(source, snippet)` pairs in figure order, and
/// `antscmd`, the pipeline command. Values are inserted without autoescaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportTemplate {
    text: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReportTemplate {
    /// The page used when no template file is given.
    pub fn builtin() -> Self {
        Self {
            text: DEFAULT_PAGE.to_string(),
        }
    }

    /// Template text from memory. Syntax errors are reported here, not at render time.
    pub fn from_text(text: impl Into<String>) -> QcResult<Self> {
        Self::checked(text.into(), "report template")
    }

    /// Template from a file.
    pub fn from_path(path: &Path) -> QcResult<Self> {
        if !path.is_file() {
            return Err(QcError::file_not_found(path));
        }
        let text = std::fs::read_to_string(path).map_err(|e| QcError::load(path, e))?;
        Self::checked(text, &format!("report template '{}'", path.display()))
    }

    fn checked(text: String, origin: &str) -> QcResult<Self> {
        environment()
            .template_from_str(&text)
            .map(|_| ())
            .map_err(|e| QcError::config(format!("{origin}: {e}")))?;
        Ok(Self { text })
    }

    /// Raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render the page. Rendered values are never evaluated again, so a command that
    /// contains template syntax comes out as written.
    pub fn render(&self, reportlets: &[Reportlet], antscmd: &str) -> QcResult<String> {
        let images: Vec<(String, String)> = reportlets
            .iter()
            .map(|r| (r.source.display().to_string(), r.snippet.clone()))
            .collect();
        let env = environment();
        let tmpl = env
            .template_from_str(&self.text)
            .map_err(|e| QcError::config(format!("report template: {e}")))?;
        tmpl.render(context! { images => images, antscmd => antscmd })
            .map_err(|e| QcError::render(format!("report template: {e}")))
    }
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env
}

#[cfg(test)]
#[path = "../../tests/unit/report/template.rs"]
mod tests;
