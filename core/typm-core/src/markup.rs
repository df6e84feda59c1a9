//! Probe document builder (made by FontLab https://www.fontlab.com/)
//!
//! Every batch is presented as a fresh document: stylesheet links for
//! the baseline and target fonts, one hidden absolutely-positioned
//! element per probe so probes cannot reflow each other, and a readiness
//! flag the document raises once parsed. Probe text is emitted as
//! numeric character references so markup stays valid for any probe.

use std::fmt::Write as _;

use crate::catalog::FontDescriptor;
use crate::probe::Probe;

/// A presented character batch: markup plus the selectors to read back.
#[derive(Debug, Clone)]
pub struct BatchDocument {
    pub markup: String,
    /// Probe element selector paired with the probe's canonical key.
    pub probes: Vec<(String, String)>,
    /// Sentinel rendering the reference string in the baseline face.
    pub base_sentinel: String,
    /// Sentinel rendering the reference string in the target face.
    pub target_sentinel: String,
}

/// A presented scale batch: baseline plus one or more target fonts.
#[derive(Debug, Clone)]
pub struct ScaleDocument {
    pub markup: String,
    pub base_width: String,
    pub base_height: String,
    /// Per-font (key, width selector, height selector).
    pub fonts: Vec<(String, String, String)>,
}

/// Build the document for one character batch of a single target font.
pub fn character_batch_document(
    target: &FontDescriptor,
    baseline: &FontDescriptor,
    probes: &[Probe],
    size_px: f64,
    sentinel_text: &str,
) -> BatchDocument {
    let mut body = String::new();
    let mut slots = Vec::with_capacity(probes.len());

    for (i, probe) in probes.iter().enumerate() {
        let id = format!("probe-{i}");
        writeln!(
            body,
            r#"    <div id="{id}" class="probe target">{}</div>"#,
            char_ref(probe.ch)
        )
        .expect("write to string");
        slots.push((format!("#{id}"), probe.id.clone()));
    }

    writeln!(
        body,
        r#"    <div id="sentinel-base" class="probe base">{}</div>"#,
        escape_text(sentinel_text)
    )
    .expect("write to string");
    writeln!(
        body,
        r#"    <div id="sentinel-target" class="probe target">{}</div>"#,
        escape_text(sentinel_text)
    )
    .expect("write to string");

    let markup = document(
        &[baseline.import_url.as_str(), target.import_url.as_str()],
        &format!(
            "      .base {{ font-family: {}; }}\n      .target {{ font-family: {}, monospace; }}\n",
            baseline.css_family, target.css_family
        ),
        size_px,
        &body,
    );

    BatchDocument {
        markup,
        probes: slots,
        base_sentinel: "#sentinel-base".to_string(),
        target_sentinel: "#sentinel-target".to_string(),
    }
}

/// Build the document for one scale batch: the baseline font and every
/// target font render the same probe strings side by side, in a single
/// document, so engine-level layout jitter cancels out.
pub fn scale_batch_document(
    targets: &[(String, FontDescriptor)],
    baseline: &FontDescriptor,
    size_px: f64,
    width_text: &str,
    height_text: &str,
) -> ScaleDocument {
    let mut links: Vec<&str> = vec![baseline.import_url.as_str()];
    let mut styles = format!("      .base {{ font-family: {}; }}\n", baseline.css_family);
    let mut body = String::new();
    let mut fonts = Vec::with_capacity(targets.len());

    writeln!(
        body,
        r#"    <div id="base-w" class="probe base">{}</div>"#,
        escape_text(width_text)
    )
    .expect("write to string");
    writeln!(
        body,
        r#"    <div id="base-h" class="probe base">{}</div>"#,
        escape_text(height_text)
    )
    .expect("write to string");

    for (i, (key, font)) in targets.iter().enumerate() {
        if !links.contains(&font.import_url.as_str()) {
            links.push(font.import_url.as_str());
        }
        writeln!(
            styles,
            "      .f{i} {{ font-family: {}, monospace; }}",
            font.css_family
        )
        .expect("write to string");
        writeln!(
            body,
            r#"    <div id="f{i}-w" class="probe f{i}">{}</div>"#,
            escape_text(width_text)
        )
        .expect("write to string");
        writeln!(
            body,
            r#"    <div id="f{i}-h" class="probe f{i}">{}</div>"#,
            escape_text(height_text)
        )
        .expect("write to string");
        fonts.push((key.clone(), format!("#f{i}-w"), format!("#f{i}-h")));
    }

    let markup = document(&links, &styles, size_px, &body);

    ScaleDocument {
        markup,
        base_width: "#base-w".to_string(),
        base_height: "#base-h".to_string(),
        fonts,
    }
}

fn document(stylesheets: &[&str], font_rules: &str, size_px: f64, body: &str) -> String {
    let mut links = String::new();
    for url in stylesheets {
        writeln!(links, r#"    <link rel="stylesheet" href="{url}">"#).expect("write to string");
    }

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
{links}    <style>
      * {{ box-sizing: border-box; }}
      body {{ margin: 0; padding: 20px; font-feature-settings: normal; }}
      .probe {{
        font-size: {size_px}px;
        line-height: 1;
        position: absolute;
        top: -9999px;
        left: -9999px;
        visibility: hidden;
        white-space: nowrap;
        font-variant: normal;
        font-kerning: none;
      }}
{font_rules}    </style>
  </head>
  <body>
{body}    <script>
      window.measureReady = false;
      document.addEventListener('DOMContentLoaded', () => {{
        window.measureReady = true;
      }});
    </script>
  </body>
</html>
"#
    )
}

fn char_ref(ch: char) -> String {
    format!("&#x{:X};", ch as u32)
}

fn escape_text(text: &str) -> String {
    text.chars().map(char_ref).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::baseline_descriptor;
    use crate::probe::Probe;

    fn target() -> FontDescriptor {
        FontDescriptor {
            import_url: "https://fonts.example/css?family=Test".to_string(),
            css_family: "'Test Face', serif".to_string(),
            display_name: None,
        }
    }

    #[test]
    fn character_document_has_one_element_per_probe() {
        let probes = vec![
            Probe {
                id: "U+0041".to_string(),
                ch: 'A',
            },
            Probe {
                id: "U+003C".to_string(),
                ch: '<',
            },
        ];
        let doc =
            character_batch_document(&target(), &baseline_descriptor(), &probes, 100.0, "WWWW");

        assert_eq!(doc.probes.len(), 2);
        assert!(doc.markup.contains("&#x41;"));
        // Markup-significant characters must be escaped.
        assert!(doc.markup.contains("&#x3C;"));
        assert!(doc.markup.contains(r##"id="probe-0""##));
        assert!(doc.markup.contains("measureReady"));
        assert!(doc.markup.contains(&target().import_url));
    }

    #[test]
    fn scale_document_names_selectors_per_font() {
        let targets = vec![
            ("alpha".to_string(), target()),
            ("beta".to_string(), target()),
        ];
        let doc = scale_batch_document(&targets, &baseline_descriptor(), 100.0, "WW", "Ág");

        assert_eq!(doc.fonts.len(), 2);
        assert_eq!(doc.fonts[0].1, "#f0-w");
        assert_eq!(doc.fonts[1].2, "#f1-h");
        assert!(doc.markup.contains("base-w"));
    }
}
