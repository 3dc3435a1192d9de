//! # rxcheck report
//!
//! Renders a [`PrescriptionAnalysis`] into a printable A4 PDF report.
//!
//! Layout is a single text column written top to bottom. Long values are word-wrapped and a new
//! page is started whenever the next line would fall below the bottom margin, so reports with
//! many medicines or long narratives never lose content.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use rxcheck_types::{MedicineRecord, PrescriptionAnalysis};
use std::io::BufWriter;

/// Suggested download name for a rendered report.
pub const REPORT_FILENAME: &str = "prescription_report.pdf";

const REPORT_TITLE: &str = "Prescription Analysis Report";
const DISCLAIMER: &str = "This report was generated automatically from an AI analysis of \
    prescription text. It is not a substitute for review by a qualified clinician or \
    pharmacist.";
const NONE_REPORTED: &str = "None reported";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const INDENT: f32 = 25.0;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF font error: {0}")]
    Font(String),
    #[error("PDF save error: {0}")]
    Save(String),
    #[error("PDF buffer error: {0}")]
    Buffer(String),
}

/// Render `analysis` as a PDF and return the document bytes.
///
/// `notice` is printed prominently below the title; it carries the message of a failed analysis
/// so a report of the error envelope explains itself.
///
/// # Errors
///
/// Returns `ReportError` if a builtin font cannot be registered or the document cannot be
/// serialised.
pub fn render_report(
    analysis: &PrescriptionAnalysis,
    notice: Option<&str>,
) -> Result<Vec<u8>, ReportError> {
    let mut page = PageWriter::new(REPORT_TITLE)?;

    page.heading(REPORT_TITLE, 16.0);
    page.line(
        &format!(
            "Generated: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        ),
        9.0,
    );
    page.gap(4.0);

    if let Some(notice) = notice.filter(|n| !n.trim().is_empty()) {
        page.section("NOTICE");
        page.paragraph(notice, LEFT, 10.0);
        page.gap(4.0);
    }

    let evaluation = &analysis.evaluation;
    page.section("OVERALL");
    page.line(
        &format!(
            "Score: {}/100    Rating: {}",
            analysis.score, evaluation.overall_rating
        ),
        11.0,
    );
    page.gap(4.0);

    page.section("EVALUATION");
    page.item(&format!("Completeness: {}/100", evaluation.completeness));
    page.item(&format!("Safety: {}/100", evaluation.safety));
    page.item(&format!("Ambiguity: {}", evaluation.ambiguity.as_str()));
    page.gap(4.0);

    page.section("SUMMARY");
    if analysis.summary.trim().is_empty() {
        page.item(NONE_REPORTED);
    } else {
        page.paragraph(&analysis.summary, INDENT, 9.0);
    }
    page.gap(4.0);

    page.section("MEDICINES");
    if analysis.structured_prescription.is_empty() {
        page.item(NONE_REPORTED);
    }
    for (i, medicine) in analysis.structured_prescription.iter().enumerate() {
        write_medicine(&mut page, i + 1, medicine);
    }
    page.gap(4.0);

    page.section("DRUG INTERACTIONS");
    page.list(&analysis.drug_interactions);
    page.gap(4.0);

    page.section("RECOMMENDATIONS");
    page.list(&analysis.recommendations);
    page.gap(8.0);

    page.paragraph(DISCLAIMER, LEFT, 7.0);

    tracing::debug!("rendered report with {} page(s)", page.pages);
    page.finish()
}

fn write_medicine(page: &mut PageWriter, number: usize, medicine: &MedicineRecord) {
    page.bold_line(&format!("{number}. {}", medicine.name), INDENT, 10.0);
    page.item(&format!(
        "{} {}, {}, {}, for {}",
        medicine.formulation,
        medicine.strength,
        medicine.frequency,
        medicine.timing,
        medicine.duration
    ));
    for warning in &medicine.warnings {
        page.item(&format!("Warning: {warning}"));
    }
    page.gap(2.0);
}

/// Writes lines top to bottom, starting a new page when the bottom margin is reached.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page1, layer1) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Font(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Font(e.to_string()))?;

        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    /// Line height in mm for a font size in points.
    fn leading(size: f32) -> f32 {
        size * 0.5
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= BOTTOM {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    fn write(&mut self, text: &str, x: f32, size: f32, bold: bool) {
        let height = Self::leading(size);
        self.ensure_room(height);
        let font = if bold { &self.bold } else { &self.font };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
        self.y -= height;
    }

    fn heading(&mut self, text: &str, size: f32) {
        self.write(text, LEFT, size, true);
        self.gap(2.0);
    }

    fn section(&mut self, title: &str) {
        // Keep a section title on the same page as its first line.
        self.ensure_room(Self::leading(11.0) + Self::leading(9.0) + 1.0);
        self.write(title, LEFT, 11.0, true);
        self.gap(1.0);
    }

    fn line(&mut self, text: &str, size: f32) {
        self.write(text, LEFT, size, false);
    }

    fn bold_line(&mut self, text: &str, x: f32, size: f32) {
        for line in wrap_text(text, max_chars(x, size)) {
            self.write(&line, x, size, true);
        }
    }

    fn paragraph(&mut self, text: &str, x: f32, size: f32) {
        for line in wrap_text(text, max_chars(x, size)) {
            self.write(&line, x, size, false);
        }
    }

    fn item(&mut self, text: &str) {
        self.paragraph(text, INDENT, 9.0);
    }

    fn list(&mut self, items: &[String]) {
        let items: Vec<&String> = items.iter().filter(|i| !i.trim().is_empty()).collect();
        if items.is_empty() {
            self.item(NONE_REPORTED);
            return;
        }
        for item in items {
            self.item(&format!("- {item}"));
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReportError::Save(e.to_string()))?;
        buf.into_inner()
            .map_err(|e| ReportError::Buffer(e.to_string()))
    }
}

/// Approximate characters per line for Helvetica at `size` points starting at `x` mm.
fn max_chars(x: f32, size: f32) -> usize {
    let usable = PAGE_WIDTH - x - LEFT;
    // Average Helvetica glyph is roughly half the point size wide; 1pt = 0.3528mm.
    let glyph = size * 0.5 * 0.3528;
    (usable / glyph).floor().max(10.0) as usize
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(max_chars)
                .map_or(word.len(), |(i, _)| i);
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxcheck_types::{Ambiguity, Evaluation, OverallRating};

    fn sample() -> PrescriptionAnalysis {
        PrescriptionAnalysis {
            structured_prescription: vec![MedicineRecord {
                name: "Paracetamol".into(),
                formulation: "tablet".into(),
                strength: "500mg".into(),
                frequency: "three times daily".into(),
                timing: "after meals".into(),
                duration: "3 days".into(),
                warnings: vec!["Do not exceed 4g per day".into()],
            }],
            score: 85,
            evaluation: Evaluation {
                completeness: 80,
                safety: 90,
                ambiguity: Ambiguity::Low,
                overall_rating: OverallRating::Good,
            },
            summary: "Clear prescription for a short course of paracetamol.".into(),
            recommendations: vec!["Record patient weight".into()],
            drug_interactions: vec![],
        }
    }

    #[test]
    fn test_render_well_formed_analysis() {
        let bytes = render_report(&sample(), None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_empty_lists() {
        let mut analysis = sample();
        analysis.structured_prescription.clear();
        analysis.recommendations.clear();
        analysis.summary.clear();

        let bytes = render_report(&analysis, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_failed_skeleton_with_notice() {
        let bytes = render_report(
            &PrescriptionAnalysis::failed_skeleton(),
            Some("AI Analysis failed: AI returned empty response"),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_reports_break_pages() {
        let mut analysis = sample();
        let medicine = analysis.structured_prescription[0].clone();
        analysis.structured_prescription = vec![medicine; 60];

        let mut page = PageWriter::new("test").unwrap();
        for (i, m) in analysis.structured_prescription.iter().enumerate() {
            write_medicine(&mut page, i + 1, m);
        }
        assert!(page.pages > 1);
        assert!(page.finish().unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }
}
