//! Single-page PDF 1.4 writer for fixed-layout documents.
//!
//! Output depends only on the drawing calls and the creation date: no ids, no clocks, no
//! compression. Text uses the standard Helvetica faces, so only printable ASCII survives;
//! anything else is written as `?`.

use chrono::NaiveDate;

pub const PAGE_WIDTH: u32 = 595;
pub const PAGE_HEIGHT: u32 = 842;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfDocument {
    title: String,
    created_on: NaiveDate,
    content: String,
}

impl PdfDocument {
    pub fn new(title: impl Into<String>, created_on: NaiveDate) -> Self {
        Self {
            title: title.into(),
            created_on,
            content: String::new(),
        }
    }

    /// Draws `text` with its baseline starting at `(x, y)` in points from the bottom left.
    pub fn text(&mut self, font: Font, size: u32, x: u32, y: u32, text: &str) {
        self.content.push_str(&format!(
            "BT /{} {size} Tf {x} {y} Td ({}) Tj ET\n",
            font.resource(),
            escape(text)
        ));
    }

    pub fn rule(&mut self, x1: u32, y1: u32, x2: u32, y2: u32) {
        self.content
            .push_str(&format!("0.5 w {x1} {y1} m {x2} {y2} l S\n"));
    }

    pub fn finish(self) -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 5 0 R /F2 6 0 R >> >> /Contents 4 0 R >>"
            ),
            format!(
                "<< /Length {} >>\nstream\n{}endstream",
                self.content.len(),
                self.content
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
            format!(
                "<< /Title ({}) /Producer (edu-console) /CreationDate (D:{}000000Z) >>",
                escape(&self.title),
                self.created_on.format("%Y%m%d")
            ),
        ];

        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 7 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// Escapes a string for a PDF literal; non-printable and non-ASCII characters become `?`.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}
