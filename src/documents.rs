use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::errors::RenderError;

pub const PLATFORM_NAME: &str = "Conecta Saber";

/// Everything a purchase receipt shows.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub purchase_id: i64,
    pub purchased_at: DateTime<Utc>,
    pub student_name: String,
    pub student_email: String,
    pub course_title: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub code: String,
    pub student_name: String,
    pub course_title: String,
    pub issued_on: NaiveDate,
    pub template_name: Option<String>,
}

pub trait DocumentRenderer: Send + Sync {
    fn render_receipt(&self, receipt: &Receipt) -> Result<Vec<u8>, RenderError>;
    fn render_certificate(&self, certificate: &CertificateDocument) -> Result<Vec<u8>, RenderError>;
}

/// `$1,234.50` style amount.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (whole, cents) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, ch) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{cents}")
}

/// Writes plain single-page PDFs with the built-in Helvetica font.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

struct Line {
    size: u32,
    text: String,
}

impl Line {
    fn new(size: u32, text: impl Into<String>) -> Self {
        Line { size, text: text.into() }
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render_receipt(&self, receipt: &Receipt) -> Result<Vec<u8>, RenderError> {
        let lines = vec![
            Line::new(20, PLATFORM_NAME),
            Line::new(16, "Purchase receipt"),
            Line::new(11, ""),
            Line::new(11, format!("Purchase no.: {}", receipt.purchase_id)),
            Line::new(11, format!("Date: {}", receipt.purchased_at.format("%d/%m/%Y %H:%M:%S"))),
            Line::new(11, format!("Student: {}", receipt.student_name)),
            Line::new(11, format!("Email: {}", receipt.student_email)),
            Line::new(11, format!("Course: {}", receipt.course_title)),
            Line::new(11, format!("Price: {}", format_amount(receipt.amount))),
            Line::new(11, ""),
            Line::new(10, "This document is a valid proof of purchase."),
        ];
        write_pdf(&lines)
    }

    fn render_certificate(&self, certificate: &CertificateDocument) -> Result<Vec<u8>, RenderError> {
        let mut lines = vec![
            Line::new(20, PLATFORM_NAME),
            Line::new(18, "Certificate of completion"),
            Line::new(12, ""),
            Line::new(12, "This certifies that"),
            Line::new(16, certificate.student_name.clone()),
            Line::new(12, "has completed the course"),
            Line::new(16, certificate.course_title.clone()),
            Line::new(12, ""),
            Line::new(11, format!("Issued on: {}", certificate.issued_on.format("%d/%m/%Y"))),
            Line::new(11, format!("Verification code: {}", certificate.code)),
        ];
        if let Some(template) = &certificate.template_name {
            lines.push(Line::new(9, format!("Template: {template}")));
        }
        write_pdf(&lines)
    }
}

/// Latin-1 bytes for WinAnsiEncoding, with PDF string escapes applied.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            c if (c as u32) < 0x20 => out.push(b' '),
            c if (c as u32) < 0x7f => out.push(c as u8),
            c if (0xa0..=0xff).contains(&(c as u32)) => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn write_pdf(lines: &[Line]) -> Result<Vec<u8>, RenderError> {
    if lines.is_empty() {
        return Err(RenderError("nothing to render".to_string()));
    }

    let mut content = Vec::new();
    let mut y: i64 = 720;
    for line in lines {
        if y < 72 {
            return Err(RenderError("content does not fit on one page".to_string()));
        }
        content.extend_from_slice(format!("BT /F1 {} Tf 72 {} Td (", line.size, y).as_bytes());
        content.extend_from_slice(&encode_text(&line.text));
        content.extend_from_slice(b") Tj ET\n");
        y -= i64::from(line.size) + 10;
    }

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>".to_vec(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    ];
    let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    stream.extend_from_slice(&content);
    stream.extend_from_slice(b"endstream");
    objects.push(stream);

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        pdf.extend_from_slice(body);
        pdf.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n", objects.len() + 1).as_bytes(),
    );

    Ok(pdf)
}
