use std::fmt::Write;

use crate::analyze::AnalysisResult;
use crate::category::CategoryContext;
use crate::oracle::OracleRequest;
use crate::session::Mode;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

const IMPROVE_PREAMBLE: &str = "You are a technical editor. Revise the document you are given \
so that it reads as clear, well-organized professional writing.";

const GENERATE_PREAMBLE: &str = "You are a technical writer. Draft a professional document \
from the brief you are given.";

const GUIDELINES: &[&str] = &[
    "Address each listed finding where it applies",
    "Preserve the technical content and intent",
    "Prefer precise, plain terminology",
    "Output only the document, with no commentary",
];

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the oracle request for one round.
pub fn build(
    mode: Mode,
    document: &str,
    analysis: &AnalysisResult,
    context: Option<&CategoryContext>,
) -> OracleRequest {
    OracleRequest {
        directive: directive(mode, context),
        payload: payload(mode, document, analysis),
    }
}

fn directive(mode: Mode, context: Option<&CategoryContext>) -> String {
    let mut out = String::new();
    out.push_str(match mode {
        Mode::Generate => GENERATE_PREAMBLE,
        Mode::Improve => IMPROVE_PREAMBLE,
    });
    out.push_str("\n\nGUIDELINES:\n");
    for line in GUIDELINES {
        let _ = writeln!(out, "- {line}");
    }
    if let Some(ctx) = context {
        let _ = write!(
            out,
            "\nCONTEXT:\n- Domain: {}\n- Scope: {}\n",
            ctx.display_name, ctx.description
        );
        if !ctx.examples.is_empty() {
            let _ = writeln!(out, "- Typical documents: {}", ctx.examples.join(", "));
        }
    }
    out
}

fn payload(mode: Mode, document: &str, analysis: &AnalysisResult) -> String {
    let heading = match mode {
        Mode::Generate => "BRIEF",
        Mode::Improve => "DOCUMENT TO IMPROVE",
    };

    let mut out = String::new();
    let _ = writeln!(out, "{heading}:\n```\n{document}\n```\n");

    out.push_str("IDENTIFIED IMPROVEMENTS NEEDED:\n");
    if analysis.findings.is_empty() {
        out.push_str("- None\n");
    }
    for finding in &analysis.findings {
        match &finding.suggested_fix {
            Some(fix) => {
                let _ = writeln!(out, "- [{}] {} -> {}", finding.severity, finding.detail, fix);
            }
            None => {
                let _ = writeln!(out, "- [{}] {}", finding.severity, finding.detail);
            }
        }
    }

    let _ = write!(
        out,
        "\nCURRENT QUALITY METRICS:\n- Overall score: {:.2}\n- Genuineness score: {:.2}\n\n",
        analysis.scores.overall, analysis.scores.genuineness
    );

    out.push_str(match mode {
        Mode::Generate => "Write the document described by the brief. Output only the document.",
        Mode::Improve => {
            "Revise this document to address the identified issues while keeping its core \
             technical content. Output only the revised document."
        }
    });
    out
}
