//! FASTA, HTML and JSON reports of scored records.

use crate::{
    error::{NpSearchError, Result},
    scoring,
};
use itertools::Itertools;
use npsearch_protocol::SequenceRecord;
use std::{
    fmt::Write as _,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

const HTML_STYLE: &str = "\
body { font-family: sans-serif; }
p.sequence { font-family: monospace; word-wrap: break-word; }
.signalp { color: #c0392b; }
.np_clv { color: #2e86c1; font-weight: bold; }
.mono_np_clv { color: #27ae60; font-weight: bold; }
.cysteine { color: #d68910; }
.glycine { color: #8e44ad; font-weight: bold; }
";

#[derive(Debug, Clone)]
pub struct OutputFiles {
    pub fasta: PathBuf,
    pub html: PathBuf,
    pub json: PathBuf,
}

/// File name of `input` without directory, `.gz` and the FASTA extension.
pub fn output_stem(input: &Path) -> String {
    let mut path = input.to_path_buf();
    if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
    {
        path.set_extension("");
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "npsearch".to_string())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn fasta_text(records: &[SequenceRecord]) -> String {
    let mut ret = String::new();
    for record in records {
        let _ = write!(ret, ">{}", record.id());
        if let Some(frame) = record.translated_frame() {
            let _ = write!(ret, " frame={frame}");
        }
        let _ = writeln!(ret, " score={:.2}", record.score());
        let _ = writeln!(ret, "{}{}", record.signal_peptide(), record.mature_sequence());
    }
    ret
}

/// CSS class of every byte of a mature sequence.
fn residue_classes(mature: &str) -> Vec<Option<&'static str>> {
    let bytes = mature.as_bytes();
    let mut classes: Vec<Option<&'static str>> = bytes
        .iter()
        .map(|b| (*b == b'C').then_some("cysteine"))
        .collect();
    for (start, motif) in scoring::find_motifs(mature) {
        let end = start + motif.len();
        if motif.kind.is_dibasic() {
            classes[start..end].fill(Some("np_clv"));
            if start > 0 && bytes[start - 1] == b'G' {
                classes[start - 1] = Some("glycine");
            }
        } else if motif.kind.is_monobasic() {
            classes[end - 1] = Some("mono_np_clv");
        }
    }
    classes
}

/// HTML of a raw mature sequence with every run of equally classed residues
/// escaped and wrapped in one span.
fn marked_up_mature(mature: &str) -> String {
    let classes = residue_classes(mature);
    let mut ret = String::new();
    for (class, run) in &mature.bytes().zip(classes).chunk_by(|(_, class)| *class) {
        let bytes: Vec<u8> = run.map(|(b, _)| b).collect();
        let residues = escape_html(&String::from_utf8_lossy(&bytes));
        match class {
            Some(class) => {
                let _ = write!(ret, "<span class=\"{class}\">{residues}</span>");
            }
            None => ret.push_str(&residues),
        }
    }
    ret
}

pub fn html_text(records: &[SequenceRecord]) -> String {
    let mut ret = String::new();
    ret.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    ret.push_str("<title>NpSearch results</title>\n");
    let _ = writeln!(ret, "<style>\n{HTML_STYLE}</style>\n</head>\n<body>");
    let _ = writeln!(ret, "<h1>NpSearch results ({} candidates)</h1>", records.len());
    for record in records {
        let _ = write!(
            ret,
            "<h3>{} (score {:.2}",
            escape_html(record.id()),
            record.score()
        );
        if let Some(frame) = record.translated_frame() {
            let _ = write!(ret, ", frame {frame}");
        }
        let signal = record.signal_peptide_result();
        let _ = writeln!(
            ret,
            ", D-score {:.3}, cleavage after residue {})</h3>",
            signal.d_score,
            signal.cleavage_position.saturating_sub(1)
        );
        let _ = writeln!(
            ret,
            "<p class=\"sequence\"><span class=\"signalp\">{}</span>{}</p>",
            escape_html(record.signal_peptide()),
            marked_up_mature(record.mature_sequence())
        );
    }
    ret.push_str("</body>\n</html>\n");
    ret
}

pub fn json_text(records: &[SequenceRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// `contents` in a temporary file inside `dir`, ready to be renamed into place.
fn stage(dir: &Path, contents: &str) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    Ok(tmp)
}

/// Stages every report, then renames them into place together.
///
/// Nothing is renamed until every report has been written. If a rename still
/// fails, the reports already moved into place are removed again.
fn persist_all(dir: &Path, reports: &[(&Path, String)]) -> Result<()> {
    if let Some((path, _)) = reports.iter().find(|(path, _)| path.is_dir()) {
        return Err(NpSearchError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("'{}' is a directory", path.display()),
        )));
    }
    let mut staged = vec![];
    for (path, contents) in reports {
        staged.push((stage(dir, contents)?, *path));
    }
    let mut persisted = vec![];
    for (tmp, path) in staged {
        if let Err(e) = tmp.persist(path) {
            for done in persisted {
                let _ = std::fs::remove_file(done);
            }
            return Err(e.error.into());
        }
        persisted.push(path);
    }
    Ok(())
}

/// Renders all reports first and only then writes them.
pub fn write_outputs(
    output_dir: &Path,
    stem: &str,
    records: &[SequenceRecord],
) -> Result<OutputFiles> {
    let fasta = fasta_text(records);
    let html = html_text(records);
    let json = json_text(records)?;

    std::fs::create_dir_all(output_dir)?;
    let files = OutputFiles {
        fasta: output_dir.join(format!("{stem}.npsearch.fa")),
        html: output_dir.join(format!("{stem}.npsearch.html")),
        json: output_dir.join(format!("{stem}.npsearch.json")),
    };
    persist_all(
        output_dir,
        &[
            (files.fasta.as_path(), fasta),
            (files.html.as_path(), html),
            (files.json.as_path(), json),
        ],
    )?;
    log::info!(
        "Wrote {}, {} and {}",
        files.fasta.display(),
        files.html.display(),
        files.json.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_peptide::tests::positive;
    use tempfile::tempdir;

    fn record(id: &str, frame: Option<u8>, score: f64) -> SequenceRecord {
        let mut record = SequenceRecord::from_signal_peptide(
            id,
            "MSPACAGKRAAKAARCC",
            frame,
            positive(id, 5, 0.8),
        )
        .unwrap();
        record.add_score(score);
        record
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("/data/genes.fasta")), "genes");
        assert_eq!(output_stem(Path::new("genes.fa.gz")), "genes");
        assert_eq!(output_stem(Path::new("reads")), "reads");
    }

    #[test]
    fn test_fasta_text() {
        let text = fasta_text(&[record("a_f2_0", Some(2), 0.43), record("b", None, 0.1)]);
        assert_eq!(
            text,
            ">a_f2_0 frame=2 score=0.43\nMSPACAGKRAAKAARCC\n>b score=0.10\nMSPACAGKRAAKAARCC\n"
        );
    }

    #[test]
    fn test_html_markup() {
        // mature: C A G K R A A K A A R C C
        let markup = marked_up_mature("CAGKRAAKAARCC");
        assert_eq!(
            markup,
            "<span class=\"cysteine\">C</span>A<span class=\"glycine\">G</span>\
             <span class=\"np_clv\">KR</span>AAKAA<span class=\"mono_np_clv\">R</span>\
             <span class=\"cysteine\">CC</span>"
        );
        let html = html_text(&[record("a<b>", None, 0.5)]);
        assert!(html.contains("<span class=\"signalp\">MSPA</span>"));
        assert!(html.contains("a&lt;b&gt; (score 0.50, D-score 0.800, cleavage after residue 4)</h3>"));
    }

    #[test]
    fn test_markup_keeps_multibyte_characters_whole() {
        assert_eq!(
            marked_up_mature("CÉKR"),
            "<span class=\"cysteine\">C</span>É<span class=\"np_clv\">KR</span>"
        );
        assert_eq!(
            marked_up_mature("A<KR"),
            "A&lt;<span class=\"np_clv\">KR</span>"
        );
    }

    #[test]
    fn test_write_outputs() {
        let td = tempdir().unwrap();
        let out = td.path().join("results");
        let records = vec![record("a", Some(1), 1.0), record("b", Some(4), 0.5)];
        let files = write_outputs(&out, "input", &records).unwrap();
        assert!(files.fasta.ends_with("input.npsearch.fa"));
        let json = std::fs::read_to_string(&files.json).unwrap();
        let back: Vec<SequenceRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records);
        assert!(std::fs::read_to_string(&files.html).unwrap().contains("frame 4"));
        // only the three reports, no leftover temporary files
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 3);
    }

    #[test]
    fn test_write_outputs_leaves_nothing_when_one_report_fails() {
        let td = tempdir().unwrap();
        let out = td.path();
        std::fs::write(out.join("input.npsearch.fa"), "previous run\n").unwrap();
        std::fs::create_dir(out.join("input.npsearch.html")).unwrap();

        let records = vec![record("a", Some(1), 1.0)];
        assert!(write_outputs(out, "input", &records).is_err());
        assert_eq!(
            std::fs::read_to_string(out.join("input.npsearch.fa")).unwrap(),
            "previous run\n"
        );
        assert!(!out.join("input.npsearch.json").exists());
        // the blocking directory and the untouched old report, no temporary files
        assert_eq!(std::fs::read_dir(out).unwrap().count(), 2);
    }
}
