use super::{parse_literal, Literal, Result};
use crate::eval::{barcode_from_id, Chunk, Event, ScoredEvent};
use flate2::read::MultiGzDecoder;
use itertools::Itertools;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read as ioRead};
use std::path::{Path, PathBuf};

pub fn open_events_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead>>> {
    fn is_gzipped(path: &Path) -> bool {
        let path_str = path.to_string_lossy().to_lowercase();
        path_str.ends_with(".gz") || path_str.ends_with(".gzip")
    }
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(format!("Invalid gzip header: {}", path.to_string_lossy()))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

/// Read a ranked event list, one `barcode-id@contexts@labels` record per line.
pub fn read_ranked_events<R: BufRead>(reader: R) -> Result<Vec<ScoredEvent>> {
    let mut events = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let event = parse_ranked_event(&line)
            .map_err(|e| format!("Malformed event at line {}: {}", line_number + 1, e))?;
        events.push(event);
    }
    Ok(events)
}

fn parse_ranked_event(line: &str) -> Result<ScoredEvent> {
    let fields = line.split('@').collect_vec();
    if fields.len() < 3 {
        return Err(format!(
            "Expected 3 '@'-separated fields, found {}",
            fields.len()
        ));
    }
    let id = fields[0].trim();
    if id.is_empty() {
        return Err("Missing event identifier".into());
    }

    let contexts = parse_literal(fields[1])?;
    let contexts = contexts
        .as_seq()
        .ok_or("Context field is not a list")?
        .iter()
        .map(context_score)
        .collect::<Result<Vec<_>>>()?;

    let labels = parse_literal(fields[2])?;
    let labels = labels
        .as_seq()
        .ok_or("Label field is not a list")?
        .iter()
        .map(chunk_label)
        .collect::<Result<Vec<_>>>()?;

    if contexts.len() != labels.len() {
        return Err(format!(
            "{} contexts but {} labels",
            contexts.len(),
            labels.len()
        ));
    }

    let chunks = contexts
        .into_iter()
        .zip(labels)
        .map(|(score, label)| Chunk::new(score, label))
        .collect_vec();

    Ok(ScoredEvent {
        id: id.to_string(),
        barcode: barcode_from_id(id).to_string(),
        chunks,
        label_vector: None,
    })
}

// Contexts are `(score, ...)` tuples or bare scores
fn context_score(item: &Literal) -> Result<f64> {
    let score = match item {
        Literal::Seq(fields) => fields.first().and_then(Literal::as_f64),
        other => other.as_f64(),
    }
    .ok_or_else(|| format!("Context {:?} has no leading score", item))?;
    if !(0.0..=1.0).contains(&score) {
        return Err(format!("Context score {} outside [0, 1]", score));
    }
    Ok(score)
}

// Labels are `(score, label)` tuples or bare labels
fn chunk_label(item: &Literal) -> Result<String> {
    match item {
        Literal::Seq(fields) if fields.len() >= 2 => fields[1].as_label(),
        Literal::Seq(fields) if fields.len() == 1 => fields[0].as_label(),
        other => other.as_label(),
    }
    .ok_or_else(|| format!("Cannot read a label from {:?}", item))
}

/// JSON event files of a directory, sorted by name so that a seeded shuffle is reproducible.
pub fn list_event_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| e.to_string())?.path();
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if path.is_file() && is_json {
            paths.push(path);
        }
    }
    paths.sort();
    if paths.is_empty() {
        return Err(format!("No JSON events found in {}", dir.display()));
    }
    Ok(paths)
}

pub fn load_events(paths: &[PathBuf]) -> Result<Vec<Event>> {
    paths.iter().map(|p| Event::from_json(p)).collect()
}
