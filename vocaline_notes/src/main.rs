// pitchdump: load a note sequence, validate it, print its rendered pitch.
//
// Reads a JSON note sequence (`{"notes": [...]}`), reconciles expressions
// with the project's descriptor registry, validates every note, and prints
// each note with its resampler flags and sampled pitch. Notes in error are
// listed but not rendered.
//
// Usage:
//   cargo run -p vocaline_notes -- <notes.json> [--config config.json]
//     [--step TICKS] [--json]
//
// `--json` prints the rendered samples as JSON instead of text.

use std::path::Path;
use tracing::{error, info, warn};
use vocaline_notes::config::ProjectConfig;
use vocaline_notes::phoneme::SpanCheck;
use vocaline_notes::render::render_sequence;
use vocaline_notes::sequence::NoteSequence;

fn main() {
    tracing_subscriber::fmt::init();
    let args: Vec<String> = std::env::args().collect();

    let Some(input) = args.get(1).filter(|s| !s.starts_with("--")) else {
        eprintln!("usage: pitchdump <notes.json> [--config config.json] [--step TICKS] [--json]");
        std::process::exit(2);
    };

    let config = match parse_flag::<String>(&args, "--config") {
        Some(path) => match ProjectConfig::load(Path::new(&path)) {
            Ok(c) => {
                info!(path = %path, "loaded project config");
                c
            }
            Err(e) => {
                warn!(path = %path, "failed to load config: {e}; using defaults");
                ProjectConfig::default()
            }
        },
        None => ProjectConfig::default(),
    };
    let step: u32 = parse_flag(&args, "--step").unwrap_or(config.render_step_ticks);
    let as_json = args.iter().any(|a| a == "--json");

    let mut seq = match std::fs::read_to_string(input)
        .map_err(|e| e.to_string())
        .and_then(|data| NoteSequence::from_json(&data).map_err(|e| e.to_string()))
    {
        Ok(seq) => seq,
        Err(e) => {
            error!(path = %input, "failed to read note sequence: {e}");
            std::process::exit(1);
        }
    };

    seq.after_load(&config.expressions);
    seq.validate_all(&SpanCheck);
    info!(
        notes = seq.len(),
        errors = seq.error_count(),
        "validated sequence"
    );

    let tempo = config.tempo();
    let rendered = render_sequence(&seq, &tempo, step);

    if as_json {
        match serde_json::to_string_pretty(&rendered) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("failed to encode samples: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    for note in seq.iter() {
        println!("{note}  flags: {}", note.resampler_flags(&config.expressions));
        let Some((_, samples)) = rendered.iter().find(|(id, _)| *id == note.id) else {
            continue;
        };
        for sample in samples {
            println!("  {:>8.1}  {:>8.3}", sample.tick, sample.tone);
        }
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
