use bloodlines::config::DEFAULT_DATA_LOCATION;
use bloodlines::data::default_manifest_path;
use bloodlines::data::ingest::try_ingest;
use bloodlines::SeededEntropy;
use serde_json::json;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DATA_LOCATION.to_string());
    let sample_size = env::var("SAMPLE_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(bloodlines::data::ingest::DEFAULT_SAMPLE_SIZE);
    let seed = env::var("RNG_SEED").ok().and_then(|v| v.parse().ok());

    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("failed to read {}: {}", path, err);
            std::process::exit(1);
        }
    };

    let mut entropy = SeededEntropy::new(seed);
    let (sample, report) = match try_ingest(&text, sample_size, &mut entropy) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("ingest failed: {}", err);
            std::process::exit(2);
        }
    };

    if !report.missing_columns.is_empty() {
        eprintln!("missing columns: {:?}", report.missing_columns);
    }

    let out_path = default_manifest_path(PathBuf::from(&path).as_path());
    let payload = json!({
        "path": path,
        "report": report,
        "sample": sample,
    });
    let body = match serde_json::to_string_pretty(&payload) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("failed to encode manifest: {}", err);
            std::process::exit(3);
        }
    };
    if let Err(err) = fs::write(&out_path, body) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        std::process::exit(4);
    }
    println!(
        "wrote manifest {} ({} of {} rows accepted)",
        out_path.display(),
        report.accepted,
        report.rows_read
    );
}
