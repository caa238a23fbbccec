use banditdash::store::{analyze_table, default_manifest_path, kind_from_file_name, required_columns};
use serde_json::json;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let path = match env::args().nth(1) {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("usage: table_manifest <result table csv>");
            std::process::exit(1);
        }
    };

    let kind = match kind_from_file_name(&path) {
        Some(k) => k,
        None => {
            eprintln!("cannot infer table kind from {}", path.display());
            std::process::exit(1);
        }
    };

    let now_ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let manifest = match analyze_table(&path, kind, now_ts) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("required columns: {:?}", required_columns(kind));
            std::process::exit(match err.kind() {
                "missing_table" => 2,
                "malformed_table" => 3,
                _ => 4,
            });
        }
    };

    for w in &manifest.warnings {
        eprintln!("warning: {}", w);
    }

    let out_path = default_manifest_path(&path);
    let payload = json!({ "manifest": manifest });
    let body = match serde_json::to_string_pretty(&payload) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("failed to encode manifest: {}", err);
            std::process::exit(4);
        }
    };
    if let Err(err) = fs::write(&out_path, body) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        std::process::exit(4);
    }
    println!("wrote manifest {}", out_path.display());
}
