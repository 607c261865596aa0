use anyhow::{bail, Context, Result};
use dadoscan_lib::services::{ConfigStore, DetectionOrchestrator};
use dadoscan_lib::AppConfig;
use std::io::Read;

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read stdin failed")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("read file failed: {}", path))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!(
            "Usage:\n  cargo run --bin scan_text -- <path.txt | -> [--out <json_path>] [--no-adapters]\n\nNotes:\n  - `-` reads the request text from stdin.\n  - `--no-adapters` runs the pattern detectors only.\n  - Set DADOSCAN_DISABLE_FILE_LOG=1 to log to stderr only."
        );
        return Ok(());
    }

    dadoscan_lib::init_logging();

    let path = args[1].clone();
    if path.starts_with("--") {
        bail!("expected an input path before options, got {}", path);
    }
    let out_path = parse_arg_value(&args, "--out");
    let no_adapters = has_flag(&args, "--no-adapters");

    let config = match ConfigStore::open_default() {
        Some(store) => store.load().context("load config failed")?,
        None => AppConfig::default(),
    };

    let mut orchestrator =
        DetectionOrchestrator::from_app_config(&config).context("build detectors failed")?;
    if no_adapters {
        orchestrator = orchestrator.without_adapters();
    }

    let text = read_input(&path)?;
    let summary = orchestrator.summarize(&text);

    println!("Input: {}", path);
    println!("Length: {} chars", text.chars().count());
    println!("Adapters: {}", if no_adapters { "off" } else { "on" });
    println!("Records: {}", summary.count);
    if summary.any_found {
        println!("Mean confidence: {:.3}", summary.mean_confidence);
    }

    for (i, record) in summary.records.iter().enumerate() {
        println!(
            "  [{}] {} {}..{} conf={:.3} validated={} method={} value=\"{}\"",
            i + 1,
            record.category,
            record.start_offset,
            record.end_offset,
            record.confidence,
            record.validated,
            record.detection_method,
            preview(&record.raw_value, 60)
        );
    }

    for (family, values) in &summary.records_by_category {
        println!("{}: {}", family, values.join(", "));
    }

    if let Some(out) = out_path {
        let json = serde_json::to_string_pretty(&summary).context("serialize summary failed")?;
        std::fs::write(&out, json).with_context(|| format!("write {} failed", out))?;
        println!("Wrote {}", out);
    }

    Ok(())
}
