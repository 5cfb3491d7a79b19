use std::env;
use std::path;
use std::process::ExitCode;

use log::error;

use mzdata_agilent::meta::CodedEnum;
use mzdata_agilent::{extract_metadata, AgilentMetadata};

fn print_summary(path: &path::Path, metadata: &AgilentMetadata) {
    println!("Path: {}", path.display());
    for (name, entry) in metadata.iter() {
        println!("{name}: version {}", entry.version());
    }

    let contents = metadata.contents();
    if let Some(instrument) = contents.instrument_name.as_deref() {
        println!("Instrument: {instrument}");
    }
    if let Some(acquired) = contents.acquired_time {
        println!("Acquired: {}", acquired.to_rfc3339());
    }
    if let Some(sample_name) = metadata.sample_info().sample_name() {
        println!("Sample: {sample_name}");
    }

    println!("Devices:");
    for device in metadata.devices().iter() {
        println!(
            "  {} {} ({}, code {})",
            device.device_id,
            device.display_name.as_deref().unwrap_or(&device.name),
            device.device_type,
            device.device_type.code()
        );
    }

    let method = metadata.acq_method();
    println!("Scan segments:");
    for segment in method.scan_segments() {
        let device = method
            .device_for(segment)
            .map(|d| d.name.as_str())
            .unwrap_or("?");
        let mass_ranges: Vec<String> = segment
            .measured_mass_ranges
            .iter()
            .map(|r| r.to_string())
            .collect();
        println!(
            "  #{} on {device}: polarity {:?}, m/z {}",
            segment.time_segment_id,
            segment.polarity,
            mass_ranges.join(", ")
        );
    }

    let segments = metadata.ms_time_segments();
    if let Some(span) = segments.acquired_time_range() {
        println!("Time segments: {} covering {span} min, {} scans", segments.len(), segments.total_scans());
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let path = match args.iter().skip(1).find(|a| !a.starts_with("--")) {
        Some(p) => path::PathBuf::from(p),
        None => path::PathBuf::from("./test/data/QC1.d"),
    };

    let metadata = match extract_metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Failed to read metadata from {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    #[cfg(feature = "serde")]
    {
        if args.iter().any(|a| a == "--json") {
            let stdout = std::io::stdout();
            if let Err(e) = serde_json::to_writer_pretty(stdout.lock(), &metadata) {
                error!("Failed to write JSON: {e}");
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }
    }

    print_summary(&path, &metadata);
    ExitCode::SUCCESS
}
