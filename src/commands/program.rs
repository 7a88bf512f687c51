//! Program command implementation

use indicatif::{ProgressBar, ProgressStyle};
use riotee_core::image::HexImage;
use riotee_core::program::ProgressFraction;
use riotee_core::target::Target;
use std::path::Path;

/// Resolution of the progress bar
const BAR_STEPS: u64 = 1000;

/// Options for a programming run
#[derive(Debug, Clone, Copy)]
pub struct ProgramArgs {
    pub verify: bool,
    pub resume_on_fault: bool,
}

fn create_progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(BAR_STEPS);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Load a hex file
pub fn load_image(path: &Path) -> Result<HexImage, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let image = HexImage::from_hex_str(&text)
        .map_err(|e| format!("Invalid firmware {}: {}", path.display(), e))?;
    log::info!(
        "Loaded {} bytes in {} segment(s) from {}",
        image.len(),
        image.segment_count(),
        path.display()
    );
    Ok(image)
}

/// Program `image` into an attached target
pub fn run_program(
    target: &mut dyn Target,
    image: &HexImage,
    args: ProgramArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Programming {} bytes...", image.len());
    let pb = create_progress_bar().unwrap_or_else(|_| ProgressBar::new(BAR_STEPS));
    let mut on_progress = |p: ProgressFraction| {
        pb.set_position((p.as_f64() * BAR_STEPS as f64) as u64);
        pb.set_message(p.to_string());
    };

    match target.program(image, args.verify, &mut on_progress) {
        Ok(stats) => {
            pb.finish_with_message("done");
            println!(
                "Wrote {} bytes in {} packets ({} verified)",
                stats.bytes_written, stats.packets_written, stats.packets_verified
            );
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            if args.resume_on_fault {
                log::info!("Resuming target after failure");
                if let Err(re) = target.resume() {
                    log::warn!("Failed to resume target: {}", re);
                }
            } else {
                log::warn!("Target left halted");
            }
            Err(Box::new(e))
        }
    }
}
