use anyhow::{Context, Result};
use image::GenericImageView;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Grab a single still from the default webcam and return it as JPEG bytes
/// ready to attach to a solve request. Every backend below opens the device,
/// writes one frame, and exits, so the camera is released on success,
/// failure, and cancellation alike.
pub fn capture_photo() -> Result<Vec<u8>> {
    eprintln!("[Camera] Starting webcam capture...");

    let temp_path = std::env::temp_dir().join(format!(
        "study-genie-capture-{}.jpg",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    ));

    eprintln!("[Camera] Output path: {}", temp_path.display());

    // Try fswebcam first (Linux)
    let fswebcam_result = Command::new("fswebcam")
        .args(["-r", "1280x720", "--no-banner"])
        .arg(&temp_path)
        .output();

    if let Ok(output) = fswebcam_result {
        if output.status.success() && temp_path.exists() {
            eprintln!("[Camera] Still captured with fswebcam");
            return finish_capture(&temp_path);
        }
        eprintln!("[Camera] fswebcam failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    // Try ffmpeg's video4linux2 input as fallback
    eprintln!("[Camera] Trying ffmpeg fallback...");
    let ffmpeg_result = Command::new("ffmpeg")
        .args(["-f", "video4linux2", "-i", "/dev/video0", "-frames:v", "1", "-y"])
        .arg(&temp_path)
        .output();

    if let Ok(output) = ffmpeg_result {
        if output.status.success() && temp_path.exists() {
            eprintln!("[Camera] Still captured with ffmpeg");
            return finish_capture(&temp_path);
        }
        eprintln!("[Camera] ffmpeg failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    // Try imagesnap as last resort (macOS)
    eprintln!("[Camera] Trying imagesnap fallback...");
    let imagesnap_result = Command::new("imagesnap")
        .arg("-w")
        .arg("1")
        .arg(&temp_path)
        .output();

    if let Ok(output) = imagesnap_result {
        if output.status.success() && temp_path.exists() {
            eprintln!("[Camera] Still captured with imagesnap");
            return finish_capture(&temp_path);
        }
        eprintln!("[Camera] imagesnap failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    Err(anyhow::anyhow!(
        "Could not access a camera. Please install one of: fswebcam (Linux), ffmpeg, or imagesnap (macOS)"
    ))
}

fn finish_capture(temp_path: &PathBuf) -> Result<Vec<u8>> {
    let bytes = encode_jpeg(temp_path);
    let _ = std::fs::remove_file(temp_path);
    bytes
}

/// Read a user-selected image file into the same JPEG payload shape the
/// camera produces.
pub fn load_photo(path: &Path) -> Result<Vec<u8>> {
    eprintln!("[Camera] Loading image from {}", path.display());
    encode_jpeg(path)
}

pub fn encode_jpeg(path: &Path) -> Result<Vec<u8>> {
    let mut img = image::open(path)
        .context("Failed to open image")?;

    // Maximum dimensions
    const MAX_WIDTH: u32 = 1120;
    const MAX_HEIGHT: u32 = 1120;

    let (width, height) = img.dimensions();
    eprintln!("[Camera] Original dimensions: {}x{}", width, height);

    // Check if resizing is needed
    if width > MAX_WIDTH || height > MAX_HEIGHT {
        // Calculate scaling factor to maintain aspect ratio
        let width_ratio = MAX_WIDTH as f32 / width as f32;
        let height_ratio = MAX_HEIGHT as f32 / height as f32;
        let scale = width_ratio.min(height_ratio);

        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        eprintln!("[Camera] Resizing to: {}x{} (scale: {:.2})", new_width, new_height, scale);

        img = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);
    }

    let mut buffer = Vec::new();
    img.to_rgb8()
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
        .context("Failed to encode image")?;

    eprintln!("[Camera] Encoded image size: {} bytes", buffer.len());

    Ok(buffer)
}
