use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn have_system_ffmpeg() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Builds an `n`-slide hard-cut slideshow, one second per slide, at 1280x720.
fn make_slideshow(dir: &assert_fs::TempDir, n: usize, name: &str) -> PathBuf {
    use image::{ImageBuffer, Rgb};

    let mut frame_paths = Vec::new();
    for i in 0..n {
        let mut img = ImageBuffer::<Rgb<u8>, Vec<u8>>::new(1280, 720);
        let r = (i as u8).wrapping_mul(53).wrapping_add(20);
        let g = (i as u8).wrapping_mul(97).wrapping_add(20);
        let b = (i as u8).wrapping_mul(31).wrapping_add(20);
        for p in img.pixels_mut() {
            *p = Rgb([r, g, b]);
        }
        let path = dir.child(format!("frame_{i:02}.png"));
        img.save(path.path()).unwrap();
        frame_paths.push(path.to_path_buf());
    }

    let mut list = String::new();
    for f in &frame_paths {
        list.push_str(&format!("file '{}'\nduration 1.0\n", f.display()));
    }
    list.push_str(&format!("file '{}'\n", frame_paths.last().unwrap().display()));
    let concat = dir.child("list.txt");
    concat.write_str(&list).unwrap();

    let input = dir.child(name);
    let status = Command::new("ffmpeg")
        .args([
            "-hide_banner", "-loglevel", "error",
            "-f", "concat", "-safe", "0",
            "-i", concat.path().to_str().unwrap(),
            "-pix_fmt", "yuv420p",
        ])
        .arg(input.path())
        .status()
        .unwrap();
    assert!(status.success(), "ffmpeg must build the synthetic slideshow");
    input.to_path_buf()
}

#[test]
fn reports_no_output_for_blank_video() {
    // A single solid-color frame has no OCR text on any candidate shot, so
    // every candidate is rejected at L3 (§9 Open Question 1, always-reject)
    // and the job ends in `NoOutputProduced` (no `--transcribe`, so slide
    // extraction is the only possible deliverable).
    if !have_system_ffmpeg() {
        eprintln!("Skipping: system ffmpeg unavailable");
        return;
    }
    let td = assert_fs::TempDir::new().unwrap();
    let input = make_slideshow(&td, 1, "blank.mp4");

    let mut cmd = Command::cargo_bin("slide-extract").unwrap();
    cmd.arg(input)
        .arg("--output-root").arg(td.child("out").path())
        .arg("--scratch-root").arg(td.child("scratch").path());

    cmd.assert().failure();
}

#[test]
#[ignore] // requires ffmpeg, tesseract and a usable ROI in the synthetic input
fn extracts_slides_from_hard_cut_deck() {
    if !have_system_ffmpeg() {
        eprintln!("Skipping: system ffmpeg unavailable");
        return;
    }
    let td = assert_fs::TempDir::new().unwrap();
    let input = make_slideshow(&td, 3, "deck.mp4");
    let out_dir = td.child("out");

    let mut cmd = Command::cargo_bin("slide-extract").unwrap();
    cmd.arg(input)
        .arg("--output-root").arg(out_dir.path())
        .arg("--scratch-root").arg(td.child("scratch").path())
        .arg("--job-id").arg("e2e-deck")
        .arg("--min-scene-duration").arg("0.3");

    cmd.assert().success().stdout(predicate::str::contains("slides:"));

    let pptx = out_dir.child("e2e-deck").child("ppt_output").child("e2e-deck.pptx");
    pptx.assert(predicates::path::exists());
}

#[test]
fn missing_source_video_is_a_clean_failure() {
    let td = assert_fs::TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("slide-extract").unwrap();
    cmd.arg(td.child("does_not_exist.mp4").path())
        .arg("--output-root").arg(td.child("out").path())
        .arg("--scratch-root").arg(td.child("scratch").path());

    cmd.assert().failure();
}
