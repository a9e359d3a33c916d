use std::{io::Cursor, path::PathBuf};

use polawall::Photo;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_polawall")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "polawall.exe"
            } else {
                "polawall"
            });
            p
        })
}

fn write_photos(path: &std::path::Path, photos: &[Photo]) {
    let f = std::fs::File::create(path).unwrap();
    serde_json::to_writer_pretty(f, photos).unwrap();
}

#[test]
fn cli_replay_prints_layout() {
    let dir = PathBuf::from("target").join("cli_smoke_replay");
    std::fs::create_dir_all(&dir).unwrap();

    let photos_path = dir.join("photos.json");
    write_photos(
        &photos_path,
        &[
            Photo::new("a", "/a.jpg", "first"),
            Photo::new("b", "/b.jpg", "second"),
        ],
    );
    let events_path = dir.join("events.jsonl");
    std::fs::write(
        &events_path,
        concat!(
            r#"{"event":"photo-added","key":"c","imageRef":"/c.jpg","caption":"third"}"#,
            "\n",
            "not json\n",
            r#"{"event":"photo-removed","key":"a"}"#,
            "\n",
        ),
    )
    .unwrap();

    let out = std::process::Command::new(exe())
        .args(["replay", "--viewport", "1000x800", "--seed", "3", "--initial"])
        .arg(&photos_path)
        .arg("--events")
        .arg(&events_path)
        .output()
        .unwrap();
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let keys: Vec<&str> = json["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"b") && keys.contains(&"c"));
    assert_eq!(json["scale"], 1.0);
}

#[test]
fn cli_replay_skips_lines_that_are_not_utf8() {
    let dir = PathBuf::from("target").join("cli_smoke_replay_utf8");
    std::fs::create_dir_all(&dir).unwrap();

    let photos_path = dir.join("photos.json");
    write_photos(&photos_path, &[]);
    let events_path = dir.join("events.jsonl");
    let mut events = Vec::new();
    events.extend_from_slice(br#"{"event":"photo-added","key":"a","imageRef":"/a.jpg"}"#);
    events.extend_from_slice(b"\n\xff\xfe garbage\r\n");
    events.extend_from_slice(br#"{"event":"photo-added","key":"b","imageRef":"/b.jpg"}"#);
    events.push(b'\n');
    std::fs::write(&events_path, events).unwrap();

    let out = std::process::Command::new(exe())
        .args(["replay", "--initial"])
        .arg(&photos_path)
        .arg("--events")
        .arg(&events_path)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["cards"].as_array().unwrap().len(), 2);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("2 added"), "{stderr}");
    assert!(stderr.contains("1 malformed"), "{stderr}");
}

#[test]
fn cli_export_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke_export");
    let images = dir.join("images");
    let out_dir = dir.join("out");
    let _ = std::fs::remove_dir_all(&out_dir);
    std::fs::create_dir_all(&images).unwrap();

    let img = image::RgbaImage::from_pixel(16, 12, image::Rgba([10, 200, 10, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(images.join("g.png"), buf).unwrap();

    let photos_path = dir.join("photos.json");
    write_photos(&photos_path, &[Photo::new("g", "/g.png", "green")]);

    let status = std::process::Command::new(exe())
        .args(["export", "--quality", "standard", "--format", "png", "--photos"])
        .arg(&photos_path)
        .arg("--images")
        .arg(&images)
        .arg("--out-dir")
        .arg(&out_dir)
        .status()
        .unwrap();
    assert!(status.success());

    let written: Vec<_> = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    let name = written[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("polaroid-wall-standard-"), "{name}");
    assert!(name.ends_with(".png"), "{name}");

    let decoded = image::open(&written[0]).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (660, 660));
}
