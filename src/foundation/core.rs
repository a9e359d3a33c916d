use std::fmt;

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Caption shown for photos posted without one.
pub const FALLBACK_CAPTION: &str = "No caption";

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PhotoKey(pub String);

impl PhotoKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PhotoKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A posted photo. Immutable once created; the wall only ever replaces or drops it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub key: PhotoKey,
    /// Opaque reference resolved by an [`crate::ImageSource`].
    pub image_ref: String,
    #[serde(default)]
    pub caption: String,
}

impl Photo {
    pub fn new(
        key: impl Into<PhotoKey>,
        image_ref: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            image_ref: image_ref.into(),
            caption: caption.into(),
        }
    }

    /// Caption as displayed, substituting [`FALLBACK_CAPTION`] for blank captions.
    pub fn display_caption(&self) -> &str {
        if self.caption.trim().is_empty() {
            FALLBACK_CAPTION
        } else {
            &self.caption
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self, rows: u32, cols: u32) -> bool {
        self.row < rows && self.col < cols
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl std::str::FromStr for Viewport {
    type Err = String;

    /// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("viewport '{s}' must look like WIDTHxHEIGHT"))?;
        let width: f64 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid viewport width '{w}'"))?;
        let height: f64 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid viewport height '{h}'"))?;
        if !(width.is_finite() && height.is_finite()) || width < 0.0 || height < 0.0 {
            return Err(format!("viewport '{s}' must be non-negative"));
        }
        Ok(Self { width, height })
    }
}

/// Straight (non-premultiplied) RGBA8 color. Serialized as `#RRGGBB` / `#RRGGBBAA`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            (((u16::from(c) * u16::from(a)) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl std::str::FromStr for Rgba8 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);

        fn hex_byte(s: &str, at: usize) -> Result<u8, String> {
            let pair = s
                .get(at..at + 2)
                .ok_or_else(|| format!("invalid hex color \"{s}\""))?;
            u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
        }

        match s.len() {
            6 => Ok(Self::rgb(hex_byte(s, 0)?, hex_byte(s, 2)?, hex_byte(s, 4)?)),
            8 => Ok(Self::rgba(
                hex_byte(s, 0)?,
                hex_byte(s, 2)?,
                hex_byte(s, 4)?,
                hex_byte(s, 6)?,
            )),
            _ => Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned()),
        }
    }
}

impl serde::Serialize for Rgba8 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Arr(Vec<u8>),
        }

        match <Repr as serde::Deserialize>::deserialize(deserializer)? {
            Repr::Hex(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_parses_hex_and_arrays() {
        let c: Rgba8 = serde_json::from_str(r##""#667eea""##).unwrap();
        assert_eq!(c, Rgba8::rgb(0x66, 0x7e, 0xea));
        let c: Rgba8 = serde_json::from_str(r##""#00000066""##).unwrap();
        assert_eq!(c, Rgba8::rgba(0, 0, 0, 0x66));
        let c: Rgba8 = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(c, Rgba8::rgb(1, 2, 3));
        assert!(serde_json::from_str::<Rgba8>(r##""#12345""##).is_err());
        assert!(serde_json::from_str::<Rgba8>(r##""#zz0000""##).is_err());

        assert_eq!(
            serde_json::to_string(&Rgba8::rgb(0x2c, 0x3e, 0x50)).unwrap(),
            r##""#2c3e50""##
        );
    }

    #[test]
    fn rgba8_premultiplies() {
        assert_eq!(Rgba8::rgba(255, 128, 0, 255).to_premul(), [255, 128, 0, 255]);
        assert_eq!(Rgba8::rgba(255, 255, 255, 0).to_premul(), [0, 0, 0, 0]);
        assert_eq!(Rgba8::rgba(200, 100, 50, 128).to_premul(), [100, 50, 25, 128]);
    }

    #[test]
    fn photo_serde_uses_camel_case_and_defaults_caption() {
        let p: Photo = serde_json::from_str(r#"{"key":"a","imageRef":"img/a.png"}"#).unwrap();
        assert_eq!(p.key.as_str(), "a");
        assert_eq!(p.image_ref, "img/a.png");
        assert_eq!(p.caption, "");
        assert_eq!(p.display_caption(), FALLBACK_CAPTION);

        let json = serde_json::to_string(&Photo::new("b", "r", "hi")).unwrap();
        assert!(json.contains("\"imageRef\":\"r\""));
    }

    #[test]
    fn cell_bounds() {
        assert!(Cell::new(0, 0).in_bounds(1, 1));
        assert!(!Cell::new(1, 0).in_bounds(1, 1));
        assert!(!Cell::new(0, 3).in_bounds(4, 3));
    }

    #[test]
    fn viewport_parse() {
        let v: Viewport = "1920x1080".parse().unwrap();
        assert_eq!(v, Viewport::new(1920.0, 1080.0));
        assert!("1920".parse::<Viewport>().is_err());
        assert!("ax1".parse::<Viewport>().is_err());
        assert!("-1x5".parse::<Viewport>().is_err());
    }
}
