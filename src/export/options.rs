use chrono::{DateTime, Utc};

/// Export resolution tier. Every style length is multiplied by the tier scale.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Standard,
    High,
    Ultra,
}

impl QualityTier {
    pub fn scale(self) -> u32 {
        match self {
            Self::Standard => 2,
            Self::High => 3,
            Self::Ultra => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }
}

impl std::str::FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(format!(
                "unknown quality tier '{other}' (expected standard, high or ultra)"
            )),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unknown export format '{other}' (expected png or jpeg)")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExportOptions {
    pub tier: QualityTier,
    pub format: ExportFormat,
}

impl ExportOptions {
    pub fn new(tier: QualityTier, format: ExportFormat) -> Self {
        Self { tier, format }
    }
}

/// `polaroid-wall-{tier}-{YYYY-MM-DDTHH-MM-SS}.{ext}`, timestamp in UTC.
pub fn export_file_name(opts: ExportOptions, now: DateTime<Utc>) -> String {
    format!(
        "polaroid-wall-{}-{}.{}",
        opts.tier.label(),
        now.format("%Y-%m-%dT%H-%M-%S"),
        opts.format.extension()
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn tier_scales() {
        assert_eq!(QualityTier::Standard.scale(), 2);
        assert_eq!(QualityTier::High.scale(), 3);
        assert_eq!(QualityTier::Ultra.scale(), 4);
        assert_eq!("ULTRA".parse::<QualityTier>().unwrap(), QualityTier::Ultra);
        assert!("max".parse::<QualityTier>().is_err());
        assert_eq!("jpg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
    }

    #[test]
    fn file_name_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 42).unwrap();
        assert_eq!(
            export_file_name(ExportOptions::new(QualityTier::High, ExportFormat::Jpeg), now),
            "polaroid-wall-high-2025-03-07T09-05-42.jpeg"
        );
        assert_eq!(
            export_file_name(ExportOptions::default(), now),
            "polaroid-wall-standard-2025-03-07T09-05-42.png"
        );
    }
}
