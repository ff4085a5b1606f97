//! Record types and the listing families that publish them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a record type or family name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// The four document categories published by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// 법령해석
    LawInterpretation,
    /// 비조치의견서
    NoActionOpinion,
    /// 현장건의 과제
    FieldProposal,
    /// 과거회신사례 (pre-2014 replies)
    LegacyPastCase,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::LawInterpretation,
        RecordType::NoActionOpinion,
        RecordType::FieldProposal,
        RecordType::LegacyPastCase,
    ];

    /// The label the registry uses for this type in listing rows.
    pub fn label(&self) -> &'static str {
        match self {
            RecordType::LawInterpretation => "법령해석",
            RecordType::NoActionOpinion => "비조치의견서",
            RecordType::FieldProposal => "현장건의 과제",
            RecordType::LegacyPastCase => "과거회신사례",
        }
    }

    /// Resolves a listing label. Internal whitespace is ignored, so both
    /// `현장건의 과제` and `현장건의과제` map to [`RecordType::FieldProposal`].
    pub fn from_label(label: &str) -> Option<RecordType> {
        let compact: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        RecordType::ALL.into_iter().find(|rt| {
            let want: String = rt.label().chars().filter(|c| !c.is_whitespace()).collect();
            want == compact
        })
    }

    /// The family whose listing endpoint publishes this type.
    pub fn family(&self) -> SourceFamily {
        match self {
            RecordType::LawInterpretation | RecordType::NoActionOpinion => SourceFamily::Late,
            RecordType::FieldProposal => SourceFamily::Integ,
            RecordType::LegacyPastCase => SourceFamily::Past,
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            RecordType::LawInterpretation => "law_interpretation",
            RecordType::NoActionOpinion => "no_action_opinion",
            RecordType::FieldProposal => "field_proposal",
            RecordType::LegacyPastCase => "legacy_past_case",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RecordType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|rt| rt.slug() == s.trim())
            .or_else(|| RecordType::from_label(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// The three listing endpoints whose results are harmonized together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFamily {
    /// Pre-2014 reply cases.
    Past,
    /// Recent law interpretations and no-action opinions.
    Late,
    /// Integrated listing, harvested for field proposals.
    Integ,
}

impl SourceFamily {
    pub const ALL: [SourceFamily; 3] = [SourceFamily::Past, SourceFamily::Late, SourceFamily::Integ];

    /// Record types a row of this family may carry.
    pub fn record_types(&self) -> &'static [RecordType] {
        match self {
            SourceFamily::Past => &[RecordType::LegacyPastCase],
            SourceFamily::Late => &[RecordType::LawInterpretation, RecordType::NoActionOpinion],
            SourceFamily::Integ => &[RecordType::FieldProposal],
        }
    }
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceFamily::Past => "past",
            SourceFamily::Late => "late",
            SourceFamily::Integ => "integ",
        })
    }
}

impl FromStr for SourceFamily {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "past" => Ok(SourceFamily::Past),
            "late" => Ok(SourceFamily::Late),
            "integ" | "integration" => Ok(SourceFamily::Integ),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_with_or_without_spaces() {
        assert_eq!(RecordType::from_label("법령해석"), Some(RecordType::LawInterpretation));
        assert_eq!(RecordType::from_label(" 비조치의견서 "), Some(RecordType::NoActionOpinion));
        assert_eq!(RecordType::from_label("현장건의 과제"), Some(RecordType::FieldProposal));
        assert_eq!(RecordType::from_label("현장건의과제"), Some(RecordType::FieldProposal));
        assert_eq!(RecordType::from_label("비조치의견서(2014이전)"), None);
    }

    #[test]
    fn from_str_accepts_slug_and_label() {
        assert_eq!("field_proposal".parse::<RecordType>().unwrap(), RecordType::FieldProposal);
        assert_eq!("과거회신사례".parse::<RecordType>().unwrap(), RecordType::LegacyPastCase);
        assert!("memo".parse::<RecordType>().is_err());
    }

    #[test]
    fn family_round_trip() {
        for family in SourceFamily::ALL {
            assert_eq!(family.to_string().parse::<SourceFamily>().unwrap(), family);
            for rt in family.record_types() {
                assert_eq!(rt.family(), family);
            }
        }
    }
}
