use rust_xlsxwriter::{Color, Format, FormatAlign};

use crate::contract::RiskTier;

const HEADER_FILL: u32 = 0xE0E0E0;
const CRITICAL_FILL: u32 = 0xFFCCCC;
const HIGH_FILL: u32 = 0xFFF2CC;
const MEDIUM_FILL: u32 = 0xE6F2FF;
const TITLE_FONT_SIZE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Default,
    Title,
    Header,
    Bold,
    Centered,
    /// Tier fill, optionally with wrapped top-aligned text.
    Tier { tier: RiskTier, wrap: bool },
}

impl Style {
    pub fn for_tier(tier: RiskTier, wrap: bool) -> Self {
        Self::Tier { tier, wrap }
    }

    pub fn format(self) -> Format {
        match self {
            Self::Default => Format::new(),
            Self::Title => Format::new().set_bold().set_font_size(TITLE_FONT_SIZE),
            Self::Header => Format::new()
                .set_bold()
                .set_background_color(Color::RGB(HEADER_FILL)),
            Self::Bold => Format::new().set_bold(),
            Self::Centered => Format::new().set_align(FormatAlign::Center),
            Self::Tier { tier, wrap } => {
                let mut format = match tier_fill(tier) {
                    Some(fill) => Format::new().set_background_color(Color::RGB(fill)),
                    None => Format::new(),
                };
                if wrap {
                    format = format.set_text_wrap().set_align(FormatAlign::Top);
                }
                format
            }
        }
    }
}

/// Low rows stay unfilled.
pub fn tier_fill(tier: RiskTier) -> Option<u32> {
    match tier {
        RiskTier::Critical => Some(CRITICAL_FILL),
        RiskTier::High => Some(HIGH_FILL),
        RiskTier::Medium => Some(MEDIUM_FILL),
        RiskTier::Low => None,
    }
}
