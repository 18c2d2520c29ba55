use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(RequestId);

/// Opaque 8-bit RGB colour, independent of any rendering toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Swatch colour for classes outside the known palette.
pub const SWATCH_FALLBACK: Rgb = Rgb::WHITE;
/// Chart bar fill for classes outside the known palette.
pub const CHART_FALLBACK_FILL: Rgb = Rgb(0xCC, 0xCC, 0xCC);
/// Alpha applied to a known class colour when used as a bar outline.
pub const CHART_STROKE_ALPHA: u8 = 0xCC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyClass {
    OxygenTank,
    NitrogenTank,
    FirstAidBox,
    FireAlarm,
    SafetySwitchPanel,
    EmergencyPhone,
    FireExtinguisher,
}

impl SafetyClass {
    pub const ALL: [SafetyClass; 7] = [
        SafetyClass::OxygenTank,
        SafetyClass::NitrogenTank,
        SafetyClass::FirstAidBox,
        SafetyClass::FireAlarm,
        SafetyClass::SafetySwitchPanel,
        SafetyClass::EmergencyPhone,
        SafetyClass::FireExtinguisher,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.label() == label)
    }

    pub fn label(self) -> &'static str {
        match self {
            SafetyClass::OxygenTank => "OxygenTank",
            SafetyClass::NitrogenTank => "NitrogenTank",
            SafetyClass::FirstAidBox => "FirstAidBox",
            SafetyClass::FireAlarm => "FireAlarm",
            SafetyClass::SafetySwitchPanel => "SafetySwitchPanel",
            SafetyClass::EmergencyPhone => "EmergencyPhone",
            SafetyClass::FireExtinguisher => "FireExtinguisher",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            SafetyClass::OxygenTank => Rgb(0xFF, 0x00, 0x00),
            SafetyClass::NitrogenTank => Rgb(0x00, 0xFF, 0x00),
            SafetyClass::FirstAidBox => Rgb(0x00, 0x00, 0xFF),
            SafetyClass::FireAlarm => Rgb(0xFF, 0xFF, 0x00),
            SafetyClass::SafetySwitchPanel => Rgb(0xFF, 0x00, 0xFF),
            SafetyClass::EmergencyPhone => Rgb(0x00, 0xFF, 0xFF),
            SafetyClass::FireExtinguisher => Rgb(0x80, 0x00, 0x80),
        }
    }
}

pub fn swatch_color(label: &str) -> Rgb {
    SafetyClass::from_label(label)
        .map(SafetyClass::color)
        .unwrap_or(SWATCH_FALLBACK)
}

pub fn chart_fill(label: &str) -> Rgb {
    SafetyClass::from_label(label)
        .map(SafetyClass::color)
        .unwrap_or(CHART_FALLBACK_FILL)
}

/// Bar outline as colour plus alpha. Unknown classes get an opaque white outline.
pub fn chart_stroke(label: &str) -> (Rgb, u8) {
    match SafetyClass::from_label(label) {
        Some(class) => (class.color(), CHART_STROKE_ALPHA),
        None => (Rgb::WHITE, 0xFF),
    }
}
