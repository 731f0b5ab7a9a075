use serde_with::{DeserializeFromStr, SerializeDisplay};
use slotbay::SlotIndex;
use strum::{Display as StrumDisplay, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    StrumDisplay,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PointerKind {
    Enter,
    Leave,
    Down,
    Up,
    Click,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Pointer(PointerKind, SlotIndex),
    ConfigReload,
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_kind_deserialization() {
        let cases = [
            ("\"enter\"", PointerKind::Enter),
            ("\"LEAVE\"", PointerKind::Leave),
            ("\"Down\"", PointerKind::Down),
            ("\"up\"", PointerKind::Up),
            ("\"click\"", PointerKind::Click),
        ];
        for (json, expected) in cases {
            let kind: PointerKind = serde_json::from_str(json).unwrap();
            assert_eq!(kind, expected);
        }
        assert!(serde_json::from_str::<PointerKind>("\"hover\"").is_err());
    }

    #[test]
    fn test_pointer_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PointerKind::Click).unwrap(),
            "\"click\""
        );
    }
}
