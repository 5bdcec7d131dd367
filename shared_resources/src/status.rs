#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorStatus {
    Opening,
    Open,
    Closing,
    Closed,
    Between,
}

impl DoorStatus {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "Opening" => Some(DoorStatus::Opening),
            "Open" => Some(DoorStatus::Open),
            "Closing" => Some(DoorStatus::Closing),
            "Closed" => Some(DoorStatus::Closed),
            "Between" => Some(DoorStatus::Between),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DoorStatus::Opening => "Opening",
            DoorStatus::Open => "Open",
            DoorStatus::Closing => "Closing",
            DoorStatus::Closed => "Closed",
            DoorStatus::Between => "Between",
        }
    }

    /// Door is in a transitional phase where an obstruction may legally
    /// be reported.
    pub fn doors_in_motion(&self) -> bool {
        matches!(self, DoorStatus::Opening | DoorStatus::Closing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for token in ["Opening", "Open", "Closing", "Closed", "Between"] {
            assert_eq!(DoorStatus::parse(token).unwrap().as_str(), token);
        }
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert_eq!(DoorStatus::parse("open"), None);
        assert_eq!(DoorStatus::parse(""), None);
        assert_eq!(DoorStatus::parse("Stuck"), None);
    }
}
