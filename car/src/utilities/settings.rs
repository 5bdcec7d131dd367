use std::time::Duration;

use shared_resources::floor::Floor;

#[derive(Debug, Clone)]
pub struct CarSettings {
    pub name: String,
    pub lowest_floor: Floor,
    pub highest_floor: Floor,
    pub delay: Duration,
}

impl CarSettings {
    /// Parse `{name} {lowest floor} {highest floor} {delay}` command
    /// line arguments. The delay is in milliseconds and must be
    /// positive; the name ends up in a shared-memory object path, so it
    /// is restricted to alphanumerics.
    pub fn parse(args: &[String]) -> Option<Self> {
        match args {
            [name, lowest, highest, delay] => {
                if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return None;
                }
                let lowest_floor = Floor::parse(lowest)?;
                let highest_floor = Floor::parse(highest)?;
                if highest_floor < lowest_floor {
                    return None;
                }
                let delay_ms: u64 = delay.parse().ok().filter(|&ms| ms > 0)?;
                Some(CarSettings {
                    name: name.clone(),
                    lowest_floor,
                    highest_floor,
                    delay: Duration::from_millis(delay_ms),
                })
            }
            _ => None,
        }
    }
}
