use regex::Regex;

use crate::{calendar::CalendarEntry, error::ExtractError};

/// A class name and the rooms it's held in, e.g. `12 [30 Cap]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub name: String,
    pub rooms: Vec<String>,
}

pub struct ClassRoomExtractor {
    // Room number followed by its bracketed capacity.
    room_regex: Regex,
}

impl ClassRoomExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let room_regex = Regex::new(r"\d+\s\[[\d\sCap]+\]")?;
        Ok(Self { room_regex })
    }

    /// Class name is everything before the first `_`, rooms are every match in the description.
    pub fn extract_record(&self, description: &str) -> ClassRecord {
        let name = description.split('_').next().unwrap_or_default().to_string();
        let rooms = self
            .room_regex
            .find_iter(description)
            .map(|m| m.as_str().to_string())
            .collect();
        ClassRecord { name, rooms }
    }

    /// Fails on the first entry without a description instead of skipping it.
    pub fn extract_class_and_rooms(
        &self,
        entries: &[CalendarEntry],
    ) -> Result<Vec<ClassRecord>, ExtractError> {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .description()
                    .map(|description| self.extract_record(description))
                    .ok_or(ExtractError::MissingField {
                        index,
                        field: "description",
                    })
            })
            .collect()
    }
}
