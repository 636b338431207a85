//! Packed summary records and command payloads.
//!
//! The gateway encodes every small number as a single character whose code
//! point is the value plus 32. Thermostat summaries are 8-character records:
//! a 4-character device id followed by a 4-character payload whose
//! characters 1, 2 and 3 hold the mode index, current temperature and set
//! point. Writes reuse the same scheme, except preset writes, which are
//! offset by 35.

use std::collections::HashMap;

use crate::types::Temperature;
use crate::{Error, Result};

pub(crate) const RECORD_LEN: usize = 8;
pub(crate) const ID_LEN: usize = 4;

const BYTE_BASE: u32 = 32;
const PRESET_WRITE_BASE: u32 = 35;
const COMMAND_PREFIX: char = '!';

const MAX_DURATION: u8 = 99;

const HOT_WATER_ON: char = '3';
const HOT_WATER_WRITE_ON: &str = "# ";
const HOT_WATER_WRITE_OFF: &str = "$ ";

/// Attribute values arrive entity-encoded a second time.
pub(crate) fn unescape_value(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Split a summary stream into complete records. A trailing partial record
/// is dropped.
pub(crate) fn records(stream: &str) -> Vec<String> {
    let chars: Vec<char> = stream.chars().collect();
    chars
        .chunks_exact(RECORD_LEN)
        .map(|c| c.iter().collect())
        .collect()
}

/// Map device id to its 4-character payload across all summary streams.
/// Later streams win on duplicate ids.
pub(crate) fn summary_payloads<'a>(
    streams: impl IntoIterator<Item = &'a str>,
) -> HashMap<String, String> {
    let mut payloads = HashMap::new();
    for stream in streams {
        for record in records(stream) {
            let split = split_at_char(&record, ID_LEN);
            payloads.insert(split.0.to_string(), split.1.to_string());
        }
    }
    payloads
}

/// Parse a `id+name,id+name,...` list. Tokens of 4 characters or fewer carry
/// no name and are skipped.
pub(crate) fn display_names(value: &str) -> Vec<(String, String)> {
    value
        .split(',')
        .filter(|token| token.chars().count() > ID_LEN)
        .map(|token| {
            let (id, name) = split_at_char(token, ID_LEN);
            (id.to_string(), name.to_string())
        })
        .collect()
}

fn split_at_char(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

fn decode_byte(c: char, field: &str) -> Result<u32> {
    (c as u32)
        .checked_sub(BYTE_BASE)
        .ok_or_else(|| Error::Decode(format!("{field} byte {:#04x} below offset base", c as u32)))
}

/// Fields of one thermostat summary payload, before mode-table lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SummaryRecord {
    pub mode_index: usize,
    pub current: Temperature,
    pub setpoint: Temperature,
}

impl SummaryRecord {
    pub fn decode(payload: &str) -> Result<Self> {
        let chars: Vec<char> = payload.chars().collect();
        if chars.len() < 4 {
            return Err(Error::Decode(format!(
                "summary payload {payload:?} shorter than 4 characters"
            )));
        }
        Ok(Self {
            mode_index: decode_byte(chars[1], "mode")? as usize,
            current: decode_temperature(chars[2])?,
            setpoint: decode_temperature(chars[3])?,
        })
    }
}

pub(crate) fn decode_temperature(c: char) -> Result<Temperature> {
    let steps = decode_byte(c, "temperature")?;
    Ok(Temperature::from_celsius(steps as f64 * 0.5))
}

/// Whether the hot-water relay `relay_id` reads as on in `stream`. A relay
/// missing from the stream reads as off.
pub(crate) fn hot_water_on(relay_id: &str, stream: &str) -> bool {
    if relay_id.is_empty() {
        return false;
    }
    let id_len = relay_id.chars().count();
    // The state character sits at a fixed offset from the chunk start.
    records(stream)
        .iter()
        .find(|record| record.contains(relay_id))
        .is_some_and(|record| record.chars().nth(id_len + 1) == Some(HOT_WATER_ON))
}

/// Strip the quotes the gateway wraps around the relay id.
pub(crate) fn relay_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some(_), Some(_)) => chars.as_str().to_string(),
        _ => String::new(),
    }
}

/// `!<id><chr(index + 35)>[duration]`
pub(crate) fn encode_preset(device_id: &str, preset_index: usize, duration: Option<u8>) -> Result<String> {
    let code = char::from_u32(preset_index as u32 + PRESET_WRITE_BASE)
        .ok_or_else(|| Error::InvalidArgument(format!("preset index {preset_index} not encodable")))?;
    let mut payload = format!("{COMMAND_PREFIX}{device_id}{code}");
    if let Some(duration) = duration {
        if duration == 0 || duration > MAX_DURATION {
            return Err(Error::InvalidArgument(format!(
                "duration {duration} outside 1..={MAX_DURATION}"
            )));
        }
        payload.push_str(&format!("{duration:02}"));
    }
    Ok(payload)
}

/// `!<id><chr(round(t * 2) + 32)>`
pub(crate) fn encode_temperature(device_id: &str, temp: Temperature) -> Result<String> {
    let steps = temp.to_half_degrees() * 2.0;
    // Keep the command character printable.
    if !steps.is_finite() || !(0.0..=94.0).contains(&steps) {
        return Err(Error::InvalidArgument(format!(
            "temperature {temp} outside the encodable range 0.0..=47.0"
        )));
    }
    let code = char::from_u32(steps as u32 + BYTE_BASE)
        .ok_or_else(|| Error::InvalidArgument(format!("temperature {temp} not encodable")))?;
    Ok(format!("{COMMAND_PREFIX}{device_id}{code}"))
}

pub(crate) fn encode_hot_water(relay_id: &str, on: bool) -> String {
    let state = if on { HOT_WATER_WRITE_ON } else { HOT_WATER_WRITE_OFF };
    format!("{COMMAND_PREFIX}{relay_id}{state}")
}
