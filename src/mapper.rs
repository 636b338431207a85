use std::collections::HashSet;

use tracing::debug;

use crate::codec::{
    self, ID_LEN, SummaryRecord, display_names, encode_hot_water, encode_preset,
    encode_temperature, summary_payloads, unescape_value,
};
use crate::protocol::{HOT_WATER_ATTRIBUTE, Operation, PRESET_ATTRIBUTE, TEMPERATURE_ATTRIBUTE};
use crate::types::*;
use crate::xml::Document;
use crate::{Error, Result};

/// Attribute names holding `id+name` lists.
const DISPLAY_NAME_ATTRIBUTES: [&str; 2] = ["S02", "S03"];
/// Attribute names holding packed summaries, ten thermostats each.
const SUMMARY_ATTRIBUTES: [&str; 3] = ["001", "002", "003"];

const HOT_WATER_ID_ATTRIBUTE: &str = "2272";
const HOT_WATER_SUMMARY_ATTRIBUTE: &str = "2257";

const SUCCESS_CODE: &str = "0";
const DEFAULT_DURATION: u8 = 1;

/// Mode and on/off state for a raw mode index.
pub(crate) fn resolve_mode(revision: ProtocolRevision, index: usize) -> Result<(Mode, bool)> {
    let table = revision.modes();
    let mode = table.get(index).copied().ok_or_else(|| {
        Error::Decode(format!(
            "mode index {index} outside 0..{} for {revision:?}",
            table.len()
        ))
    })?;
    Ok((mode, index > revision.last_off_index()))
}

pub(crate) fn gateway_from_attributes(
    body: &str,
    gateway_id: &str,
    gateway_name: &str,
    revision: ProtocolRevision,
) -> Result<Gateway> {
    let doc = Document::parse(body)?;

    let mut names = Vec::new();
    let mut streams = Vec::new();
    for attr in doc.attributes() {
        if DISPLAY_NAME_ATTRIBUTES.contains(&attr.name.as_str()) {
            names.push(unescape_value(&attr.value));
        } else if SUMMARY_ATTRIBUTES.contains(&attr.name.as_str()) {
            streams.push(unescape_value(&attr.value));
        }
    }
    let payloads = summary_payloads(streams.iter().map(String::as_str));

    let mut thermostats = Vec::new();
    let mut seen = HashSet::new();
    for (id, name) in names.iter().flat_map(|value| display_names(value)) {
        if !seen.insert(id.clone()) {
            continue;
        }
        let payload = payloads
            .get(&id)
            .ok_or_else(|| Error::Decode(format!("no summary record for thermostat {id}")))?;
        let record = SummaryRecord::decode(payload)?;
        let (mode, on) = resolve_mode(revision, record.mode_index)?;
        thermostats.push(Thermostat {
            id,
            name,
            on,
            mode,
            current_temperature: record.current,
            target_temperature: record.setpoint,
        });
    }
    debug!(count = thermostats.len(), "decoded thermostats");

    Ok(Gateway {
        id: gateway_id.to_string(),
        name: gateway_name.to_string(),
        thermostats,
    })
}

pub(crate) fn hot_water_from_attributes(body: &str) -> Result<HotWater> {
    let doc = Document::parse(body)?;
    let find = |id: &str| {
        doc.attributes()
            .iter()
            .find(|attr| attr.id == id)
            .map(|attr| unescape_value(&attr.value))
            .ok_or_else(|| Error::Decode(format!("attribute {id} missing from listing")))
    };

    let relay_id = codec::relay_id(&find(HOT_WATER_ID_ATTRIBUTE)?);
    if relay_id.is_empty() {
        return Err(Error::Decode("hot water relay id is empty".to_string()));
    }
    let stream = find(HOT_WATER_SUMMARY_ATTRIBUTE)?;
    let on = codec::hot_water_on(&relay_id, &stream);
    Ok(HotWater { id: relay_id, on })
}

fn check_thermostat_id(id: &str) -> Result<()> {
    if id.chars().count() != ID_LEN {
        return Err(Error::InvalidArgument(format!(
            "thermostat id {id:?} must be {ID_LEN} characters"
        )));
    }
    Ok(())
}

/// Resolve `preset_name` in the revision's vocabulary and build the write.
/// The duration is only sent for timed presets.
pub(crate) fn preset_write(
    revision: ProtocolRevision,
    thermostat_id: &str,
    preset_name: &str,
    duration: Option<u8>,
) -> Result<Operation> {
    check_thermostat_id(thermostat_id)?;
    let unknown =
        || Error::InvalidArgument(format!("unknown preset {preset_name:?} for {revision:?}"));
    let preset = Preset::from_name(preset_name).ok_or_else(unknown)?;
    let index = revision.preset_index(preset).ok_or_else(unknown)?;
    let duration = preset
        .requires_duration()
        .then(|| duration.unwrap_or(DEFAULT_DURATION));

    Ok(Operation::WriteAttribute {
        name: PRESET_ATTRIBUTE,
        value: encode_preset(thermostat_id, index, duration)?,
    })
}

pub(crate) fn temperature_write(thermostat_id: &str, celsius: f64) -> Result<Operation> {
    check_thermostat_id(thermostat_id)?;
    Ok(Operation::WriteAttribute {
        name: TEMPERATURE_ATTRIBUTE,
        value: encode_temperature(thermostat_id, Temperature::from_celsius(celsius))?,
    })
}

pub(crate) fn hot_water_write(relay_id: &str, on: bool) -> Operation {
    Operation::WriteAttribute {
        name: HOT_WATER_ATTRIBUTE,
        value: encode_hot_water(relay_id, on),
    }
}

/// A write is accepted only when `retCode` is `0`.
pub(crate) fn validate_write_response(body: &str) -> Result<()> {
    let doc = Document::parse(body).map_err(|e| Error::OperationFailed {
        code: String::new(),
        response: format!("{e}: {body}"),
    })?;
    match doc.text("retCode").map(str::trim) {
        Some(SUCCESS_CODE) => Ok(()),
        Some(code) => Err(Error::OperationFailed {
            code: code.to_string(),
            response: body.to_string(),
        }),
        None => Err(Error::Decode(format!("write response has no retCode: {body}"))),
    }
}
