use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::session::Session;
use crate::{Error, Result};

pub const APP_ID: &str = "1097";

const DEVICE_TYPE_ID: &str = "1";

pub(crate) const PRIME_ATTRIBUTE: &str = "B01";
const PRIME_VALUE: &str = "5";
pub(crate) const PRESET_ATTRIBUTE: &str = "B05";
pub(crate) const HOT_WATER_ATTRIBUTE: &str = "B05";
pub(crate) const TEMPERATURE_ATTRIBUTE: &str = "B06";

const REDACTED_PARAMS: [&str; 2] = ["secToken", "password"];
const REDACTED_ELEMENTS: [&str; 1] = ["securityToken"];

// Everything but unreserved characters and '/' is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Authenticated gateway calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operation {
    /// Must precede every attribute read or the gateway serves stale data.
    PrimeRead,
    ReadAttributes,
    WriteAttribute { name: &'static str, value: String },
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::PrimeRead => "prime_read",
            Operation::ReadAttributes => "read_attributes",
            Operation::WriteAttribute { .. } => "write_attribute",
        }
    }
}

/// Strictly increasing request nonce: UNIX time in microseconds, i.e. the
/// seconds and fractional digits of the timestamp with the separator removed.
#[derive(Debug, Default)]
pub(crate) struct NonceClock {
    last: i64,
}

impl NonceClock {
    pub fn next(&mut self) -> String {
        self.next_from(Utc::now().timestamp_micros())
    }

    fn next_from(&mut self, now_micros: i64) -> String {
        let value = now_micros.max(self.last + 1);
        self.last = value;
        value.to_string()
    }
}

pub(crate) fn login_url(host: &str, email: &str, password_hash: &str, nonce: &str) -> String {
    format!(
        "{host}/userLogin?appId={APP_ID}&name={}&password={password_hash}&timestamp={nonce}",
        encode_component(email)
    )
}

pub(crate) fn device_list_url(host: &str, token: &str, user_id: &str, nonce: &str) -> String {
    format!(
        "{host}/getDeviceList?secToken={}&userId={}&timestamp={nonce}",
        encode_component(token),
        encode_component(user_id)
    )
}

pub(crate) fn operation_url(session: &Session, op: &Operation, nonce: &str) -> Result<String> {
    let (Some(token), Some(device_id)) = (session.security_token(), session.gateway_device_id())
    else {
        return Err(Error::authentication("no security token; login required"));
    };
    let base = format!(
        "{}/{}?secToken={}&devId={}",
        session.host(),
        match op {
            Operation::ReadAttributes => "getDeviceAttributesWithValues",
            Operation::PrimeRead | Operation::WriteAttribute { .. } => "setMultiDeviceAttributes2",
        },
        encode_component(token),
        encode_component(device_id)
    );
    let url = match op {
        Operation::PrimeRead => {
            format!("{base}&name1={PRIME_ATTRIBUTE}&value1={PRIME_VALUE}&timestamp={nonce}")
        }
        Operation::ReadAttributes => {
            format!("{base}&deviceTypeId={DEVICE_TYPE_ID}&timestamp={nonce}")
        }
        Operation::WriteAttribute { name, value } => format!(
            "{base}&name1={name}&value1={}&timestamp={nonce}",
            encode_component(value)
        ),
    };
    Ok(url)
}

/// Mask credentials in a URL before it is logged.
pub(crate) fn redact(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if REDACTED_PARAMS.contains(&key) => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", params.join("&"))
}

/// Mask credential elements in a response body before it is logged.
pub(crate) fn redact_body(body: &str) -> String {
    let mut out = body.to_string();
    for element in REDACTED_ELEMENTS {
        let open = format!("<{element}>");
        let close = format!("</{element}>");
        let mut from = 0;
        while let Some(start) = out[from..].find(&open).map(|i| from + i + open.len()) {
            let Some(len) = out[start..].find(&close) else {
                break;
            };
            out.replace_range(start..start + len, "***");
            from = start + 3 + close.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in_session() -> Session {
        let mut session = Session::new("http://gw", "a@b.c", "pw");
        session
            .apply_login("<r><securityToken>tok</securityToken><userId>7</userId></r>")
            .unwrap();
        session
            .apply_device_list("<r><devList><devId>dev1</devId></devList></r>")
            .unwrap();
        session
    }

    #[test]
    fn nonce_strictly_increasing() {
        let mut clock = NonceClock::default();
        assert_eq!(clock.next_from(1_700_000_000_123_456), "1700000000123456");
        assert_eq!(clock.next_from(1_700_000_000_123_456), "1700000000123457");
        assert_eq!(clock.next_from(1_699_999_999_000_000), "1700000000123458");
        assert_eq!(clock.next_from(1_700_000_001_000_000), "1700000001000000");
    }

    #[test]
    fn nonce_is_decimal_digits() {
        let mut clock = NonceClock::default();
        let a = clock.next();
        let b = clock.next();
        assert!(a.chars().all(|c| c.is_ascii_digit()));
        assert!(b.parse::<i64>().unwrap() > a.parse::<i64>().unwrap());
    }

    #[test]
    fn login_url_structure() {
        let url = login_url("http://gw", "me+x@example.com", "abc123", "42");
        assert_eq!(
            url,
            "http://gw/userLogin?appId=1097&name=me%2Bx%40example.com&password=abc123&timestamp=42"
        );
    }

    #[test]
    fn device_list_url_structure() {
        let url = device_list_url("http://gw", "tok", "7", "42");
        assert_eq!(url, "http://gw/getDeviceList?secToken=tok&userId=7&timestamp=42");
    }

    #[test]
    fn operation_urls() {
        let session = logged_in_session();
        assert_eq!(
            operation_url(&session, &Operation::PrimeRead, "1").unwrap(),
            "http://gw/setMultiDeviceAttributes2?secToken=tok&devId=dev1&name1=B01&value1=5&timestamp=1"
        );
        assert_eq!(
            operation_url(&session, &Operation::ReadAttributes, "2").unwrap(),
            "http://gw/getDeviceAttributesWithValues?secToken=tok&devId=dev1&deviceTypeId=1&timestamp=2"
        );
        let write = Operation::WriteAttribute {
            name: TEMPERATURE_ATTRIBUTE,
            value: "!AB12K".to_string(),
        };
        assert_eq!(
            operation_url(&session, &write, "3").unwrap(),
            "http://gw/setMultiDeviceAttributes2?secToken=tok&devId=dev1&name1=B06&value1=%21AB12K&timestamp=3"
        );
    }

    #[test]
    fn operation_url_requires_login() {
        let session = Session::new("http://gw", "a@b.c", "pw");
        assert!(matches!(
            operation_url(&session, &Operation::ReadAttributes, "1"),
            Err(Error::Authentication { .. })
        ));
    }

    #[test]
    fn payload_encoding_matches_quote() {
        assert_eq!(encode_component("!2569# "), "%212569%23%20");
        assert_eq!(encode_component("!AB12(01"), "%21AB12%2801");
        assert_eq!(encode_component("a/b_c.d-e~"), "a/b_c.d-e~");
    }

    #[test]
    fn redact_masks_credentials() {
        assert_eq!(
            redact("http://gw/userLogin?appId=1097&name=x&password=abc&timestamp=1"),
            "http://gw/userLogin?appId=1097&name=x&password=***&timestamp=1"
        );
        assert_eq!(
            redact("http://gw/x?secToken=tok&devId=d"),
            "http://gw/x?secToken=***&devId=d"
        );
        assert_eq!(redact("http://gw/plain"), "http://gw/plain");
    }

    #[test]
    fn redact_body_masks_token_elements() {
        assert_eq!(
            redact_body("<r><securityToken>tok-1</securityToken><userId>7</userId></r>"),
            "<r><securityToken>***</securityToken><userId>7</userId></r>"
        );
        assert_eq!(
            redact_body("<a><securityToken>x</securityToken><securityToken>y</securityToken></a>"),
            "<a><securityToken>***</securityToken><securityToken>***</securityToken></a>"
        );
        assert_eq!(redact_body("<r><retCode>0</retCode></r>"), "<r><retCode>0</retCode></r>");
        assert_eq!(redact_body("<r><securityToken>open"), "<r><securityToken>open");
    }
}
